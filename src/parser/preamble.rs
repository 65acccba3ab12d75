use crate::language::Parameter;
use tower_lsp::lsp_types::Range;

#[derive(Debug, Clone, PartialEq)]
pub struct Directive {
    pub keyword: String,
    pub range: Range,
    pub line_range: Range,
    pub parameters: Vec<Parameter>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Preamble {
    pub(crate) directives: Vec<Directive>,
    pub(crate) quest_name: Option<(String, Range)>,
    pub(crate) failed_parse: Vec<Range>,
}

impl Preamble {
    pub(crate) fn add_directive(&mut self, directive: Directive) {
        if directive.keyword == "Quest" && self.quest_name.is_none() {
            if let Some(parameter) = directive.parameters.first() {
                self.quest_name = Some((parameter.value.clone(), parameter.range));
            }
        }
        self.directives.push(directive);
    }

    pub fn directives(&self) -> &[Directive] {
        &self.directives
    }

    pub fn directive(&self, keyword: &str) -> Option<&Directive> {
        self.directives.iter().find(|d| d.keyword == keyword)
    }

    pub fn quest_name(&self) -> Option<&str> {
        self.quest_name.as_ref().map(|(name, _)| name.as_str())
    }

    /// Range of the `Quest:` value; anchors block-level diagnostics.
    pub fn quest_name_range(&self) -> Option<Range> {
        self.quest_name.as_ref().map(|(_, range)| *range)
    }

    pub fn failed_parse(&self) -> &[Range] {
        &self.failed_parse
    }
}

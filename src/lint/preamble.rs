use super::parameters;
use crate::diagnostics;
use crate::language::LanguageData;
use crate::parser::Quest;
use tower_lsp::lsp_types::Diagnostic;

pub fn validate(quest: &Quest, language: &LanguageData) -> Vec<Diagnostic> {
    let preamble = quest.preamble();
    let mut diagnostics: Vec<Diagnostic> = preamble
        .directives()
        .iter()
        .flat_map(|directive| directive.parameters.iter())
        .filter_map(|parameter| parameters::analyse(quest, language, parameter))
        .collect();

    diagnostics.extend(
        preamble
            .failed_parse()
            .iter()
            .map(|range| diagnostics::undefined_expression(*range, "Preamble")),
    );

    diagnostics::sort_by_line(&mut diagnostics);
    diagnostics
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::code_of;

    #[test]
    fn reports_bad_directives_in_line_order() {
        let language = LanguageData::bundled().unwrap();
        let quest = Quest::parse_text(
            "Quest: M0B00Y16\nWhatever goes here\nMessages: +3\nQRC:\n",
            &language,
        );
        let diagnostics = validate(&quest, &language);
        let found: Vec<_> = diagnostics
            .iter()
            .map(|d| (d.range.start.line, code_of(d).unwrap_or_default()))
            .collect();
        assert_eq!(
            found,
            vec![(1, "undefined-expression"), (2, "signed-natural-number")]
        );
        assert_eq!(diagnostics[0].message, "Undefined expression in Preamble block.");
    }
}

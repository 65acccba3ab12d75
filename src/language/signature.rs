use crate::symbols::SymbolType;
use crate::text::span_range;
use regex::Regex;
use std::fmt;
use tower_lsp::lsp_types::Range;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParameterType {
    NaturalNumber,
    IntegerNumber,
    Time,
    Message,
    MessageId,
    MessageName,
    Symbol,
    TypedSymbol(SymbolType),
    Task,
    QuestName,
    QuestIndex,
    EffectKey,
    Text,
    AttributeGroup(String),
}

impl ParameterType {
    pub fn from_placeholder(name: &str) -> Self {
        match name {
            "n" => ParameterType::NaturalNumber,
            "+n" => ParameterType::IntegerNumber,
            "time" => ParameterType::Time,
            "message" => ParameterType::Message,
            "messageID" => ParameterType::MessageId,
            "messageName" => ParameterType::MessageName,
            "_symbol_" => ParameterType::Symbol,
            "_item_" => ParameterType::TypedSymbol(SymbolType::Item),
            "_person_" => ParameterType::TypedSymbol(SymbolType::Person),
            "_place_" => ParameterType::TypedSymbol(SymbolType::Place),
            "_clock_" => ParameterType::TypedSymbol(SymbolType::Clock),
            "_foe_" => ParameterType::TypedSymbol(SymbolType::Foe),
            "task" => ParameterType::Task,
            "questName" => ParameterType::QuestName,
            "questID" => ParameterType::QuestIndex,
            "effectKey" => ParameterType::EffectKey,
            "..." => ParameterType::Text,
            other => ParameterType::AttributeGroup(other.to_string()),
        }
    }

    pub fn is_message(&self) -> bool {
        matches!(
            self,
            ParameterType::Message | ParameterType::MessageId | ParameterType::MessageName
        )
    }

    pub fn is_symbol(&self) -> bool {
        matches!(
            self,
            ParameterType::Symbol | ParameterType::TypedSymbol(_)
        )
    }

    fn capture_pattern(&self) -> &'static str {
        match self {
            ParameterType::Text => r"(.+?)",
            _ => r"(\S+)",
        }
    }
}

impl fmt::Display for ParameterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterType::NaturalNumber => write!(f, "natural number"),
            ParameterType::IntegerNumber => write!(f, "integer number"),
            ParameterType::Time => write!(f, "time"),
            ParameterType::Message | ParameterType::MessageId | ParameterType::MessageName => {
                write!(f, "message")
            }
            ParameterType::Symbol => write!(f, "symbol"),
            ParameterType::TypedSymbol(symbol_type) => write!(f, "{}", symbol_type.label()),
            ParameterType::Task => write!(f, "task"),
            ParameterType::QuestName => write!(f, "quest name"),
            ParameterType::QuestIndex => write!(f, "quest index"),
            ParameterType::EffectKey => write!(f, "effect key"),
            ParameterType::Text => write!(f, "text"),
            ParameterType::AttributeGroup(group) => write!(f, "{}", group),
        }
    }
}

/// A typed value captured from a line. `value` is the literal source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub kind: ParameterType,
    pub value: String,
    pub range: Range,
}

/// A compiled signature such as `give item ${_item_} to ${_person_}`.
#[derive(Debug, Clone)]
pub struct SignaturePattern {
    source: String,
    regex: Regex,
    parameters: Vec<ParameterType>,
}

impl SignaturePattern {
    pub fn compile(source: &str) -> Result<Self, regex::Error> {
        let mut parameters = Vec::new();
        let mut parts = Vec::new();

        for word in source.split_whitespace() {
            match placeholder_name(word) {
                Some(name) => {
                    let kind = ParameterType::from_placeholder(name);
                    parts.push(kind.capture_pattern().to_string());
                    parameters.push(kind);
                }
                None => parts.push(regex::escape(word)),
            }
        }

        let regex = Regex::new(&format!(r"^\s*{}\s*$", parts.join(r"\s+")))?;
        Ok(Self {
            source: source.to_string(),
            regex,
            parameters,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn parameter_types(&self) -> &[ParameterType] {
        &self.parameters
    }

    /// First literal word, used to index invocations.
    pub fn leading_word(&self) -> Option<&str> {
        self.source
            .split_whitespace()
            .next()
            .filter(|word| placeholder_name(word).is_none())
    }

    /// Matches `line_text[offset..]` in full and returns the captured parameters.
    pub fn capture(&self, line: u32, line_text: &str, offset: usize) -> Option<Vec<Parameter>> {
        let haystack = line_text.get(offset..)?;
        let captures = self.regex.captures(haystack)?;

        let mut parameters = Vec::with_capacity(self.parameters.len());
        for (index, kind) in self.parameters.iter().enumerate() {
            let capture = captures.get(index + 1)?;
            parameters.push(Parameter {
                kind: kind.clone(),
                value: capture.as_str().to_string(),
                range: span_range(
                    line,
                    line_text,
                    offset + capture.start(),
                    offset + capture.end(),
                ),
            });
        }

        Some(parameters)
    }
}

fn placeholder_name(word: &str) -> Option<&str> {
    word.strip_prefix("${")?.strip_suffix('}')
}

//! Diagnostic factory shared by every validator.

use tower_lsp::lsp_types::{
    Diagnostic, DiagnosticRelatedInformation, DiagnosticSeverity, DiagnosticTag, Location,
    NumberOrString, Range, Url,
};

pub const SOURCE: &str = "quest-lsp";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticCode {
    UndefinedExpression,
    MissingBlock,
    DuplicatedMessageNumber,
    UnusedMessage,
    IncorrectMessageOrder,
    InvalidStaticMessageDefinition,
    UseStaticMessageAlias,
    UndefinedSymbol,
    IncorrectSymbolVariation,
    SymbolVariation,
    UndefinedContextMacro,
    InvalidDefinition,
    DuplicatedDefinition,
    UnusedSymbol,
    UnusedTask,
    UnstartedClock,
    UnlinkedClock,
    NamingConvention,
    UndefinedUntilPerformed,
    NotANumber,
    SignedNaturalNumber,
    UnsignedIntegerNumber,
    InvalidTime,
    UndefinedMessage,
    IncorrectSymbolType,
    UndefinedTask,
    UndefinedEffectKey,
    UndefinedAttribute,
    UndefinedQuest,
    MissingSchema,
    SchemaMismatch,
}

impl DiagnosticCode {
    pub fn as_str(self) -> &'static str {
        match self {
            DiagnosticCode::UndefinedExpression => "undefined-expression",
            DiagnosticCode::MissingBlock => "missing-block",
            DiagnosticCode::DuplicatedMessageNumber => "duplicated-message-number",
            DiagnosticCode::UnusedMessage => "unused-message",
            DiagnosticCode::IncorrectMessageOrder => "incorrect-message-order",
            DiagnosticCode::InvalidStaticMessageDefinition => "invalid-static-message-definition",
            DiagnosticCode::UseStaticMessageAlias => "use-static-message-alias",
            DiagnosticCode::UndefinedSymbol => "undefined-symbol",
            DiagnosticCode::IncorrectSymbolVariation => "incorrect-symbol-variation",
            DiagnosticCode::SymbolVariation => "symbol-variation",
            DiagnosticCode::UndefinedContextMacro => "undefined-context-macro",
            DiagnosticCode::InvalidDefinition => "invalid-definition",
            DiagnosticCode::DuplicatedDefinition => "duplicated-definition",
            DiagnosticCode::UnusedSymbol => "unused-symbol",
            DiagnosticCode::UnusedTask => "unused-task",
            DiagnosticCode::UnstartedClock => "unstarted-clock",
            DiagnosticCode::UnlinkedClock => "unlinked-clock",
            DiagnosticCode::NamingConvention => "naming-convention",
            DiagnosticCode::UndefinedUntilPerformed => "undefined-until-performed",
            DiagnosticCode::NotANumber => "not-a-number",
            DiagnosticCode::SignedNaturalNumber => "signed-natural-number",
            DiagnosticCode::UnsignedIntegerNumber => "unsigned-integer-number",
            DiagnosticCode::InvalidTime => "invalid-time",
            DiagnosticCode::UndefinedMessage => "undefined-message",
            DiagnosticCode::IncorrectSymbolType => "incorrect-symbol-type",
            DiagnosticCode::UndefinedTask => "undefined-task",
            DiagnosticCode::UndefinedEffectKey => "undefined-effect-key",
            DiagnosticCode::UndefinedAttribute => "undefined-attribute",
            DiagnosticCode::UndefinedQuest => "undefined-quest",
            DiagnosticCode::MissingSchema => "missing-schema",
            DiagnosticCode::SchemaMismatch => "schema-mismatch",
        }
    }

    pub fn severity(self) -> DiagnosticSeverity {
        match self {
            DiagnosticCode::UnusedMessage
            | DiagnosticCode::IncorrectSymbolVariation
            | DiagnosticCode::UnusedSymbol
            | DiagnosticCode::UnusedTask
            | DiagnosticCode::UnstartedClock
            | DiagnosticCode::UnlinkedClock => DiagnosticSeverity::WARNING,
            DiagnosticCode::IncorrectMessageOrder
            | DiagnosticCode::UseStaticMessageAlias
            | DiagnosticCode::SymbolVariation
            | DiagnosticCode::NamingConvention => DiagnosticSeverity::HINT,
            _ => DiagnosticSeverity::ERROR,
        }
    }

    fn is_unnecessary(self) -> bool {
        matches!(
            self,
            DiagnosticCode::UnusedMessage | DiagnosticCode::UnusedSymbol | DiagnosticCode::UnusedTask
        )
    }
}

pub fn code_of(diagnostic: &Diagnostic) -> Option<&str> {
    match diagnostic.code.as_ref()? {
        NumberOrString::String(code) => Some(code.as_str()),
        NumberOrString::Number(_) => None,
    }
}

pub fn build(code: DiagnosticCode, range: Range, message: impl Into<String>) -> Diagnostic {
    Diagnostic {
        range,
        severity: Some(code.severity()),
        code: Some(NumberOrString::String(code.as_str().to_string())),
        code_description: None,
        source: Some(SOURCE.to_string()),
        message: message.into(),
        related_information: None,
        tags: code
            .is_unnecessary()
            .then(|| vec![DiagnosticTag::UNNECESSARY]),
        data: None,
    }
}

/// Attaches `(range, label)` links into the same document.
fn with_related<I>(mut diagnostic: Diagnostic, uri: &Url, related: I) -> Diagnostic
where
    I: IntoIterator<Item = (Range, String)>,
{
    let related: Vec<_> = related
        .into_iter()
        .map(|(range, message)| DiagnosticRelatedInformation {
            location: Location {
                uri: uri.clone(),
                range,
            },
            message,
        })
        .collect();
    if !related.is_empty() {
        diagnostic.related_information = Some(related);
    }
    diagnostic
}

/// Keeps source-line order and, within a line, the order rules ran in.
pub fn sort_by_line(diagnostics: &mut [Diagnostic]) {
    diagnostics.sort_by_key(|d| d.range.start.line);
}

pub fn undefined_expression(range: Range, block: &str) -> Diagnostic {
    build(
        DiagnosticCode::UndefinedExpression,
        range,
        format!("Undefined expression in {} block.", block),
    )
}

pub fn missing_block(range: Range, block: &str) -> Diagnostic {
    build(
        DiagnosticCode::MissingBlock,
        range,
        format!("{} block is missing.", block),
    )
}

pub fn duplicated_message_number(
    range: Range,
    id: u32,
    uri: &Url,
    siblings: impl IntoIterator<Item = Range>,
) -> Diagnostic {
    with_related(
        build(
            DiagnosticCode::DuplicatedMessageNumber,
            range,
            format!("Message number {} is already in use.", id),
        ),
        uri,
        siblings
            .into_iter()
            .map(|r| (r, format!("Message {} is also declared here.", id))),
    )
}

pub fn unused_message(range: Range, id: u32) -> Diagnostic {
    build(
        DiagnosticCode::UnusedMessage,
        range,
        format!("Message {} is never used.", id),
    )
}

pub fn incorrect_message_order(range: Range, id: u32, uri: &Url, previous: (Range, u32)) -> Diagnostic {
    with_related(
        build(
            DiagnosticCode::IncorrectMessageOrder,
            range,
            format!(
                "Message {} is declared after message {}; messages should be in ascending order.",
                id, previous.1
            ),
        ),
        uri,
        [(previous.0, format!("Message {} is declared here.", previous.1))],
    )
}

pub fn invalid_static_message_definition(range: Range, alias: &str, id: u32) -> Diagnostic {
    build(
        DiagnosticCode::InvalidStaticMessageDefinition,
        range,
        format!("'{}' is not a static message with id {}.", alias, id),
    )
}

pub fn use_static_message_alias(range: Range, id: u32, alias: &str) -> Diagnostic {
    build(
        DiagnosticCode::UseStaticMessageAlias,
        range,
        format!("Message {} is the static message '{}'; declare it as '{}:  [{}]'.", id, alias, alias, id),
    )
}

pub fn undefined_symbol(range: Range, name: &str) -> Diagnostic {
    build(
        DiagnosticCode::UndefinedSymbol,
        range,
        format!("Symbol '{}' is not defined.", name),
    )
}

pub fn incorrect_symbol_variation(range: Range, variation: &str, type_label: &str) -> Diagnostic {
    build(
        DiagnosticCode::IncorrectSymbolVariation,
        range,
        format!("'{}' is not a supported variation for {} symbols.", variation, type_label),
    )
}

pub fn symbol_variation(range: Range, name: &str, summary: &str) -> Diagnostic {
    let message = if summary.is_empty() {
        name.to_string()
    } else {
        format!("{}: {}", name, summary)
    };
    build(DiagnosticCode::SymbolVariation, range, message)
}

pub fn undefined_context_macro(range: Range, name: &str) -> Diagnostic {
    build(
        DiagnosticCode::UndefinedContextMacro,
        range,
        format!("Context macro '{}' is not defined.", name),
    )
}

pub fn invalid_definition(range: Range, name: &str, type_label: &str) -> Diagnostic {
    build(
        DiagnosticCode::InvalidDefinition,
        range,
        format!("Invalid definition for {} '{}'.", type_label, name),
    )
}

pub fn duplicated_definition(
    range: Range,
    name: &str,
    uri: &Url,
    siblings: impl IntoIterator<Item = Range>,
) -> Diagnostic {
    with_related(
        build(
            DiagnosticCode::DuplicatedDefinition,
            range,
            format!("'{}' is already defined.", name),
        ),
        uri,
        siblings
            .into_iter()
            .map(|r| (r, format!("'{}' is also defined here.", name))),
    )
}

pub fn unused_symbol(range: Range, name: &str) -> Diagnostic {
    build(
        DiagnosticCode::UnusedSymbol,
        range,
        format!("Symbol '{}' is never used.", name),
    )
}

pub fn unused_task(range: Range, name: &str) -> Diagnostic {
    build(
        DiagnosticCode::UnusedTask,
        range,
        format!("Task '{}' is never triggered or referenced.", name),
    )
}

pub fn unstarted_clock(range: Range, name: &str) -> Diagnostic {
    build(
        DiagnosticCode::UnstartedClock,
        range,
        format!("Clock '{}' is never started with 'start timer'.", name),
    )
}

pub fn unlinked_clock(range: Range, name: &str) -> Diagnostic {
    build(
        DiagnosticCode::UnlinkedClock,
        range,
        format!("Clock '{}' has no task with the same name.", name),
    )
}

pub fn naming_convention(range: Range, name: &str, suggestion: &str) -> Diagnostic {
    build(
        DiagnosticCode::NamingConvention,
        range,
        format!("'{}' should be named '{}'.", name, suggestion),
    )
}

pub fn undefined_until_performed(range: Range, name: &str) -> Diagnostic {
    build(
        DiagnosticCode::UndefinedUntilPerformed,
        range,
        format!("'until {} performed' refers to an undefined task.", name),
    )
}

pub fn not_a_number(range: Range, value: &str) -> Diagnostic {
    build(
        DiagnosticCode::NotANumber,
        range,
        format!("'{}' is not a number.", value),
    )
}

pub fn signed_natural_number(range: Range, value: &str) -> Diagnostic {
    build(
        DiagnosticCode::SignedNaturalNumber,
        range,
        format!("'{}' must be a natural number without sign.", value),
    )
}

pub fn unsigned_integer_number(range: Range, value: &str) -> Diagnostic {
    build(
        DiagnosticCode::UnsignedIntegerNumber,
        range,
        format!("'{}' must be an integer with an explicit sign.", value),
    )
}

pub fn invalid_time(range: Range, value: &str) -> Diagnostic {
    build(
        DiagnosticCode::InvalidTime,
        range,
        format!("'{}' is not a valid time (hh:mm).", value),
    )
}

pub fn undefined_message(range: Range, value: &str) -> Diagnostic {
    build(
        DiagnosticCode::UndefinedMessage,
        range,
        format!("Message '{}' is not defined.", value),
    )
}

pub fn incorrect_symbol_type(range: Range, name: &str, expected: &str, found: &str) -> Diagnostic {
    build(
        DiagnosticCode::IncorrectSymbolType,
        range,
        format!("'{}' is a {} symbol; expected {}.", name, found, expected),
    )
}

pub fn undefined_task(range: Range, name: &str) -> Diagnostic {
    build(
        DiagnosticCode::UndefinedTask,
        range,
        format!("Task '{}' is not defined.", name),
    )
}

pub fn undefined_effect_key(range: Range, key: &str) -> Diagnostic {
    build(
        DiagnosticCode::UndefinedEffectKey,
        range,
        format!("Effect key '{}' is not defined.", key),
    )
}

pub fn undefined_attribute(range: Range, value: &str, group: &str) -> Diagnostic {
    build(
        DiagnosticCode::UndefinedAttribute,
        range,
        format!("'{}' is not a valid value for '{}'.", value, group),
    )
}

pub fn undefined_quest(range: Range, name: &str) -> Diagnostic {
    build(
        DiagnosticCode::UndefinedQuest,
        range,
        format!("Quest '{}' was not found in the workspace.", name),
    )
}

pub fn missing_schema(range: Range) -> Diagnostic {
    build(
        DiagnosticCode::MissingSchema,
        range,
        "Table must start with 'schema: column, column, ...'.",
    )
}

pub fn schema_mismatch(range: Range, columns: usize) -> Diagnostic {
    build(
        DiagnosticCode::SchemaMismatch,
        range,
        format!(
            "Entry does not match the schema: expected {} comma-separated values.",
            columns
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tower_lsp::lsp_types::Position;

    fn range(line: u32) -> Range {
        Range {
            start: Position { line, character: 0 },
            end: Position { line, character: 4 },
        }
    }

    #[test]
    fn builds_coded_diagnostics() {
        let diagnostic = unused_symbol(range(2), "_gold_");
        assert_eq!(code_of(&diagnostic), Some("unused-symbol"));
        assert_eq!(diagnostic.severity, Some(DiagnosticSeverity::WARNING));
        assert_eq!(diagnostic.source.as_deref(), Some(SOURCE));
        assert_eq!(diagnostic.tags, Some(vec![DiagnosticTag::UNNECESSARY]));

        let diagnostic = undefined_symbol(range(1), "_x_");
        assert_eq!(diagnostic.severity, Some(DiagnosticSeverity::ERROR));
        assert_eq!(diagnostic.tags, None);
    }

    #[test]
    fn links_related_locations() {
        let uri = Url::parse("file:///quests/TEST.txt").unwrap();
        let diagnostic = duplicated_message_number(range(1), 100, &uri, [range(5), range(9)]);
        let related = diagnostic.related_information.unwrap();
        assert_eq!(related.len(), 2);
        assert_eq!(related[1].location.range.start.line, 9);
        assert_eq!(related[0].location.uri, uri);
    }

    #[test]
    fn omits_empty_related_information() {
        let uri = Url::parse("file:///quests/TEST.txt").unwrap();
        let diagnostic = duplicated_definition(range(1), "_a_", &uri, Vec::<Range>::new());
        assert!(diagnostic.related_information.is_none());
    }

    #[test]
    fn sorts_stably_by_line() {
        let mut diagnostics = vec![
            unused_task(range(4), "_b_"),
            naming_convention(range(2), "a", "_a_"),
            unused_task(range(2), "a"),
        ];
        sort_by_line(&mut diagnostics);
        let codes: Vec<_> = diagnostics.iter().filter_map(code_of).collect();
        assert_eq!(codes, vec!["naming-convention", "unused-task", "unused-task"]);
    }
}

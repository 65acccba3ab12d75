//! Per-parameter checks shared by the preamble and QBN validators.

use crate::diagnostics;
use crate::language::{LanguageData, Parameter, ParameterType};
use crate::parser::Quest;
use tower_lsp::lsp_types::Diagnostic;

/// Checks one captured parameter against its declared type.
///
/// Quest names and quest indices need the workspace and are left to the
/// cross-quest phase; free text is never checked.
pub fn analyse(quest: &Quest, language: &LanguageData, parameter: &Parameter) -> Option<Diagnostic> {
    let value = parameter.value.as_str();
    let range = parameter.range;

    match &parameter.kind {
        ParameterType::NaturalNumber => check_natural(parameter),
        ParameterType::IntegerNumber => {
            if !is_number(value) {
                Some(diagnostics::not_a_number(range, value))
            } else if !has_sign(value) {
                Some(diagnostics::unsigned_integer_number(range, value))
            } else {
                None
            }
        }
        ParameterType::Time => {
            (!is_valid_time(value)).then(|| diagnostics::invalid_time(range, value))
        }
        ParameterType::Message | ParameterType::MessageId | ParameterType::MessageName => {
            let declared = message_id(language, value)
                .map(|id| quest.qrc().has_message(id))
                .unwrap_or(false);
            (!declared).then(|| diagnostics::undefined_message(range, value))
        }
        ParameterType::Symbol => quest
            .qbn()
            .symbol(value)
            .is_none()
            .then(|| diagnostics::undefined_symbol(range, value)),
        ParameterType::TypedSymbol(expected) => match quest.qbn().symbol(value) {
            None => Some(diagnostics::undefined_symbol(range, value)),
            Some(symbol) if symbol.symbol_type != *expected => {
                Some(diagnostics::incorrect_symbol_type(
                    range,
                    value,
                    expected.label(),
                    symbol.symbol_type.label(),
                ))
            }
            Some(_) => None,
        },
        ParameterType::Task => quest
            .qbn()
            .task(value)
            .is_none()
            .then(|| diagnostics::undefined_task(range, value)),
        ParameterType::EffectKey => (!language.is_effect_key(value))
            .then(|| diagnostics::undefined_effect_key(range, value)),
        ParameterType::QuestName | ParameterType::QuestIndex | ParameterType::Text => None,
        ParameterType::AttributeGroup(group) => {
            let values = language.attribute_values(group)?;
            (!values.iter().any(|v| v == value))
                .then(|| diagnostics::undefined_attribute(range, value, group))
        }
    }
}

/// Natural-number rule on its own; quest indices reuse it.
pub fn check_natural(parameter: &Parameter) -> Option<Diagnostic> {
    let value = parameter.value.as_str();
    if !is_number(value) {
        Some(diagnostics::not_a_number(parameter.range, value))
    } else if has_sign(value) {
        Some(diagnostics::signed_natural_number(parameter.range, value))
    } else {
        None
    }
}

/// Resolves a message reference: numeric form first, then static alias.
pub fn message_id(language: &LanguageData, value: &str) -> Option<u32> {
    if is_number(value) {
        return value.parse().ok();
    }
    language.static_message_id(value)
}

fn is_number(value: &str) -> bool {
    // `f64` also accepts "inf" and "nan", which are not numbers here.
    let digits = value.trim_start_matches(['+', '-']);
    !digits.is_empty()
        && digits.chars().any(|c| c.is_ascii_digit())
        && digits.chars().all(|c| c.is_ascii_digit() || c == '.')
        && value.parse::<f64>().map(f64::is_finite).unwrap_or(false)
}

fn has_sign(value: &str) -> bool {
    value.starts_with('+') || value.starts_with('-')
}

fn is_valid_time(value: &str) -> bool {
    let Some((hours, minutes)) = value.split_once(':') else {
        return false;
    };
    let all_digits = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit());
    if !all_digits(hours) || !all_digits(minutes) {
        return false;
    }
    match (hours.parse::<u32>(), minutes.parse::<u32>()) {
        (Ok(h), Ok(m)) => h <= 23 && m <= 59,
        _ => false,
    }
}

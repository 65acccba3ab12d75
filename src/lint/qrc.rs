use super::{block_anchor, parameters};
use crate::diagnostics;
use crate::language::LanguageData;
use crate::parser::{Message, Quest};
use crate::text::{sub_range, utf16_len};
use std::collections::HashSet;
use tower_lsp::lsp_types::{Diagnostic, Url};

pub fn validate(quest: &Quest, language: &LanguageData, uri: &Url) -> Vec<Diagnostic> {
    let qrc = quest.qrc();
    if !qrc.found() {
        return vec![diagnostics::missing_block(block_anchor(quest), "QRC")];
    }

    let referenced = referenced_message_ids(quest, language);
    let mut diagnostics = Vec::new();
    let mut previous: Option<&Message> = None;

    for message in qrc.messages() {
        if message.alias.is_none() && !referenced.contains(&message.id) {
            diagnostics.push(diagnostics::unused_message(message.range, message.id));
        }

        if let Some(previous) = previous {
            if message.id < previous.id {
                diagnostics.push(diagnostics::incorrect_message_order(
                    message.range,
                    message.id,
                    uri,
                    (previous.range, previous.id),
                ));
            }
        }
        previous = Some(message);

        let siblings: Vec<_> = qrc
            .messages_with_id(message.id)
            .filter(|other| !std::ptr::eq(*other, message))
            .map(|other| other.range)
            .collect();
        if !siblings.is_empty() {
            diagnostics.push(diagnostics::duplicated_message_number(
                message.id_range,
                message.id,
                uri,
                siblings,
            ));
        }

        match &message.alias {
            Some(alias) => {
                if language.static_message_id(alias) != Some(message.id) {
                    diagnostics.push(diagnostics::invalid_static_message_definition(
                        message.range,
                        alias,
                        message.id,
                    ));
                }
            }
            None => {
                if let Some(alias) = language.static_message_name(message.id) {
                    diagnostics.push(diagnostics::use_static_message_alias(
                        message.range,
                        message.id,
                        alias,
                    ));
                }
            }
        }
    }

    for occurrence in qrc.symbol_occurrences() {
        let Some(symbol) = quest.qbn().symbol(&occurrence.symbol) else {
            diagnostics.push(diagnostics::undefined_symbol(
                occurrence.range,
                &occurrence.symbol,
            ));
            continue;
        };
        match language.variation(symbol.symbol_type, &occurrence.variation) {
            Some(variation) => diagnostics.push(diagnostics::symbol_variation(
                occurrence.range,
                &occurrence.symbol,
                &variation.summary,
            )),
            None => diagnostics.push(diagnostics::incorrect_symbol_variation(
                sub_range(&occurrence.range, 0, utf16_len(&occurrence.variation)),
                &occurrence.variation,
                symbol.symbol_type.label(),
            )),
        }
    }

    for occurrence in qrc.macros() {
        if !language.is_macro(&occurrence.name) {
            diagnostics.push(diagnostics::undefined_context_macro(
                occurrence.range,
                &occurrence.name,
            ));
        }
    }

    diagnostics.extend(
        qrc.failed_parse()
            .iter()
            .map(|range| diagnostics::undefined_expression(*range, "QRC")),
    );

    diagnostics::sort_by_line(&mut diagnostics);
    diagnostics
}

/// Ids referenced by message parameters of QBN symbol definitions and actions.
fn referenced_message_ids(quest: &Quest, language: &LanguageData) -> HashSet<u32> {
    let qbn = quest.qbn();
    let symbol_parameters = qbn
        .symbols()
        .iter()
        .flat_map(|(_, definitions)| definitions.all())
        .filter_map(|symbol| symbol.signature.as_ref())
        .flatten();
    let action_parameters = qbn.actions().iter().flat_map(|action| &action.signature);

    symbol_parameters
        .chain(action_parameters)
        .filter(|parameter| parameter.kind.is_message())
        .filter_map(|parameter| parameters::message_id(language, &parameter.value))
        .collect()
}

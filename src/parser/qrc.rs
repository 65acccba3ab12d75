use crate::parser::recognizers::MacroOccurrence;
use crate::symbols::SymbolOccurrence;
use std::collections::HashMap;
use tower_lsp::lsp_types::Range;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: u32,
    /// Static message name for `Name:  [id]` headers.
    pub alias: Option<String>,
    pub range: Range,
    pub id_range: Range,
    pub block_range: Range,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Qrc {
    pub(crate) found: bool,
    pub(crate) range: Option<Range>,
    pub(crate) messages: Vec<Message>,
    pub(crate) by_id: HashMap<u32, Vec<usize>>,
    pub(crate) symbol_occurrences: Vec<SymbolOccurrence>,
    pub(crate) macros: Vec<MacroOccurrence>,
    pub(crate) failed_parse: Vec<Range>,
}

impl Qrc {
    pub(crate) fn push_message(&mut self, message: Message) -> usize {
        let index = self.messages.len();
        self.by_id.entry(message.id).or_default().push(index);
        self.messages.push(message);
        index
    }

    pub fn found(&self) -> bool {
        self.found
    }

    pub fn range(&self) -> Option<Range> {
        self.range
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// First message declared with `id`.
    pub fn message(&self, id: u32) -> Option<&Message> {
        self.by_id
            .get(&id)
            .and_then(|indices| indices.first())
            .map(|&index| &self.messages[index])
    }

    pub fn messages_with_id(&self, id: u32) -> impl Iterator<Item = &Message> {
        self.by_id
            .get(&id)
            .into_iter()
            .flatten()
            .map(move |&index| &self.messages[index])
    }

    pub fn has_message(&self, id: u32) -> bool {
        self.by_id.contains_key(&id)
    }

    pub fn symbol_occurrences(&self) -> &[SymbolOccurrence] {
        &self.symbol_occurrences
    }

    pub fn macros(&self) -> &[MacroOccurrence] {
        &self.macros
    }

    pub fn failed_parse(&self) -> &[Range] {
        &self.failed_parse
    }
}

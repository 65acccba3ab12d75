//! Single-pass parser that turns a quest script into its three blocks.

mod preamble;
mod qbn;
mod qrc;
pub mod recognizers;

pub use preamble::{Directive, Preamble};
pub use qbn::{Action, Qbn};
pub use qrc::{Message, Qrc};
pub use recognizers::MacroOccurrence;

use crate::language::{ActionCategory, LanguageData};
use crate::symbols::TaskKind;
use crate::text::{lines_range, trimmed_line_range, Document};
use recognizers::BlockHeader;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Block {
    Preamble,
    Qrc,
    Qbn,
}

/// Parse result for one quest document. Built once and never mutated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Quest {
    preamble: Preamble,
    qrc: Qrc,
    qbn: Qbn,
}

impl Quest {
    pub fn parse(document: &Document, language: &LanguageData) -> Self {
        QuestParser::new(document, language).run()
    }

    pub fn parse_text(text: &str, language: &LanguageData) -> Self {
        Self::parse(&Document::new(text.to_string()), language)
    }

    pub fn preamble(&self) -> &Preamble {
        &self.preamble
    }

    pub fn qrc(&self) -> &Qrc {
        &self.qrc
    }

    pub fn qbn(&self) -> &Qbn {
        &self.qbn
    }

    pub fn name(&self) -> Option<&str> {
        self.preamble.quest_name()
    }
}

struct QuestParser<'a> {
    document: &'a Document,
    language: &'a LanguageData,
    quest: Quest,
    block: Block,
    block_start: u32,
    last_content: Option<u32>,
    current_message: Option<usize>,
    current_task: Option<String>,
}

impl<'a> QuestParser<'a> {
    fn new(document: &'a Document, language: &'a LanguageData) -> Self {
        Self {
            document,
            language,
            quest: Quest::default(),
            block: Block::Preamble,
            block_start: 0,
            last_content: None,
            current_message: None,
            current_task: None,
        }
    }

    fn run(mut self) -> Quest {
        for index in 0..self.document.line_count() {
            let Some(text) = self.document.line(index) else {
                continue;
            };
            let line = index as u32;

            if let Some(header) = recognizers::block_header(text) {
                self.enter_block(header, line);
                continue;
            }

            match self.block {
                Block::Preamble => self.preamble_line(line, text),
                Block::Qrc => self.qrc_line(line, text),
                Block::Qbn => self.qbn_line(line, text),
            }
        }
        self.close_block();

        debug!(
            messages = self.quest.qrc.messages.len(),
            symbols = self.quest.qbn.symbols.len(),
            tasks = self.quest.qbn.tasks.len(),
            actions = self.quest.qbn.actions.len(),
            "parsed quest"
        );
        self.quest
    }

    fn enter_block(&mut self, header: BlockHeader, line: u32) {
        self.close_block();
        self.block = match header {
            BlockHeader::Qrc => {
                self.quest.qrc.found = true;
                Block::Qrc
            }
            BlockHeader::Qbn => {
                self.quest.qbn.found = true;
                Block::Qbn
            }
        };
        self.block_start = line;
        self.last_content = Some(line);
        self.current_message = None;
        self.current_task = None;
    }

    fn close_block(&mut self) {
        let Some(last) = self.last_content else {
            return;
        };
        let last_text = self.document.line(last as usize).unwrap_or_default();
        let range = lines_range(self.block_start, last, last_text);
        match self.block {
            Block::Preamble => {}
            Block::Qrc => self.quest.qrc.range = Some(range),
            Block::Qbn => self.quest.qbn.range = Some(range),
        }
    }

    fn is_skipped(text: &str) -> bool {
        recognizers::is_blank(text) || recognizers::is_comment(text)
    }

    fn preamble_line(&mut self, line: u32, text: &str) {
        if Self::is_skipped(text) {
            return;
        }
        self.last_content = Some(line);

        match recognizers::directive(line, text, self.language) {
            Some(directive) => self.quest.preamble.add_directive(directive),
            None => self
                .quest
                .preamble
                .failed_parse
                .push(trimmed_line_range(line, text)),
        }
    }

    fn qrc_line(&mut self, line: u32, text: &str) {
        if let Some(index) = self.current_message {
            if recognizers::is_blank(text) {
                let next = self.document.line(line as usize + 1);
                if recognizers::ends_message_block(next) {
                    self.current_message = None;
                }
                return;
            }
            if recognizers::is_comment(text) {
                return;
            }

            self.last_content = Some(line);
            let body_end = trimmed_line_range(line, text).end;
            self.quest.qrc.messages[index].block_range.end = body_end;

            let (symbols, macros) = recognizers::message_body(line, text);
            for occurrence in &symbols {
                self.quest
                    .qbn
                    .referenced_symbols
                    .insert(occurrence.symbol.clone());
            }
            self.quest.qrc.symbol_occurrences.extend(symbols);
            self.quest.qrc.macros.extend(macros);
            return;
        }

        if Self::is_skipped(text) {
            return;
        }
        self.last_content = Some(line);

        match recognizers::message_header(line, text) {
            Some(message) => {
                let index = self.quest.qrc.push_message(message);
                self.current_message = Some(index);
            }
            None => self
                .quest
                .qrc
                .failed_parse
                .push(trimmed_line_range(line, text)),
        }
    }

    fn qbn_line(&mut self, line: u32, text: &str) {
        if Self::is_skipped(text) {
            return;
        }
        self.last_content = Some(line);
        let qbn = &mut self.quest.qbn;

        if let Some(symbol) = recognizers::symbol_definition(line, text, self.language) {
            if let Some(signature) = &symbol.signature {
                qbn.record_references(signature);
            }
            qbn.symbols.insert(symbol.name.clone(), symbol);
            return;
        }

        if let Some(task) = recognizers::task_definition(line, text, self.language) {
            if task.kind == TaskKind::PersistUntil {
                qbn.referenced_tasks.insert(task.name.clone());
                qbn.persist_until_tasks.push(task);
                self.current_task = None;
            } else {
                let name = task.name.clone();
                qbn.tasks.insert(name.clone(), task);
                self.current_task = Some(name);
            }
            return;
        }

        let action = recognizers::boolean_expression(line, text)
            .or_else(|| recognizers::invocation(line, text, self.language));
        let Some(action) = action else {
            qbn.failed_parse
                .push(trimmed_line_range(line, text));
            return;
        };

        qbn.record_references(&action.signature);
        if let Some(definitions) = self
            .current_task
            .as_deref()
            .and_then(|name| qbn.tasks.definitions_mut(name))
        {
            let task = definitions.last_mut();
            task.block_range.end = action.range.end;
            if action.category == ActionCategory::Condition && task.kind == TaskKind::Standard {
                task.triggered = true;
            }
        }
        qbn.actions.push(action);
    }
}

//! One recognizer per line construct. Each takes a single line and either
//! returns the parsed node or `None`; none of them keep state.

use crate::language::{ActionCategory, LanguageData, Parameter, ParameterType};
use crate::parser::{Action, Directive, Message};
use crate::symbols::{Symbol, SymbolOccurrence, SymbolType, Task, TaskKind};
use crate::text::{span_range, trimmed_line_range};
use tower_lsp::lsp_types::Range;

macro_rules! regex {
    ($pattern:expr) => {{
        use std::sync::OnceLock;
        static REGEX: OnceLock<regex::Regex> = OnceLock::new();
        REGEX.get_or_init(|| regex::Regex::new($pattern).unwrap_or_else(|e| panic!("{}", e)))
    }};
}

pub const BOOLEAN_EXPRESSION: &str = "when";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockHeader {
    Qrc,
    Qbn,
}

pub fn block_header(line_text: &str) -> Option<BlockHeader> {
    match line_text.trim() {
        "QRC:" => Some(BlockHeader::Qrc),
        "QBN:" => Some(BlockHeader::Qbn),
        _ => None,
    }
}

pub fn is_comment(line_text: &str) -> bool {
    line_text.trim_start().starts_with('-')
}

pub fn is_blank(line_text: &str) -> bool {
    line_text.trim().is_empty()
}

/// A blank line closes a message block when the line after it is missing,
/// blank, a comment, or looks like the start of a declaration.
pub fn ends_message_block(next_line: Option<&str>) -> bool {
    match next_line {
        None => true,
        Some(next) => is_blank(next) || is_comment(next) || next.contains(':'),
    }
}

pub fn directive(line: u32, line_text: &str, language: &LanguageData) -> Option<Directive> {
    let re = regex!(r"^\s*(\w+):\s*(.*?)\s*$");
    let captures = re.captures(line_text)?;
    let name = captures.get(1)?;
    let value = captures.get(2)?;
    let keyword = language.keyword(name.as_str())?;
    let parameters = keyword.signature.capture(line, line_text, value.start())?;

    Some(Directive {
        keyword: name.as_str().to_string(),
        range: span_range(line, line_text, name.start(), name.end()),
        line_range: trimmed_line_range(line, line_text),
        parameters,
    })
}

/// `Name:  [id]` (static) or `Message:  id` (additional).
pub fn message_header(line: u32, line_text: &str) -> Option<Message> {
    let additional = regex!(r"^\s*Message:\s*(\d+)\s*$");
    if let Some(captures) = additional.captures(line_text) {
        let id = captures.get(1)?;
        return Some(Message {
            id: id.as_str().parse().ok()?,
            alias: None,
            range: trimmed_line_range(line, line_text),
            id_range: span_range(line, line_text, id.start(), id.end()),
            block_range: trimmed_line_range(line, line_text),
        });
    }

    let fixed = regex!(r"^\s*(\w+):\s*\[\s*(\d+)\s*\]\s*$");
    let captures = fixed.captures(line_text)?;
    let name = captures.get(1)?;
    let id = captures.get(2)?;
    Some(Message {
        id: id.as_str().parse().ok()?,
        alias: Some(name.as_str().to_string()),
        range: trimmed_line_range(line, line_text),
        id_range: span_range(line, line_text, id.start(), id.end()),
        block_range: trimmed_line_range(line, line_text),
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroOccurrence {
    pub name: String,
    pub range: Range,
}

pub fn message_body(line: u32, line_text: &str) -> (Vec<SymbolOccurrence>, Vec<MacroOccurrence>) {
    let symbol_re = regex!(r"(?:^|[^\w=])(_{1,3}|={1,2})([A-Za-z0-9.](?:[\w.]*[A-Za-z0-9.])?)_");
    let macro_re = regex!(r"%\w+");

    let symbols = symbol_re
        .captures_iter(line_text)
        .filter_map(|captures| {
            let prefix = captures.get(1)?;
            let name = captures.get(2)?;
            Some(SymbolOccurrence {
                symbol: format!("_{}_", name.as_str()),
                variation: prefix.as_str().to_string(),
                range: span_range(line, line_text, prefix.start(), name.end() + 1),
            })
        })
        .collect();

    let macros = macro_re
        .find_iter(line_text)
        .map(|found| MacroOccurrence {
            name: found.as_str().to_string(),
            range: span_range(line, line_text, found.start(), found.end()),
        })
        .collect();

    (symbols, macros)
}

/// `Type Name [pattern...]`. The symbol is returned even when the remainder
/// matches none of the type's definition patterns; `signature` is then `None`.
pub fn symbol_definition(line: u32, line_text: &str, language: &LanguageData) -> Option<Symbol> {
    let re = regex!(r"^\s*(Item|Person|Place|Clock|Foe)\s+(\S+)(?:\s+(.*?))?\s*$");
    let captures = re.captures(line_text)?;
    let symbol_type = SymbolType::from_name(captures.get(1)?.as_str())?;
    let name = captures.get(2)?;
    let remainder_start = captures.get(3).map(|m| m.start()).unwrap_or(name.end());

    let signature = language.symbol_type_info(symbol_type).and_then(|info| {
        info.definitions
            .iter()
            .find_map(|pattern| pattern.capture(line, line_text, remainder_start))
    });

    Some(Symbol {
        name: name.as_str().to_string(),
        symbol_type,
        range: span_range(line, line_text, name.start(), name.end()),
        block_range: trimmed_line_range(line, line_text),
        signature,
    })
}

/// Tried in order: `name task:`, `until name performed`, `variable name`,
/// `GlobalVar name`.
pub fn task_definition(line: u32, line_text: &str, language: &LanguageData) -> Option<Task> {
    let standard = regex!(r"^\s*([\w.]+)\s+task:\s*$");
    let until = regex!(r"^\s*until\s+([\w.]+)\s+performed:?\s*$");
    let variable = regex!(r"^\s*variable\s+([\w.]+)\s*$");
    let global = regex!(r"^\s*(\w+)\s+([\w.]+)\s*$");

    let build = |kind: TaskKind, name: regex::Match<'_>, global_var_name: Option<String>| Task {
        name: name.as_str().to_string(),
        kind,
        global_var_name,
        range: span_range(line, line_text, name.start(), name.end()),
        block_range: trimmed_line_range(line, line_text),
        triggered: false,
    };

    if let Some(captures) = standard.captures(line_text) {
        return Some(build(TaskKind::Standard, captures.get(1)?, None));
    }
    if let Some(captures) = until.captures(line_text) {
        return Some(build(TaskKind::PersistUntil, captures.get(1)?, None));
    }
    if let Some(captures) = variable.captures(line_text) {
        return Some(build(TaskKind::Variable, captures.get(1)?, None));
    }
    if let Some(captures) = global.captures(line_text) {
        let alias = captures.get(1)?.as_str();
        if language.is_global_variable(alias) {
            return Some(build(
                TaskKind::GlobalVarLink,
                captures.get(2)?,
                Some(alias.to_string()),
            ));
        }
    }

    None
}

/// `when [not] a and|or [not] b ...`; every operand is a task reference.
pub fn boolean_expression(line: u32, line_text: &str) -> Option<Action> {
    let re = regex!(r"^\s*when\s+(?:not\s+)?[\w.]+(?:\s+(?:and|or)\s+(?:not\s+)?[\w.]+)*\s*$");
    if !re.is_match(line_text) {
        return None;
    }

    let operand = regex!(r"[\w.]+");
    let signature = operand
        .find_iter(line_text)
        .filter(|word| !matches!(word.as_str(), "when" | "and" | "or" | "not"))
        .map(|word| Parameter {
            kind: ParameterType::Task,
            value: word.as_str().to_string(),
            range: span_range(line, line_text, word.start(), word.end()),
        })
        .collect();

    Some(Action {
        line,
        range: trimmed_line_range(line, line_text),
        signature,
        module_name: String::new(),
        overload: BOOLEAN_EXPRESSION.to_string(),
        category: ActionCategory::Condition,
    })
}

/// A module action or condition; the whole line must match one overload.
pub fn invocation(line: u32, line_text: &str, language: &LanguageData) -> Option<Action> {
    let found = language.find_invocation(line, line_text)?;
    Some(Action {
        line,
        range: trimmed_line_range(line, line_text),
        signature: found.parameters,
        module_name: found.action.module_name.clone(),
        overload: found.overload.source().to_string(),
        category: found.action.category,
    })
}

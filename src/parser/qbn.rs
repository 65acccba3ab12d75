use crate::language::{ActionCategory, Parameter, ParameterType};
use crate::symbols::{NameIndex, Symbol, Task};
use std::collections::HashSet;
use tower_lsp::lsp_types::Range;

#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    pub line: u32,
    pub range: Range,
    pub signature: Vec<Parameter>,
    /// Empty for boolean expressions, which belong to no module.
    pub module_name: String,
    /// Overload source text, or `when` for boolean expressions.
    pub overload: String,
    pub category: ActionCategory,
}

impl Action {
    pub fn is_boolean_expression(&self) -> bool {
        self.module_name.is_empty() && self.overload == super::recognizers::BOOLEAN_EXPRESSION
    }
}

/// Resource index for the QBN block.
///
/// Symbols and tasks keep every definition under their name; singular
/// lookups return the first one. References are accumulated while parsing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Qbn {
    pub(crate) found: bool,
    pub(crate) range: Option<Range>,
    pub(crate) symbols: NameIndex<Symbol>,
    pub(crate) tasks: NameIndex<Task>,
    pub(crate) persist_until_tasks: Vec<Task>,
    pub(crate) actions: Vec<Action>,
    pub(crate) failed_parse: Vec<Range>,
    pub(crate) referenced_symbols: HashSet<String>,
    pub(crate) referenced_tasks: HashSet<String>,
}

impl Qbn {
    pub(crate) fn record_references(&mut self, parameters: &[Parameter]) {
        for parameter in parameters {
            if parameter.kind.is_symbol() {
                self.referenced_symbols.insert(parameter.value.clone());
            } else if parameter.kind == ParameterType::Task {
                self.referenced_tasks.insert(parameter.value.clone());
            }
        }
    }

    pub fn found(&self) -> bool {
        self.found
    }

    pub fn range(&self) -> Option<Range> {
        self.range
    }

    pub fn symbol(&self, name: &str) -> Option<&Symbol> {
        self.symbols.get(name)
    }

    pub fn task(&self, name: &str) -> Option<&Task> {
        self.tasks.get(name)
    }

    pub fn symbols(&self) -> &NameIndex<Symbol> {
        &self.symbols
    }

    pub fn tasks(&self) -> &NameIndex<Task> {
        &self.tasks
    }

    pub fn persist_until_tasks(&self) -> &[Task] {
        &self.persist_until_tasks
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn failed_parse(&self) -> &[Range] {
        &self.failed_parse
    }

    pub fn is_symbol_referenced(&self, name: &str) -> bool {
        self.referenced_symbols.contains(name)
    }

    pub fn is_task_referenced(&self, name: &str) -> bool {
        self.referenced_tasks.contains(name)
    }
}

use crate::language::Parameter;
use std::collections::HashMap;
use tower_lsp::lsp_types::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolType {
    Item,
    Person,
    Place,
    Clock,
    Foe,
}

impl SymbolType {
    pub const ALL: [SymbolType; 5] = [
        SymbolType::Item,
        SymbolType::Person,
        SymbolType::Place,
        SymbolType::Clock,
        SymbolType::Foe,
    ];

    pub fn label(self) -> &'static str {
        match self {
            SymbolType::Item => "Item",
            SymbolType::Person => "Person",
            SymbolType::Place => "Place",
            SymbolType::Clock => "Clock",
            SymbolType::Foe => "Foe",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.label() == name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    pub name: String,
    pub symbol_type: SymbolType,
    pub range: Range,
    pub block_range: Range,
    /// `None` when the definition matched none of the type's patterns.
    pub signature: Option<Vec<Parameter>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    Standard,
    PersistUntil,
    Variable,
    GlobalVarLink,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub name: String,
    pub kind: TaskKind,
    pub global_var_name: Option<String>,
    pub range: Range,
    pub block_range: Range,
    /// Set when the task block opens with condition logic.
    pub triggered: bool,
}

impl Task {
    pub fn is_variable(&self) -> bool {
        matches!(self.kind, TaskKind::Variable | TaskKind::GlobalVarLink)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolOccurrence {
    /// Base symbol name, always wrapped as `_name_`.
    pub symbol: String,
    /// Derivation prefix as written (`_`, `__`, `___`, `=`, `==`).
    pub variation: String,
    pub range: Range,
}

/// Every definition seen under one name, in source order. Never empty.
#[derive(Debug, Clone, PartialEq)]
pub struct Definitions<T> {
    items: Vec<T>,
}

impl<T> Definitions<T> {
    fn new(first: T) -> Self {
        Self { items: vec![first] }
    }

    pub fn primary(&self) -> &T {
        &self.items[0]
    }

    pub fn all(&self) -> &[T] {
        &self.items
    }

    pub fn duplicates(&self) -> &[T] {
        &self.items[1..]
    }

    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub(crate) fn last_mut(&mut self) -> &mut T {
        let last = self.items.len() - 1;
        &mut self.items[last]
    }
}

/// Name lookup that keeps every definition and remembers first-seen order.
#[derive(Debug, Clone, PartialEq)]
pub struct NameIndex<T> {
    entries: Vec<(String, Definitions<T>)>,
    positions: HashMap<String, usize>,
}

impl<T> Default for NameIndex<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            positions: HashMap::new(),
        }
    }
}

impl<T> NameIndex<T> {
    /// Records a definition. Returns `true` when the name was already defined.
    pub fn insert(&mut self, name: String, definition: T) -> bool {
        match self.positions.get(&name) {
            Some(&position) => {
                self.entries[position].1.items.push(definition);
                true
            }
            None => {
                self.positions.insert(name.clone(), self.entries.len());
                self.entries.push((name, Definitions::new(definition)));
                false
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&T> {
        self.definitions(name).map(Definitions::primary)
    }

    pub fn definitions(&self, name: &str) -> Option<&Definitions<T>> {
        self.positions
            .get(name)
            .map(|&position| &self.entries[position].1)
    }

    pub(crate) fn definitions_mut(&mut self, name: &str) -> Option<&mut Definitions<T>> {
        let position = *self.positions.get(name)?;
        Some(&mut self.entries[position].1)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.positions.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Definitions<T>)> {
        self.entries
            .iter()
            .map(|(name, definitions)| (name.as_str(), definitions))
    }

    pub fn duplicated(&self) -> impl Iterator<Item = (&str, &Definitions<T>)> {
        self.iter().filter(|(_, definitions)| definitions.len() > 1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn definition_count(&self) -> usize {
        self.entries.iter().map(|(_, d)| d.len()).sum()
    }
}

/// Symbols and tasks are expected to be written as `_name_`.
pub fn symbol_follows_naming_conventions(name: &str) -> bool {
    name.len() >= 2 && name.starts_with('_') && name.ends_with('_')
}

pub fn force_symbol_naming_conventions(name: &str) -> String {
    let mut forced = String::with_capacity(name.len() + 2);
    if !name.starts_with('_') {
        forced.push('_');
    }
    forced.push_str(name);
    if !forced.ends_with('_') || forced.len() < 2 {
        forced.push('_');
    }
    forced
}

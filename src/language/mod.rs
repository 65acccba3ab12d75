//! Static language tables: keywords, symbol definitions, module catalogs.
//!
//! Everything here is loaded once and shared read-only behind an `Arc`.

mod signature;

pub use signature::{Parameter, ParameterType, SignaturePattern};

use crate::symbols::SymbolType;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

const LANGUAGE_FILE: &str = "language.json";
const TABLES_FILE: &str = "tables.json";
const MODULES_DIR: &str = "modules";

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed {file}: {source}")]
    Malformed {
        file: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid signature pattern '{pattern}': {source}")]
    InvalidSignature {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("unknown symbol type '{0}'")]
    UnknownSymbolType(String),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LanguageFile {
    #[serde(default)]
    keywords: BTreeMap<String, KeywordEntry>,
    #[serde(default)]
    symbols: BTreeMap<String, SymbolEntry>,
    #[serde(default)]
    macros: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct KeywordEntry {
    signature: String,
    #[serde(default)]
    summary: String,
}

#[derive(Debug, Deserialize)]
struct SymbolEntry {
    #[serde(default)]
    definitions: Vec<String>,
    #[serde(default)]
    variations: Vec<Variation>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TablesFile {
    #[serde(default)]
    static_messages: BTreeMap<String, u32>,
    #[serde(default)]
    global_variables: BTreeMap<String, u32>,
    #[serde(default)]
    attributes: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct ModuleFile {
    name: String,
    #[serde(default)]
    effects: Vec<String>,
    #[serde(default)]
    conditions: Vec<ModuleEntry>,
    #[serde(default)]
    actions: Vec<ModuleEntry>,
}

#[derive(Debug, Deserialize)]
struct ModuleEntry {
    #[serde(default)]
    summary: String,
    overloads: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Variation {
    pub prefix: String,
    #[serde(default)]
    pub summary: String,
}

#[derive(Debug, Clone)]
pub struct Keyword {
    pub name: String,
    pub summary: String,
    pub signature: SignaturePattern,
}

#[derive(Debug, Clone)]
pub struct SymbolTypeInfo {
    pub definitions: Vec<SignaturePattern>,
    pub variations: Vec<Variation>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionCategory {
    Action,
    Condition,
}

#[derive(Debug, Clone)]
pub struct ModuleAction {
    pub module_name: String,
    pub summary: String,
    pub category: ActionCategory,
    pub overloads: Vec<SignaturePattern>,
}

#[derive(Debug, Clone)]
pub struct InvocationMatch<'a> {
    pub action: &'a ModuleAction,
    pub overload: &'a SignaturePattern,
    pub parameters: Vec<Parameter>,
}

#[derive(Debug, Clone)]
pub struct LanguageData {
    keywords: HashMap<String, Keyword>,
    symbol_types: HashMap<SymbolType, SymbolTypeInfo>,
    macros: HashSet<String>,
    static_messages: HashMap<String, u32>,
    static_message_names: HashMap<u32, String>,
    global_variables: HashMap<String, u32>,
    attributes: HashMap<String, Vec<String>>,
    effect_keys: HashSet<String>,
    actions: Vec<ModuleAction>,
    by_leading_word: HashMap<String, Vec<usize>>,
    open_actions: Vec<usize>,
}

impl LanguageData {
    /// Reads `language.json`, `tables.json` and `modules/*.json` from `dir`.
    pub fn load(dir: &Path) -> Result<Self, LoadError> {
        let language = read_file(&dir.join(LANGUAGE_FILE))?;
        let tables = read_file(&dir.join(TABLES_FILE))?;

        let modules_dir = dir.join(MODULES_DIR);
        let mut module_paths = Vec::new();
        if modules_dir.is_dir() {
            let entries = std::fs::read_dir(&modules_dir).map_err(|source| LoadError::Read {
                path: modules_dir.clone(),
                source,
            })?;
            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().and_then(|s| s.to_str()) == Some("json") {
                    module_paths.push(path);
                }
            }
        }
        module_paths.sort();

        let mut modules = Vec::with_capacity(module_paths.len());
        for path in &module_paths {
            modules.push(read_file(path)?);
        }
        let modules: Vec<&str> = modules.iter().map(String::as_str).collect();

        debug!(dir = %dir.display(), modules = modules.len(), "loading language data");
        Self::from_parts(&language, &tables, &modules)
    }

    pub fn bundled() -> Result<Self, LoadError> {
        Self::from_parts(
            include_str!("../../data/language.json"),
            include_str!("../../data/tables.json"),
            &[include_str!("../../data/modules/daggerfall.json")],
        )
    }

    pub fn from_parts(language: &str, tables: &str, modules: &[&str]) -> Result<Self, LoadError> {
        let language: LanguageFile = parse_json(LANGUAGE_FILE, language)?;
        let tables: TablesFile = parse_json(TABLES_FILE, tables)?;

        let mut keywords = HashMap::new();
        for (name, entry) in language.keywords {
            keywords.insert(
                name.clone(),
                Keyword {
                    name,
                    summary: entry.summary,
                    signature: compile(&entry.signature)?,
                },
            );
        }

        let mut symbol_types = HashMap::new();
        for (name, entry) in language.symbols {
            let symbol_type = SymbolType::from_name(&name)
                .ok_or_else(|| LoadError::UnknownSymbolType(name.clone()))?;
            let definitions = entry
                .definitions
                .iter()
                .map(|pattern| compile(pattern))
                .collect::<Result<Vec<_>, _>>()?;
            symbol_types.insert(
                symbol_type,
                SymbolTypeInfo {
                    definitions,
                    variations: entry.variations,
                },
            );
        }

        let static_message_names = tables
            .static_messages
            .iter()
            .map(|(name, id)| (*id, name.clone()))
            .collect();

        let mut data = Self {
            keywords,
            symbol_types,
            macros: language.macros.into_iter().collect(),
            static_messages: tables.static_messages.into_iter().collect(),
            static_message_names,
            global_variables: tables.global_variables.into_iter().collect(),
            attributes: tables.attributes.into_iter().collect(),
            effect_keys: HashSet::new(),
            actions: Vec::new(),
            by_leading_word: HashMap::new(),
            open_actions: Vec::new(),
        };

        for (index, module) in modules.iter().enumerate() {
            let module: ModuleFile = parse_json(&format!("module #{}", index), module)?;
            data.add_module(module)?;
        }

        Ok(data)
    }

    fn add_module(&mut self, module: ModuleFile) -> Result<(), LoadError> {
        self.effect_keys.extend(module.effects);

        let entries = module
            .conditions
            .into_iter()
            .map(|entry| (ActionCategory::Condition, entry))
            .chain(
                module
                    .actions
                    .into_iter()
                    .map(|entry| (ActionCategory::Action, entry)),
            );

        for (category, entry) in entries {
            let overloads = entry
                .overloads
                .iter()
                .map(|pattern| compile(pattern))
                .collect::<Result<Vec<_>, _>>()?;

            let index = self.actions.len();
            let mut words: Vec<String> = Vec::new();
            let mut open = false;
            for overload in &overloads {
                match overload.leading_word() {
                    Some(word) if !words.iter().any(|w| w == word) => words.push(word.to_string()),
                    Some(_) => {}
                    None => open = true,
                }
            }
            for word in words {
                self.by_leading_word.entry(word).or_default().push(index);
            }
            if open {
                self.open_actions.push(index);
            }

            self.actions.push(ModuleAction {
                module_name: module.name.clone(),
                summary: entry.summary,
                category,
                overloads,
            });
        }

        Ok(())
    }

    pub fn keyword(&self, name: &str) -> Option<&Keyword> {
        self.keywords.get(name)
    }

    pub fn symbol_type_info(&self, symbol_type: SymbolType) -> Option<&SymbolTypeInfo> {
        self.symbol_types.get(&symbol_type)
    }

    pub fn variation(&self, symbol_type: SymbolType, prefix: &str) -> Option<&Variation> {
        self.symbol_type_info(symbol_type)?
            .variations
            .iter()
            .find(|v| v.prefix == prefix)
    }

    pub fn is_macro(&self, name: &str) -> bool {
        self.macros.contains(name)
    }

    pub fn static_message_id(&self, name: &str) -> Option<u32> {
        self.static_messages.get(name).copied()
    }

    pub fn static_message_name(&self, id: u32) -> Option<&str> {
        self.static_message_names.get(&id).map(String::as_str)
    }

    pub fn is_global_variable(&self, name: &str) -> bool {
        self.global_variables.contains_key(name)
    }

    pub fn attribute_values(&self, group: &str) -> Option<&[String]> {
        self.attributes.get(group).map(Vec::as_slice)
    }

    pub fn is_effect_key(&self, key: &str) -> bool {
        self.effect_keys.contains(key)
    }

    pub fn actions(&self) -> &[ModuleAction] {
        &self.actions
    }

    /// Finds the first action overload matching the whole line.
    ///
    /// Candidates are the actions indexed under the line's leading word,
    /// then those whose overloads start with a placeholder.
    pub fn find_invocation(&self, line: u32, line_text: &str) -> Option<InvocationMatch<'_>> {
        let leading = line_text.split_whitespace().next()?;
        let candidates = self
            .by_leading_word
            .get(leading)
            .into_iter()
            .flatten()
            .chain(self.open_actions.iter());

        for &index in candidates {
            let action = &self.actions[index];
            for overload in &action.overloads {
                if let Some(parameters) = overload.capture(line, line_text, 0) {
                    return Some(InvocationMatch {
                        action,
                        overload,
                        parameters,
                    });
                }
            }
        }

        None
    }
}

fn compile(pattern: &str) -> Result<SignaturePattern, LoadError> {
    SignaturePattern::compile(pattern).map_err(|source| LoadError::InvalidSignature {
        pattern: pattern.to_string(),
        source,
    })
}

fn read_file(path: &Path) -> Result<String, LoadError> {
    std::fs::read_to_string(path).map_err(|source| LoadError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_json<T: for<'de> Deserialize<'de>>(file: &str, content: &str) -> Result<T, LoadError> {
    serde_json::from_str(content).map_err(|source| LoadError::Malformed {
        file: file.to_string(),
        source,
    })
}

//! Linter and language server for quest scripts and quest tables.

pub mod backend;
pub mod config;
pub mod diagnostics;
pub mod language;
pub mod lint;
pub mod parser;
pub mod symbols;
pub mod table;
pub mod text;
pub mod workspace;

pub use language::{LanguageData, LoadError};
pub use lint::Linter;
pub use parser::Quest;

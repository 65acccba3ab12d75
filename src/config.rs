use crate::diagnostics::code_of;
use serde::Deserialize;
use std::path::PathBuf;
use tower_lsp::lsp_types::{Diagnostic, DiagnosticSeverity};
use tracing::warn;

const DEFAULT_DEBOUNCE_MS: u64 = 300;

/// Settings read from the client's `initializationOptions`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Directory holding `language.json`, `tables.json` and `modules/`.
    pub data_path: Option<PathBuf>,
    pub debounce_ms: u64,
    pub diagnostics: DiagnosticSettings,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            data_path: None,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            diagnostics: DiagnosticSettings::default(),
        }
    }
}

impl ServerSettings {
    pub fn from_options(options: Option<serde_json::Value>) -> Self {
        let Some(options) = options else {
            return Self::default();
        };
        match serde_json::from_value(options) {
            Ok(settings) => settings,
            Err(error) => {
                warn!(%error, "ignoring malformed initialization options");
                Self::default()
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DiagnosticSettings {
    pub enabled: bool,
    pub ignore: Vec<String>,
    pub hints: bool,
}

impl Default for DiagnosticSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            ignore: Vec::new(),
            hints: true,
        }
    }
}

impl DiagnosticSettings {
    pub fn retain(&self, diagnostics: &mut Vec<Diagnostic>) {
        if !self.enabled {
            diagnostics.clear();
            return;
        }
        diagnostics.retain(|diagnostic| {
            let ignored = code_of(diagnostic).is_some_and(|code| self.ignore.iter().any(|i| i == code));
            let hidden_hint = !self.hints && diagnostic.severity == Some(DiagnosticSeverity::HINT);
            !ignored && !hidden_hint
        });
    }
}

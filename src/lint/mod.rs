//! Validators over a parsed quest and the linter that runs them.

pub mod parameters;
mod preamble;
mod qbn;
mod qrc;

use crate::config::DiagnosticSettings;
use crate::diagnostics;
use crate::language::{LanguageData, Parameter, ParameterType};
use crate::parser::Quest;
use crate::table;
use crate::text::Document;
use crate::workspace::{is_table_file, CancellationFlag, QuestCache, QuestRepository};
use std::path::Path;
use std::sync::Arc;
use tower_lsp::lsp_types::{Diagnostic, Range, Url};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Quest,
    Table,
}

impl DocumentKind {
    pub fn of(uri: &Url) -> Self {
        if is_table_file(Path::new(uri.path())) {
            DocumentKind::Table
        } else {
            DocumentKind::Quest
        }
    }
}

/// Anchor for block-level findings: the quest name, or the top of the file.
pub(crate) fn block_anchor(quest: &Quest) -> Range {
    quest.preamble().quest_name_range().unwrap_or_default()
}

/// Quest file name for a numeric quest index: `999` is `S0000999`.
fn quest_index_name(value: &str) -> Option<String> {
    value.parse::<u32>().ok().map(|index| format!("S{:07}", index))
}

/// Runs every validator. Only constructible from loaded language data.
#[derive(Debug, Clone)]
pub struct Linter {
    language: Arc<LanguageData>,
}

impl Linter {
    pub fn new(language: Arc<LanguageData>) -> Self {
        Self { language }
    }

    pub fn language(&self) -> &Arc<LanguageData> {
        &self.language
    }

    pub fn lint_quest(&self, quest: &Quest, uri: &Url) -> Vec<Diagnostic> {
        let mut diagnostics = preamble::validate(quest, &self.language);
        diagnostics.extend(qrc::validate(quest, &self.language, uri));
        diagnostics.extend(qbn::validate(quest, &self.language, uri));
        diagnostics
    }

    /// Checks quest references against the workspace.
    ///
    /// Returns nothing when `cancel` trips before the quest listing arrives.
    pub async fn lint_cross_quest(
        &self,
        quest: &Quest,
        repository: &dyn QuestRepository,
        cancel: &CancellationFlag,
    ) -> Vec<Diagnostic> {
        let qbn = quest.qbn();
        let definition_parameters = qbn
            .symbols()
            .iter()
            .flat_map(|(_, definitions)| definitions.all())
            .filter_map(|symbol| symbol.signature.as_ref())
            .flatten();
        let action_parameters = qbn.actions().iter().flat_map(|action| &action.signature);
        let references: Vec<&Parameter> = definition_parameters
            .chain(action_parameters)
            .filter(|p| matches!(p.kind, ParameterType::QuestName | ParameterType::QuestIndex))
            .collect();
        if references.is_empty() {
            return Vec::new();
        }

        let names = match repository.all_quest_names(cancel).await {
            Some(names) => names,
            None => return Vec::new(),
        };
        let known = |name: &str| names.iter().any(|n| n.eq_ignore_ascii_case(name));

        let mut diagnostics = Vec::new();
        for parameter in references {
            match parameter.kind {
                ParameterType::QuestName => {
                    if !known(&parameter.value) {
                        diagnostics.push(diagnostics::undefined_quest(
                            parameter.range,
                            &parameter.value,
                        ));
                    }
                }
                ParameterType::QuestIndex => {
                    if let Some(invalid) = parameters::check_natural(parameter) {
                        diagnostics.push(invalid);
                    } else if let Some(name) = quest_index_name(&parameter.value) {
                        if !known(&name) {
                            diagnostics.push(diagnostics::undefined_quest(parameter.range, &name));
                        }
                    }
                }
                _ => {}
            }
        }
        diagnostics
    }

    pub async fn lint_table(
        &self,
        text: &str,
        uri: &Url,
        repository: &dyn QuestRepository,
        cancel: &CancellationFlag,
    ) -> Vec<Diagnostic> {
        table::lint_table(text, uri, repository, cancel).await
    }

    pub async fn lint_document(
        &self,
        uri: &Url,
        document: &Document,
        cache: &QuestCache,
        repository: &dyn QuestRepository,
        cancel: &CancellationFlag,
        settings: &DiagnosticSettings,
    ) -> Vec<Diagnostic> {
        let mut diagnostics = match DocumentKind::of(uri) {
            DocumentKind::Table => {
                self.lint_table(document.text(), uri, repository, cancel).await
            },
            DocumentKind::Quest => {
                let quest = cache.get_or_parse(uri, document, &self.language);
                let mut diagnostics = self.lint_quest(&quest, uri);
                diagnostics.extend(self.lint_cross_quest(&quest, repository, cancel).await);
                diagnostics
            }
        };

        settings.retain(&mut diagnostics);
        debug!(%uri, version = document.version(), found = diagnostics.len(), "linted document");
        diagnostics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::code_of;
    use crate::workspace::WorkspaceQuests;
    use tower_lsp::lsp_types::DiagnosticSeverity;

    struct KnownQuests(Vec<&'static str>);

    #[tower_lsp::async_trait]
    impl QuestRepository for KnownQuests {
        async fn quest_exists(&self, name: &str, cancel: &CancellationFlag) -> bool {
            !cancel.is_cancelled() && self.0.iter().any(|q| q.eq_ignore_ascii_case(name))
        }

        async fn all_quest_names(&self, cancel: &CancellationFlag) -> Option<Arc<Vec<String>>> {
            if cancel.is_cancelled() {
                return None;
            }
            Some(Arc::new(self.0.iter().map(|q| q.to_string()).collect()))
        }
    }

    const QUEST: &str = "\
Quest: M0B00Y16
DisplayName: The Wayward Knight
-- Message panels
QRC:

QuestorOffer:  [1000]
<ce> Find my _gold_, %pcn.

RefuseQuest:  [1001]
<ce> Pity.

Message:  1011
<ce> __qgiver_ thanks you.

QBN:
Item _gold_ gold
Person _qgiver_ group Questor
Clock _timer_ 00:30

--\tQuest start-up:
\tstart timer _timer_
\tlog 1011 step 0
\tstart quest K0C00Y04

_timer_ task:
\tend quest

_found_ task:
\tclicked item _gold_
\tgive item _gold_ to _qgiver_
";

    fn linter() -> Linter {
        Linter::new(Arc::new(LanguageData::bundled().unwrap()))
    }

    fn uri(name: &str) -> Url {
        Url::parse(&format!("file:///quests/{}", name)).unwrap()
    }

    fn problems(diagnostics: &[Diagnostic]) -> Vec<&str> {
        diagnostics
            .iter()
            .filter(|d| d.severity != Some(DiagnosticSeverity::HINT))
            .filter_map(code_of)
            .collect()
    }

    #[test]
    fn picks_dialect_from_file_name() {
        assert_eq!(DocumentKind::of(&uri("QuestList-Classic.txt")), DocumentKind::Table);
        assert_eq!(DocumentKind::of(&uri("M0B00Y16.txt")), DocumentKind::Quest);
    }

    #[test]
    fn well_formed_quest_only_has_hints() {
        let linter = linter();
        let quest = Quest::parse_text(QUEST, linter.language());
        let diagnostics = linter.lint_quest(&quest, &uri("M0B00Y16.txt"));
        assert!(problems(&diagnostics).is_empty(), "{:?}", diagnostics);

        let hints: Vec<_> = diagnostics.iter().filter_map(code_of).collect();
        assert_eq!(hints, vec!["symbol-variation", "symbol-variation"]);
    }

    #[test]
    fn reports_blocks_in_document_order() {
        let linter = linter();
        let quest = Quest::parse_text("Quest: M0B00Y16\nnonsense\n", linter.language());
        let diagnostics = linter.lint_quest(&quest, &uri("M0B00Y16.txt"));
        let codes: Vec<_> = diagnostics.iter().filter_map(code_of).collect();
        assert_eq!(codes, vec!["undefined-expression", "missing-block", "missing-block"]);
        assert!(diagnostics[1].message.starts_with("QRC"));
        assert!(diagnostics[2].message.starts_with("QBN"));
    }

    #[tokio::test]
    async fn checks_quest_references_against_the_workspace() {
        let linter = linter();
        let quest = Quest::parse_text(QUEST, linter.language());
        let cancel = CancellationFlag::new();

        let known = KnownQuests(vec!["k0c00y04"]);
        assert!(linter.lint_cross_quest(&quest, &known, &cancel).await.is_empty());

        let unknown = KnownQuests(vec![]);
        let diagnostics = linter.lint_cross_quest(&quest, &unknown, &cancel).await;
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(code_of(&diagnostics[0]), Some("undefined-quest"));
        assert_eq!(diagnostics[0].range.start.line, 22);
    }

    #[tokio::test]
    async fn quest_indices_must_be_natural_numbers() {
        let linter = linter();
        let quest = Quest::parse_text("QBN:\n\tstart quest 12 +3\n", linter.language());
        let diagnostics = linter
            .lint_cross_quest(&quest, &KnownQuests(vec!["S0000012"]), &CancellationFlag::new())
            .await;
        let codes: Vec<_> = diagnostics.iter().filter_map(code_of).collect();
        assert_eq!(codes, vec!["signed-natural-number"]);
    }

    #[tokio::test]
    async fn resolves_quest_indices_to_workspace_quests() {
        let linter = linter();
        let quest = Quest::parse_text("QBN:\n\tstart quest 999 42\n", linter.language());
        let workspace = KnownQuests(vec!["M0B00Y16", "s0000999"]);
        let diagnostics = linter
            .lint_cross_quest(&quest, &workspace, &CancellationFlag::new())
            .await;
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(code_of(&diagnostics[0]), Some("undefined-quest"));
        assert!(diagnostics[0].message.contains("S0000042"));
        assert_eq!(diagnostics[0].range.start.character, 17);
        assert_eq!(diagnostics[0].range.end.character, 19);
    }

    #[tokio::test]
    async fn cancelled_cross_quest_checks_return_nothing() {
        let linter = linter();
        let quest = Quest::parse_text(QUEST, linter.language());
        let cancel = CancellationFlag::new();
        cancel.cancel();
        let diagnostics = linter
            .lint_cross_quest(&quest, &KnownQuests(vec![]), &cancel)
            .await;
        assert!(diagnostics.is_empty());
    }

    #[tokio::test]
    async fn lints_documents_through_the_cache_and_settings() {
        let linter = linter();
        let cache = QuestCache::default();
        let repository = KnownQuests(vec![]);
        let cancel = CancellationFlag::new();
        let settings = DiagnosticSettings {
            ignore: vec!["symbol-variation".to_string()],
            ..DiagnosticSettings::default()
        };

        let quest_uri = uri("M0B00Y16.txt");
        let document = Document::with_version(QUEST.to_string(), 3);
        let diagnostics = linter
            .lint_document(&quest_uri, &document, &cache, &repository, &cancel, &settings)
            .await;
        let codes: Vec<_> = diagnostics.iter().filter_map(code_of).collect();
        assert_eq!(codes, vec!["undefined-quest"]);
        assert_eq!(cache.len(), 1);

        let table_uri = uri("QuestList-Test.txt");
        let table = Document::new("schema: id,name\n1,  foo, extra\n1, foo\n".to_string());
        let diagnostics = linter
            .lint_document(&table_uri, &table, &cache, &repository, &cancel, &settings)
            .await;
        let codes: Vec<_> = diagnostics.iter().filter_map(code_of).collect();
        assert_eq!(codes, vec!["schema-mismatch"]);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn cancelled_table_lints_skip_the_workspace_scan() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("M0B00Y16.txt"), "").unwrap();
        let workspace = WorkspaceQuests::new(vec![dir.path().to_path_buf()]);
        let cancel = CancellationFlag::new();
        cancel.cancel();

        let table = Document::new("schema: *name\nNOPE\n".to_string());
        let diagnostics = linter()
            .lint_document(
                &uri("QuestList-X.txt"),
                &table,
                &QuestCache::default(),
                &workspace,
                &cancel,
                &DiagnosticSettings::default(),
            )
            .await;
        assert!(diagnostics.is_empty());
        assert_eq!(workspace.scan_count(), 0);
    }
}

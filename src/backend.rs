use crate::config::ServerSettings;
use crate::language::LanguageData;
use crate::lint::Linter;
use crate::text::{Document, DocumentStore};
use crate::workspace::{CancellationFlag, QuestCache, WorkspaceQuests};
use dashmap::DashMap;
use parking_lot::RwLock;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer};
use tracing::{debug, error, info};

#[derive(Clone)]
pub struct Backend {
    pub(crate) client: Client,
    pub(crate) documents: Arc<DocumentStore>,
    pub(crate) settings: Arc<RwLock<ServerSettings>>,
    /// Set once language data has loaded; linting is off until then.
    pub(crate) linter: Arc<RwLock<Option<Linter>>>,
    pub(crate) quests: Arc<QuestCache>,
    pub(crate) workspace: Arc<WorkspaceQuests>,
    /// Cancellation for the newest lint of each document.
    pub(crate) pending: Arc<DashMap<String, CancellationFlag>>,
}

impl Backend {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            documents: Arc::new(DocumentStore::default()),
            settings: Arc::new(RwLock::new(ServerSettings::default())),
            linter: Arc::new(RwLock::new(None)),
            quests: Arc::new(QuestCache::default()),
            workspace: Arc::new(WorkspaceQuests::default()),
            pending: Arc::new(DashMap::new()),
        }
    }

    fn load_language(&self) -> std::result::Result<LanguageData, crate::language::LoadError> {
        let data_path = self.settings.read().data_path.clone();
        match data_path {
            Some(dir) => LanguageData::load(&dir),
            None => LanguageData::bundled(),
        }
    }

    pub(crate) async fn lint(&self, uri: &Url) {
        let linter = self.linter.read().clone();
        let document = self.documents.get(uri.as_str()).map(|doc| doc.clone());
        let (Some(linter), Some(document)) = (linter, document) else {
            return;
        };

        let cancel = CancellationFlag::new();
        if let Some(previous) = self.pending.insert(uri.to_string(), cancel.clone()) {
            previous.cancel();
        }
        let settings = self.settings.read().diagnostics.clone();

        let diagnostics = linter
            .lint_document(
                uri,
                &document,
                &self.quests,
                self.workspace.as_ref(),
                &cancel,
                &settings,
            )
            .await;

        if cancel.is_cancelled() {
            debug!(%uri, "lint superseded");
            return;
        }
        self.pending
            .remove_if(uri.as_str(), |_, flag| !flag.is_cancelled());

        self.client
            .publish_diagnostics(uri.clone(), diagnostics, Some(document.version()))
            .await;
    }

    /// Lints after the debounce window unless a newer change arrives first.
    fn schedule_lint(&self, uri: Url, version: i32) {
        let backend = self.clone();
        let delay = Duration::from_millis(self.settings.read().debounce_ms);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let current = backend.documents.get(uri.as_str()).map(|doc| doc.version());
            if current == Some(version) {
                backend.lint(&uri).await;
            }
        });
    }
}

pub(crate) fn workspace_roots(params: &InitializeParams) -> Vec<PathBuf> {
    let mut roots: Vec<PathBuf> = Vec::new();
    let mut push = |path: PathBuf| {
        if !roots.iter().any(|existing| existing == &path) {
            roots.push(path);
        }
    };

    if let Some(root_uri) = params.root_uri.as_ref() {
        if let Ok(path) = root_uri.to_file_path() {
            push(path);
        }
    }

    #[allow(deprecated)]
    if let Some(root_path) = params.root_path.as_ref() {
        if !root_path.is_empty() {
            push(PathBuf::from(root_path));
        }
    }

    if let Some(folders) = params.workspace_folders.as_ref() {
        for folder in folders {
            if let Ok(path) = folder.uri.to_file_path() {
                push(path);
            }
        }
    }

    roots
}

#[tower_lsp::async_trait]
impl LanguageServer for Backend {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        *self.settings.write() = ServerSettings::from_options(params.initialization_options.clone());
        self.workspace.set_roots(workspace_roots(&params)).await;

        Ok(InitializeResult {
            server_info: Some(ServerInfo {
                name: "quest-lsp".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Options(
                    TextDocumentSyncOptions {
                        open_close: Some(true),
                        change: Some(TextDocumentSyncKind::FULL),
                        save: Some(TextDocumentSyncSaveOptions::Supported(true)),
                        ..Default::default()
                    },
                )),
                ..Default::default()
            },
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        match self.load_language() {
            Ok(language) => {
                *self.linter.write() = Some(Linter::new(Arc::new(language)));
                info!(roots = self.workspace.roots().len(), "language data loaded");
                self.client
                    .log_message(MessageType::INFO, "Quest LSP server initialized")
                    .await;
            }
            Err(err) => {
                error!(error = %err, "failed to load language data");
                self.client
                    .show_message(
                        MessageType::ERROR,
                        format!("Quest linting is disabled: {}", err),
                    )
                    .await;
            }
        }
    }

    async fn shutdown(&self) -> Result<()> {
        for entry in self.pending.iter() {
            entry.value().cancel();
        }
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let document = params.text_document;
        let uri = document.uri;

        self.documents.insert(
            uri.to_string(),
            Document::with_version(document.text, document.version),
        );
        self.lint(&uri).await;

        self.client
            .log_message(MessageType::INFO, format!("Opened document: {}", uri))
            .await;
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri;
        let version = params.text_document.version;

        if let Some(change) = params.content_changes.into_iter().last() {
            self.documents
                .insert(uri.to_string(), Document::with_version(change.text, version));
            self.schedule_lint(uri, version);
        }
    }

    async fn did_save(&self, params: DidSaveTextDocumentParams) {
        let uri = params.text_document.uri;

        self.workspace.invalidate().await;
        self.lint(&uri).await;
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri;

        self.documents.remove(uri.as_str());
        self.quests.remove(&uri);
        if let Some((_, flag)) = self.pending.remove(uri.as_str()) {
            flag.cancel();
        }
        self.client.publish_diagnostics(uri, Vec::new(), None).await;
    }
}

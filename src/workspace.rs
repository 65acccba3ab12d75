//! Workspace quest discovery and the per-document parse cache.

use crate::language::LanguageData;
use crate::parser::Quest;
use crate::text::Document;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_lsp::lsp_types::Url;
use tracing::{debug, warn};
use walkdir::WalkDir;

const QUEST_EXTENSION: &str = "txt";
const TABLE_PREFIX: &str = "QuestList";

/// Cooperative cancellation shared between a lint run and whoever supersedes it.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[tower_lsp::async_trait]
pub trait QuestRepository: Send + Sync {
    /// Case-insensitive lookup by quest name; `false` when cancelled.
    async fn quest_exists(&self, name: &str, cancel: &CancellationFlag) -> bool;

    /// Every quest name in the workspace, or `None` when cancelled.
    async fn all_quest_names(&self, cancel: &CancellationFlag) -> Option<Arc<Vec<String>>>;
}

/// Quest files are `*.txt` files that are not quest tables.
pub fn is_quest_file(path: &Path) -> bool {
    let is_txt = path
        .extension()
        .and_then(|s| s.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(QUEST_EXTENSION));
    is_txt && !is_table_file(path)
}

pub fn is_table_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|s| s.to_str())
        .is_some_and(|name| name.starts_with(TABLE_PREFIX))
}

/// Quest listing over the workspace roots.
///
/// Callers serialize on the listing lock, so a request made while a scan is
/// running waits for it and reuses its result.
#[derive(Debug, Default)]
pub struct WorkspaceQuests {
    roots: RwLock<Vec<PathBuf>>,
    listing: Mutex<Option<Arc<Vec<String>>>>,
    scans: AtomicUsize,
}

impl WorkspaceQuests {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self {
            roots: RwLock::new(roots),
            ..Self::default()
        }
    }

    pub async fn set_roots(&self, roots: Vec<PathBuf>) {
        *self.roots.write() = roots;
        self.invalidate().await;
    }

    pub fn roots(&self) -> Vec<PathBuf> {
        self.roots.read().clone()
    }

    /// Drops the cached listing; the next request rescans.
    pub async fn invalidate(&self) {
        *self.listing.lock().await = None;
    }

    pub fn scan_count(&self) -> usize {
        self.scans.load(Ordering::SeqCst)
    }
}

#[tower_lsp::async_trait]
impl QuestRepository for WorkspaceQuests {
    async fn quest_exists(&self, name: &str, cancel: &CancellationFlag) -> bool {
        self.all_quest_names(cancel)
            .await
            .is_some_and(|names| names.iter().any(|n| n.eq_ignore_ascii_case(name)))
    }

    async fn all_quest_names(&self, cancel: &CancellationFlag) -> Option<Arc<Vec<String>>> {
        let mut listing = self.listing.lock().await;
        if let Some(names) = listing.as_ref() {
            return Some(names.clone());
        }
        if cancel.is_cancelled() {
            return None;
        }

        self.scans.fetch_add(1, Ordering::SeqCst);
        let roots = self.roots();
        let flag = cancel.clone();
        let scanned = match tokio::task::spawn_blocking(move || scan_roots(&roots, &flag)).await {
            Ok(scanned) => scanned,
            Err(error) => {
                warn!(%error, "quest scan failed");
                return None;
            }
        };

        let names = Arc::new(scanned?);
        if cancel.is_cancelled() {
            return None;
        }
        debug!(quests = names.len(), "scanned workspace quests");
        *listing = Some(names.clone());
        Some(names)
    }
}

fn scan_roots(roots: &[PathBuf], cancel: &CancellationFlag) -> Option<Vec<String>> {
    let mut visited = HashSet::new();
    let mut names = Vec::new();

    for root in roots {
        if !visited.insert(root.clone()) || !root.exists() {
            continue;
        }

        for entry in WalkDir::new(root)
            .follow_links(false)
            .into_iter()
            .filter_map(|entry| entry.ok())
        {
            if cancel.is_cancelled() {
                return None;
            }
            if !entry.file_type().is_file() || !is_quest_file(entry.path()) {
                continue;
            }
            if let Some(stem) = entry.path().file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }
    }

    names.sort();
    names.dedup();
    Some(names)
}

/// Parsed quests keyed by document URI, replaced when the version advances.
#[derive(Debug, Default)]
pub struct QuestCache {
    entries: DashMap<String, (i32, Arc<Quest>)>,
}

impl QuestCache {
    pub fn get_or_parse(&self, uri: &Url, document: &Document, language: &LanguageData) -> Arc<Quest> {
        let key = uri.to_string();
        if let Some(entry) = self.entries.get(&key) {
            let (version, quest) = entry.value();
            if *version >= document.version() {
                return quest.clone();
            }
        }

        let quest = Arc::new(Quest::parse(document, language));
        self.entries
            .insert(key, (document.version(), quest.clone()));
        quest
    }

    pub fn remove(&self, uri: &Url) {
        self.entries.remove(uri.as_str());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn workspace() -> (tempfile::TempDir, WorkspaceQuests) {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("M0B00Y16.txt"), "Quest: M0B00Y16\n").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub").join("K0C00Y04.TXT"), "").unwrap();
        fs::write(dir.path().join("QuestList-Custom.txt"), "schema: *name\n").unwrap();
        fs::write(dir.path().join("notes.md"), "").unwrap();
        let quests = WorkspaceQuests::new(vec![dir.path().to_path_buf()]);
        (dir, quests)
    }

    #[test]
    fn classifies_files() {
        assert!(is_quest_file(Path::new("/q/M0B00Y16.txt")));
        assert!(is_quest_file(Path::new("/q/M0B00Y16.TXT")));
        assert!(!is_quest_file(Path::new("/q/QuestList-Classic.txt")));
        assert!(!is_quest_file(Path::new("/q/readme.md")));
        assert!(is_table_file(Path::new("/q/QuestList-Classic.txt")));
    }

    #[tokio::test]
    async fn lists_quest_names_from_every_root() {
        let (_dir, quests) = workspace();
        let names = quests
            .all_quest_names(&CancellationFlag::new())
            .await
            .unwrap();
        assert_eq!(names.as_slice(), &["K0C00Y04".to_string(), "M0B00Y16".to_string()]);
        assert!(quests.quest_exists("m0b00y16", &CancellationFlag::new()).await);
        assert!(!quests.quest_exists("QuestList-Custom", &CancellationFlag::new()).await);
    }

    #[tokio::test]
    async fn concurrent_requests_share_one_scan() {
        let (_dir, quests) = workspace();
        let quests = Arc::new(quests);
        let cancel = CancellationFlag::new();
        let (a, b, c) = tokio::join!(
            quests.all_quest_names(&cancel),
            quests.all_quest_names(&cancel),
            quests.quest_exists("K0C00Y04", &cancel),
        );
        assert_eq!(a.unwrap().len(), 2);
        assert_eq!(b.unwrap().len(), 2);
        assert!(c);
        assert_eq!(quests.scan_count(), 1);
    }

    #[tokio::test]
    async fn invalidation_triggers_a_rescan() {
        let (dir, quests) = workspace();
        assert!(!quests.quest_exists("NEWQUEST", &CancellationFlag::new()).await);
        fs::write(dir.path().join("NEWQUEST.txt"), "").unwrap();
        assert!(!quests.quest_exists("NEWQUEST", &CancellationFlag::new()).await);

        quests.invalidate().await;
        assert!(quests.quest_exists("NEWQUEST", &CancellationFlag::new()).await);
        assert_eq!(quests.scan_count(), 2);
    }

    #[tokio::test]
    async fn cancelled_requests_return_nothing_and_cache_nothing() {
        let (_dir, quests) = workspace();
        let cancel = CancellationFlag::new();
        cancel.cancel();
        assert!(quests.all_quest_names(&cancel).await.is_none());
        assert!(!quests.quest_exists("M0B00Y16", &cancel).await);
        assert_eq!(quests.scan_count(), 0);

        let names = quests.all_quest_names(&CancellationFlag::new()).await;
        assert_eq!(names.map(|n| n.len()), Some(2));
    }

    #[test]
    fn cache_reparses_only_newer_versions() {
        let language = LanguageData::bundled().unwrap();
        let cache = QuestCache::default();
        let uri = Url::parse("file:///quests/TEST.txt").unwrap();

        let first = Document::with_version("QBN:\nItem _a_ gold\n".to_string(), 1);
        let parsed = cache.get_or_parse(&uri, &first, &language);
        let again = cache.get_or_parse(&uri, &first, &language);
        assert!(Arc::ptr_eq(&parsed, &again));

        let second = Document::with_version("QBN:\nItem _b_ gold\n".to_string(), 2);
        let reparsed = cache.get_or_parse(&uri, &second, &language);
        assert!(reparsed.qbn().symbol("_b_").is_some());
        assert!(parsed.qbn().symbol("_a_").is_some());
        assert_eq!(cache.len(), 1);

        cache.remove(&uri);
        assert!(cache.is_empty());
    }
}

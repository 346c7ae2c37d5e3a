//! File list state

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::backend::{BackendError, FileBackend, FileEntry};
use crate::state::PanelEvent;
use crate::task::drain_finished;

/// Shown when the backend could not be reached
pub const CONNECT_FAILED: &str = "Error connecting to server";
/// Shown for any other list failure
pub const LOAD_FAILED: &str = "Failed to load files";

/// Completion of one refresh, stamped with the order it resolved in
type Stamped = (u64, Result<Vec<FileEntry>, BackendError>);

/// Load status of the file list
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ListStatus {
    #[default]
    Loading,
    Ready,
    Error(String),
}

/// Result of a `ListStore::poll`
#[derive(Debug, Default)]
pub struct ListPoll {
    pub events: Vec<PanelEvent>,
    /// A successful response was applied to `items`
    pub refreshed: bool,
}

/// Owns the fetched file collection. `refresh` is the only way `items`
/// change; they are replaced wholesale on every successful response.
#[derive(Default)]
pub struct ListStore {
    /// Last successfully fetched files
    items: Vec<FileEntry>,
    status: ListStatus,
    /// Outstanding refreshes; overlapping calls all run to completion
    tasks: Vec<JoinHandle<Stamped>>,
    /// Shared completion counter, bumped by each task as it resolves
    resolved: Arc<AtomicU64>,
}

impl ListStore {
    pub fn status(&self) -> &ListStatus {
        &self.status
    }

    pub fn is_loading(&self) -> bool {
        self.status == ListStatus::Loading
    }

    pub fn error(&self) -> Option<&str> {
        match &self.status {
            ListStatus::Error(msg) => Some(msg),
            _ => None,
        }
    }

    /// Files to show. `None` unless the last load succeeded.
    pub fn items(&self) -> Option<&[FileEntry]> {
        match self.status {
            ListStatus::Ready => Some(&self.items),
            _ => None,
        }
    }

    /// Ready with nothing in it
    pub fn is_empty(&self) -> bool {
        self.status == ListStatus::Ready && self.items.is_empty()
    }

    /// Look up a shown file by name
    pub fn find(&self, filename: &str) -> Option<&FileEntry> {
        self.items()?.iter().find(|f| f.filename == filename)
    }

    pub fn has_pending(&self) -> bool {
        !self.tasks.is_empty()
    }

    /// Start a list request. Never queued or cancelled: if another refresh is
    /// in flight both complete, and whichever resolves last wins.
    pub fn refresh<B: FileBackend>(&mut self, backend: &B) -> Option<PanelEvent> {
        self.status = ListStatus::Loading;

        let backend = backend.clone();
        let resolved = Arc::clone(&self.resolved);

        tracing::info!("Refreshing file list ({} already in flight)", self.tasks.len());

        self.tasks.push(tokio::spawn(async move {
            let result = backend.list_files().await;
            (resolved.fetch_add(1, Ordering::SeqCst), result)
        }));

        Some(PanelEvent::StatusMessage("Loading files...".to_string()))
    }

    /// Apply finished refreshes in the order they resolved
    pub fn poll(&mut self) -> ListPoll {
        let mut out = ListPoll::default();

        let mut finished = Vec::new();
        for joined in drain_finished(&mut self.tasks) {
            match joined {
                Ok(stamped) => finished.push(stamped),
                Err(e) => {
                    out.events
                        .push(PanelEvent::LogError(format!("File list task panicked: {}", e)));
                    // Sorts before any real completion
                    finished.push((0, Err(BackendError::Decode(e.to_string()))));
                }
            }
        }
        finished.sort_by_key(|(seq, _)| *seq);

        for (_, result) in finished {
            match result {
                Ok(files) => {
                    self.items = dedupe(files);
                    self.status = ListStatus::Ready;
                    out.refreshed = true;
                    out.events
                        .push(PanelEvent::LogInfo(format!("Loaded {} files", self.items.len())));
                }
                Err(e) => {
                    // Previous items stay in memory but are not shown
                    let msg = if e.is_connection() { CONNECT_FAILED } else { LOAD_FAILED };
                    out.events
                        .push(PanelEvent::LogError(format!("Failed to load file list: {}", e)));
                    self.status = ListStatus::Error(msg.to_string());
                }
            }
        }

        // Still loading while anything is outstanding
        if self.has_pending() {
            self.status = ListStatus::Loading;
        }

        out
    }
}

/// Drop repeated filenames, keeping the first occurrence and the order
fn dedupe(files: Vec<FileEntry>) -> Vec<FileEntry> {
    let mut seen = HashSet::new();
    let before = files.len();
    let files: Vec<FileEntry> = files
        .into_iter()
        .filter(|f| seen.insert(f.filename.clone()))
        .collect();
    if files.len() != before {
        tracing::warn!("Backend returned {} duplicate filenames", before - files.len());
    }
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::fake::FakeBackend;

    async fn pump(store: &mut ListStore) -> ListPoll {
        let mut out = ListPoll::default();
        for _ in 0..20 {
            tokio::task::yield_now().await;
            let step = store.poll();
            out.events.extend(step.events);
            out.refreshed |= step.refreshed;
        }
        out
    }

    #[test]
    fn test_initial_state_is_loading() {
        let store = ListStore::default();
        assert_eq!(store.status(), &ListStatus::Loading);
        assert!(store.items().is_none());
        assert!(!store.is_empty());
    }

    #[tokio::test]
    async fn test_refresh_replaces_items_in_order() {
        let backend = FakeBackend::with_files(vec![
            FileEntry::pdf("b.pdf"),
            FileEntry::pdf("a.pdf"),
            FileEntry::podcast("a.mp3"),
        ]);
        let mut store = ListStore::default();

        store.refresh(&backend);
        assert!(store.is_loading());
        let out = pump(&mut store).await;

        assert!(out.refreshed);
        assert_eq!(store.status(), &ListStatus::Ready);
        let names: Vec<&str> = store
            .items()
            .unwrap()
            .iter()
            .map(|f| f.filename.as_str())
            .collect();
        assert_eq!(names, vec!["b.pdf", "a.pdf", "a.mp3"]);
    }

    #[tokio::test]
    async fn test_empty_list_is_empty_not_error() {
        let backend = FakeBackend::with_files(vec![]);
        let mut store = ListStore::default();

        store.refresh(&backend);
        pump(&mut store).await;

        assert!(store.is_empty());
        assert!(store.error().is_none());
        assert_eq!(store.items().map(|i| i.len()), Some(0));
    }

    #[tokio::test]
    async fn test_status_error_keeps_items_hidden() {
        let backend = FakeBackend::with_files(vec![FileEntry::pdf("a.pdf")]);
        let mut store = ListStore::default();
        store.refresh(&backend);
        pump(&mut store).await;

        backend.fail_list(Some(BackendError::Status { status: 500, message: None }));
        store.refresh(&backend);
        let out = pump(&mut store).await;

        assert!(!out.refreshed);
        assert_eq!(store.error(), Some(LOAD_FAILED));
        assert!(store.items().is_none());
        assert!(!store.is_empty());

        // Manual retry recovers and clears the error
        backend.fail_list(None);
        store.refresh(&backend);
        pump(&mut store).await;
        assert!(store.error().is_none());
        assert_eq!(store.items().unwrap(), &[FileEntry::pdf("a.pdf")]);
    }

    #[tokio::test]
    async fn test_connection_error_message() {
        let backend = FakeBackend::default();
        backend.fail_list(Some(BackendError::Connection("refused".to_string())));
        let mut store = ListStore::default();

        store.refresh(&backend);
        pump(&mut store).await;

        assert_eq!(store.error(), Some(CONNECT_FAILED));
    }

    #[tokio::test]
    async fn test_overlapping_refresh_last_resolved_wins() {
        let backend = FakeBackend::default();
        let first = backend.gate_list();
        let second = backend.gate_list();
        let mut store = ListStore::default();

        store.refresh(&backend);
        store.refresh(&backend);
        pump(&mut store).await;
        assert!(store.is_loading());

        // Second request resolves first, then the first one
        second.send(Ok(vec![FileEntry::pdf("new.pdf")])).unwrap();
        pump(&mut store).await;
        assert_eq!(store.items(), None);
        first.send(Ok(vec![FileEntry::pdf("old.pdf")])).unwrap();
        pump(&mut store).await;

        assert_eq!(backend.count_calls("list"), 2);
        assert_eq!(store.items().unwrap(), &[FileEntry::pdf("old.pdf")]);
    }

    #[tokio::test]
    async fn test_loading_until_all_refreshes_resolve() {
        let backend = FakeBackend::default();
        let first = backend.gate_list();
        let second = backend.gate_list();
        let mut store = ListStore::default();

        store.refresh(&backend);
        store.refresh(&backend);
        first.send(Ok(vec![FileEntry::pdf("a.pdf")])).unwrap();
        let out = pump(&mut store).await;

        assert!(out.refreshed);
        assert!(store.is_loading());
        assert!(store.items().is_none());

        second.send(Err(BackendError::Status { status: 503, message: None })).unwrap();
        pump(&mut store).await;
        assert_eq!(store.error(), Some(LOAD_FAILED));
    }

    #[test]
    fn test_dedupe_keeps_first() {
        let files = dedupe(vec![
            FileEntry::pdf("a.pdf"),
            FileEntry::pdf("b.pdf"),
            FileEntry::podcast("a.pdf"),
        ]);
        assert_eq!(files, vec![FileEntry::pdf("a.pdf"), FileEntry::pdf("b.pdf")]);
    }
}

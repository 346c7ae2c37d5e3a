//! File panel: list, action menu, and delete flow composed together
//!
//! `FilePanel` owns the three sub-machines and the processing mark. The host
//! drives it by calling transition methods in response to user input and
//! `poll` once per frame, and applies the returned `PanelEvent`s to the
//! state it owns (selection, running actions).

use crate::backend::{FileBackend, FileEntry};
use crate::state::{
    ActionKind, ActionMenu, Anchor, DeleteFlow, DeleteOutcome, ListStore, MenuEntry, PanelEvent,
    ProcessingSignal,
};

pub struct FilePanel<B: FileBackend> {
    backend: B,
    list: ListStore,
    menu: ActionMenu,
    delete: DeleteFlow,
    processing: ProcessingSignal,
    /// Last delete or upload failure, shown without hiding the list
    notice: Option<String>,
}

impl<B: FileBackend> FilePanel<B> {
    /// Create the panel and start the initial list load
    pub fn new(backend: B, processing: ProcessingSignal) -> Self {
        let mut panel = Self {
            backend,
            list: ListStore::default(),
            menu: ActionMenu::default(),
            delete: DeleteFlow::default(),
            processing,
            notice: None,
        };
        panel.refresh();
        panel
    }

    pub fn list(&self) -> &ListStore {
        &self.list
    }

    pub fn menu(&self) -> &ActionMenu {
        &self.menu
    }

    pub fn delete_flow(&self) -> &DeleteFlow {
        &self.delete
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn processing_mark(&self) -> Option<&str> {
        self.processing.mark()
    }

    pub fn is_processing(&self, filename: &str) -> bool {
        self.processing.is_marked(filename)
    }

    /// Host's global busy flag
    pub fn is_global_processing(&self) -> bool {
        self.processing.is_busy()
    }

    /// Any panel-owned request still outstanding
    pub fn is_busy(&self) -> bool {
        self.list.has_pending() || self.delete.is_in_flight()
    }

    pub fn refresh(&mut self) -> Option<PanelEvent> {
        self.list.refresh(&self.backend)
    }

    pub fn open_menu(&mut self, anchor: Anchor, file: FileEntry) {
        self.menu.open(anchor, file);
    }

    pub fn close_menu(&mut self) {
        self.menu.close();
    }

    /// Mark the menu target as processing, hand the action to the host,
    /// and close the menu
    pub fn select_action(&mut self, kind: ActionKind) -> Option<PanelEvent> {
        let (filename, event) = self.menu.select_action(kind)?;
        self.processing.set_mark(filename);
        Some(event)
    }

    /// Act on a menu row: actions are dispatched, delete opens the dialog
    pub fn choose(&mut self, entry: MenuEntry) -> Option<PanelEvent> {
        match entry {
            MenuEntry::Run(kind) => self.select_action(kind),
            MenuEntry::Delete => {
                self.request_delete();
                None
            }
        }
    }

    /// Capture the menu target for deletion and close the menu
    pub fn request_delete(&mut self) -> bool {
        if !self.delete.is_idle() {
            tracing::debug!("Ignoring delete request: flow busy");
            return false;
        }
        let Some(target) = self.menu.take_target() else {
            tracing::debug!("Ignoring delete request with no menu target");
            return false;
        };
        self.delete.request(target)
    }

    pub fn cancel_delete(&mut self) -> bool {
        self.delete.cancel()
    }

    pub fn confirm_delete(&mut self) -> Option<PanelEvent> {
        self.delete.confirm(&self.backend)
    }

    /// Upload collaborator reported success
    pub fn on_upload_success(&mut self) -> Option<PanelEvent> {
        tracing::info!("Upload finished, refreshing list");
        self.refresh()
    }

    /// Upload collaborator reported failure; logged, never fatal
    pub fn on_upload_error(&mut self, message: &str) -> Option<PanelEvent> {
        tracing::warn!("Upload failed: {}", message);
        self.notice = Some(format!("Upload failed: {}", message));
        Some(PanelEvent::LogError(format!("Upload failed: {}", message)))
    }

    /// Advance every sub-machine. `selected` is the host's current selection.
    pub fn poll(&mut self, selected: Option<&FileEntry>) -> Vec<PanelEvent> {
        let mut events = Vec::new();

        self.processing.reconcile();

        let mut selection_cleared = false;

        if let Some(outcome) = self.delete.poll() {
            match outcome {
                DeleteOutcome::Deleted(target) => {
                    events.extend(self.refresh());
                    events.push(PanelEvent::StatusMessage(format!("Deleted {}", target.filename)));
                    // Known from the request; does not wait for the refresh
                    if selected.is_some_and(|s| s.filename == target.filename) {
                        events.push(PanelEvent::SelectFile(None));
                        selection_cleared = true;
                    }
                }
                DeleteOutcome::Failed { message, .. } => {
                    events.push(PanelEvent::LogError(message.clone()));
                    events.push(PanelEvent::StatusMessage(message.clone()));
                    self.notice = Some(message);
                }
            }
        }

        let listed = self.list.poll();
        events.extend(listed.events);

        if listed.refreshed {
            if !selection_cleared {
                if let Some(selected) = selected {
                    if self.list.find(&selected.filename).is_none() {
                        tracing::info!("Selected file {} is gone, clearing", selected.filename);
                        events.push(PanelEvent::SelectFile(None));
                    }
                }
            }

            let stale = self
                .menu
                .target()
                .is_some_and(|t| self.list.find(&t.filename).is_none());
            if stale {
                self.menu.close();
            }
        }

        events
    }
}

//! Host application state around a `FilePanel`
//!
//! The session owns what the panel treats as external: the selected file,
//! the global processing flag, and execution of dispatched actions and
//! uploads. Front ends (CLI commands, the interactive shell) talk to the
//! session only.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;

use crate::backend::{ActionOutcome, ActionRequest, BackendError, FileBackend, FileEntry};
use crate::panel::FilePanel;
use crate::state::{processing_channel, ActionKind, Anchor, MenuEntry, PanelEvent, ProcessingFlag};
use crate::task::{poll_task, PollResult};

/// An action the host is running on the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunningAction {
    pub kind: ActionKind,
    pub filename: String,
}

pub struct PanelSession<B: FileBackend> {
    backend: B,
    panel: FilePanel<B>,
    /// Currently selected file
    selected: Option<FileEntry>,
    /// Global busy flag read by the panel
    processing: ProcessingFlag,
    action_task: Option<JoinHandle<Result<ActionOutcome, BackendError>>>,
    running: Option<RunningAction>,
    upload_task: Option<JoinHandle<Result<String, BackendError>>>,
    /// Status message for the status line
    status_message: String,
    /// Text output of the last finished action, if it returned any
    last_output: Option<String>,
    /// Why the last action failed
    action_error: Option<String>,
}

impl<B: FileBackend> PanelSession<B> {
    /// Create a session and start loading the file list
    pub fn new(backend: B) -> Self {
        let (processing, signal) = processing_channel();
        let panel = FilePanel::new(backend.clone(), signal);

        Self {
            backend,
            panel,
            selected: None,
            processing,
            action_task: None,
            running: None,
            upload_task: None,
            status_message: "Loading files...".to_string(),
            last_output: None,
            action_error: None,
        }
    }

    pub fn panel(&self) -> &FilePanel<B> {
        &self.panel
    }

    pub fn selected(&self) -> Option<&FileEntry> {
        self.selected.as_ref()
    }

    pub fn status_message(&self) -> &str {
        &self.status_message
    }

    pub fn last_output(&self) -> Option<&str> {
        self.last_output.as_deref()
    }

    pub fn action_error(&self) -> Option<&str> {
        self.action_error.as_deref()
    }

    pub fn running_action(&self) -> Option<&RunningAction> {
        self.running.as_ref()
    }

    pub fn is_processing(&self) -> bool {
        self.processing.get()
    }

    /// Anything outstanding, panel-owned or host-owned
    pub fn is_busy(&self) -> bool {
        self.panel.is_busy() || self.action_task.is_some() || self.upload_task.is_some()
    }

    pub fn refresh(&mut self) {
        let event = self.panel.refresh();
        self.apply(event);
    }

    /// Select a listed file by name
    pub fn select(&mut self, filename: &str) -> bool {
        match self.panel.list().find(filename) {
            Some(file) => {
                self.selected = Some(file.clone());
                true
            }
            None => false,
        }
    }

    pub fn deselect(&mut self) {
        self.selected = None;
    }

    /// Open the action menu on a listed file
    pub fn open_menu(&mut self, filename: &str) -> bool {
        let Some(items) = self.panel.list().items() else {
            return false;
        };
        let Some(row) = items.iter().position(|f| f.filename == filename) else {
            return false;
        };
        let file = items[row].clone();
        self.panel.open_menu(Anchor(row), file);
        true
    }

    pub fn close_menu(&mut self) {
        self.panel.close_menu();
    }

    /// Act on a menu row of the open menu. Actions are refused while
    /// another one is running; the menu stays open and nothing is marked.
    pub fn choose(&mut self, entry: MenuEntry) {
        if matches!(entry, MenuEntry::Run(_)) && self.processing.get() {
            tracing::warn!("Ignoring {}: another action is running", entry.label());
            self.status_message = "Another action is already running".to_string();
            return;
        }
        let event = self.panel.choose(entry);
        self.apply(event);
    }

    pub fn confirm_delete(&mut self) -> bool {
        let event = self.panel.confirm_delete();
        let accepted = event.is_some();
        self.apply(event);
        accepted
    }

    pub fn cancel_delete(&mut self) -> bool {
        self.panel.cancel_delete()
    }

    pub fn dismiss_notice(&mut self) {
        self.panel.dismiss_notice();
    }

    /// Upload a local file; the panel refreshes when it lands
    pub fn upload(&mut self, path: PathBuf) -> bool {
        if self.upload_task.is_some() {
            self.status_message = "An upload is already in progress".to_string();
            return false;
        }

        tracing::info!("Uploading {}", path.display());
        self.status_message = format!("Uploading {}...", path.display());

        let backend = self.backend.clone();
        self.upload_task = Some(tokio::spawn(async move { backend.upload_file(&path).await }));
        true
    }

    /// Poll host tasks, then the panel, and apply what comes back
    pub fn poll(&mut self) {
        match poll_task(&mut self.action_task) {
            PollResult::Complete(result) => {
                let running = self.running.take();
                // Falling edge clears the panel's mark on its next poll
                self.processing.set(false);
                self.finish_action(running, result);
            }
            PollResult::Pending | PollResult::NoTask => {}
        }

        match poll_task(&mut self.upload_task) {
            PollResult::Complete(Ok(Ok(filename))) => {
                let event = self.panel.on_upload_success();
                self.apply(event);
                self.status_message = format!("Uploaded {}", filename);
            }
            PollResult::Complete(Ok(Err(e))) => {
                let event = self.panel.on_upload_error(&e.to_string());
                self.apply(event);
            }
            PollResult::Complete(Err(e)) => {
                let event = self.panel.on_upload_error(&format!("task panicked: {}", e));
                self.apply(event);
            }
            PollResult::Pending | PollResult::NoTask => {}
        }

        let events = self.panel.poll(self.selected.as_ref());
        for event in events {
            self.apply(Some(event));
        }
    }

    /// Poll until idle or `max_wait` passes. Returns whether it went idle.
    pub async fn settle(&mut self, interval: Duration, max_wait: Option<Duration>) -> bool {
        let start = Instant::now();
        loop {
            self.poll();
            if !self.is_busy() {
                // One more pass so events from the last completion are applied
                self.poll();
                return true;
            }
            if max_wait.is_some_and(|max| start.elapsed() >= max) {
                return false;
            }
            tokio::time::sleep(interval).await;
        }
    }

    fn finish_action(
        &mut self,
        running: Option<RunningAction>,
        result: Result<Result<ActionOutcome, BackendError>, tokio::task::JoinError>,
    ) {
        let (label, filename) = running
            .map(|r| (r.kind.title(), r.filename))
            .unwrap_or(("Action", String::new()));

        match result {
            Ok(Ok(outcome)) => {
                tracing::info!("{} finished for {}", label, filename);
                // Generated artifacts show up as new files
                self.refresh();
                self.status_message = outcome
                    .message
                    .unwrap_or_else(|| format!("{} finished for {}", label, filename));
                self.last_output = outcome.output;
            }
            Ok(Err(e)) => {
                tracing::error!("{} failed for {}: {}", label, filename, e);
                let reason = e.reason().map(str::to_string).unwrap_or_else(|| e.to_string());
                self.status_message = format!("{} failed for {}: {}", label, filename, reason);
                self.action_error = Some(reason);
            }
            Err(e) => {
                tracing::error!("{} task panicked: {}", label, e);
                self.status_message = format!("{} failed for {}", label, filename);
                self.action_error = Some(e.to_string());
            }
        }
    }

    fn start_action(&mut self, kind: ActionKind, filename: String, whole_file: bool) {
        if self.action_task.is_some() {
            tracing::warn!("Ignoring {} for {}: another action is running", kind.label(), filename);
            self.status_message = "Another action is already running".to_string();
            return;
        }

        self.processing.set(true);
        self.action_error = None;
        self.status_message = format!("{} running for {}...", kind.title(), filename);
        self.running = Some(RunningAction {
            kind,
            filename: filename.clone(),
        });

        let backend = self.backend.clone();
        let request = ActionRequest {
            kind,
            filename,
            whole_file,
        };
        self.action_task = Some(tokio::spawn(async move { backend.run_action(request).await }));
    }

    fn apply(&mut self, event: Option<PanelEvent>) {
        let Some(event) = event else {
            return;
        };
        match event {
            PanelEvent::StatusMessage(msg) => self.status_message = msg,
            PanelEvent::LogInfo(msg) => tracing::info!("{}", msg),
            PanelEvent::LogError(msg) => tracing::error!("{}", msg),
            PanelEvent::SelectFile(file) => self.selected = file,
            PanelEvent::Action {
                kind,
                filename,
                whole_file,
            } => self.start_action(kind, filename, whole_file),
        }
    }
}

//! Confirm-then-delete state machine

use tokio::task::JoinHandle;

use crate::backend::{BackendError, FileBackend, FileEntry};
use crate::state::list::CONNECT_FAILED;
use crate::state::PanelEvent;
use crate::task::{poll_task, PollResult};

/// Where the delete flow is
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DeletePhase {
    #[default]
    Idle,
    /// Dialog shown, waiting for the user
    PendingConfirm(FileEntry),
    /// Request sent, dialog controls disabled
    InFlight(FileEntry),
}

/// How a confirmed delete ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted(FileEntry),
    Failed { target: FileEntry, message: String },
}

/// Deletion guarded by a confirmation step.
///
/// The target is copied in when the delete is requested, so the dialog does
/// not depend on the action menu staying open.
#[derive(Default)]
pub struct DeleteFlow {
    phase: DeletePhase,
    task: Option<JoinHandle<Result<(), BackendError>>>,
}

impl DeleteFlow {
    pub fn is_idle(&self) -> bool {
        self.phase == DeletePhase::Idle
    }

    /// Confirmation dialog is shown (pending or in flight)
    pub fn dialog_visible(&self) -> bool {
        !self.is_idle()
    }

    /// Confirm/cancel buttons accept input
    pub fn controls_enabled(&self) -> bool {
        matches!(self.phase, DeletePhase::PendingConfirm(_))
    }

    pub fn is_in_flight(&self) -> bool {
        matches!(self.phase, DeletePhase::InFlight(_))
    }

    /// File named in the dialog
    pub fn target(&self) -> Option<&FileEntry> {
        match &self.phase {
            DeletePhase::Idle => None,
            DeletePhase::PendingConfirm(target) | DeletePhase::InFlight(target) => Some(target),
        }
    }

    /// Capture `target` and show the dialog. Only valid from idle.
    pub fn request(&mut self, target: FileEntry) -> bool {
        if !self.is_idle() {
            tracing::debug!("Ignoring delete request for {}: flow busy", target.filename);
            return false;
        }
        tracing::info!("Delete requested for {}", target.filename);
        self.phase = DeletePhase::PendingConfirm(target);
        true
    }

    /// Drop the pending request without touching the backend
    pub fn cancel(&mut self) -> bool {
        match &self.phase {
            DeletePhase::PendingConfirm(target) => {
                tracing::info!("Delete of {} cancelled", target.filename);
                self.phase = DeletePhase::Idle;
                true
            }
            _ => {
                tracing::debug!("Ignoring cancel: no pending delete");
                false
            }
        }
    }

    /// Send the delete request for the captured target
    pub fn confirm<B: FileBackend>(&mut self, backend: &B) -> Option<PanelEvent> {
        let DeletePhase::PendingConfirm(target) = &self.phase else {
            tracing::debug!("Ignoring confirm: no pending delete");
            return None;
        };
        let target = target.clone();

        let backend = backend.clone();
        let filename = target.filename.clone();
        tracing::info!("Deleting file: {}", filename);

        self.task = Some(tokio::spawn(async move { backend.delete_file(&filename).await }));

        let status = format!("Deleting file: {}", target.filename);
        self.phase = DeletePhase::InFlight(target);
        Some(PanelEvent::StatusMessage(status))
    }

    /// Poll the in-flight request. Returns to idle once it resolves.
    pub fn poll(&mut self) -> Option<DeleteOutcome> {
        let result = match poll_task(&mut self.task) {
            PollResult::Complete(Ok(result)) => result,
            PollResult::Complete(Err(e)) => {
                tracing::error!("Delete task panicked: {}", e);
                Err(BackendError::Decode(e.to_string()))
            }
            PollResult::Pending | PollResult::NoTask => return None,
        };

        let DeletePhase::InFlight(target) = std::mem::take(&mut self.phase) else {
            tracing::warn!("Delete task finished outside of in-flight phase");
            return None;
        };

        Some(match result {
            Ok(()) => {
                tracing::info!("Deleted {}", target.filename);
                DeleteOutcome::Deleted(target)
            }
            Err(e) => {
                tracing::warn!("Failed to delete {}: {}", target.filename, e);
                DeleteOutcome::Failed {
                    message: failure_message(&e),
                    target,
                }
            }
        })
    }
}

/// User-facing text for a failed delete
pub fn failure_message(error: &BackendError) -> String {
    let reason = if error.is_connection() {
        CONNECT_FAILED
    } else {
        error.reason().unwrap_or("Unknown error")
    };
    format!("Failed to delete file: {}", reason)
}

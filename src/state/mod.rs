//! Panel state machines
//!
//! Each sub-machine owns its own fields and tasks and is advanced by a
//! `poll` method. Results that concern the host are returned as
//! `PanelEvent`s rather than applied to host state directly.

mod delete;
mod list;
mod menu;
mod processing;

pub use delete::{DeleteFlow, DeleteOutcome};
pub use list::{ListStatus, ListStore};
pub use menu::{ActionKind, ActionMenu, Anchor, MenuEntry};
pub use processing::{processing_channel, ProcessingFlag, ProcessingSignal};

use crate::backend::FileEntry;

/// Events that panel poll and transition methods can return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelEvent {
    /// Update the status message
    StatusMessage(String),

    /// Log an info message
    LogInfo(String),

    /// Log an error message
    LogError(String),

    /// Host should replace its selection
    SelectFile(Option<FileEntry>),

    /// Host should run a generation action on a file
    Action {
        kind: ActionKind,
        filename: String,
        whole_file: bool,
    },
}

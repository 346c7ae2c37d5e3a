//! Contextual action menu state

use serde::Serialize;

use crate::backend::{FileEntry, FileKind};
use crate::state::PanelEvent;

/// Generation actions the backend can run on a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Summarize,
    Assess,
    Podcast,
}

impl ActionKind {
    pub const ALL: [ActionKind; 3] = [ActionKind::Summarize, ActionKind::Assess, ActionKind::Podcast];

    /// Name passed to the host's action handler
    pub fn label(&self) -> &'static str {
        match self {
            ActionKind::Summarize => "summarize",
            ActionKind::Assess => "assess",
            ActionKind::Podcast => "podcast",
        }
    }

    /// Text shown in the menu
    pub fn title(&self) -> &'static str {
        match self {
            ActionKind::Summarize => "Summarize",
            ActionKind::Assess => "Assess",
            ActionKind::Podcast => "Generate Podcast",
        }
    }

    /// Backend route that runs this action
    pub fn route(&self) -> &'static str {
        match self {
            ActionKind::Summarize => "/summarize",
            ActionKind::Assess => "/assess",
            ActionKind::Podcast => "/generate-podcast",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.label() == label)
    }
}

/// One row of the action menu
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuEntry {
    Run(ActionKind),
    Delete,
}

impl MenuEntry {
    pub fn title(&self) -> &'static str {
        match self {
            MenuEntry::Run(kind) => kind.title(),
            MenuEntry::Delete => "Delete",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MenuEntry::Run(kind) => kind.label(),
            MenuEntry::Delete => "delete",
        }
    }
}

const PDF_MENU: &[MenuEntry] = &[
    MenuEntry::Run(ActionKind::Summarize),
    MenuEntry::Run(ActionKind::Assess),
    MenuEntry::Run(ActionKind::Podcast),
    MenuEntry::Delete,
];

const PODCAST_MENU: &[MenuEntry] = &[MenuEntry::Delete];

/// Menu rows offered for a file kind, in display order.
/// New kinds must be added here or they get an empty menu.
pub fn menu_for(kind: FileKind) -> &'static [MenuEntry] {
    match kind {
        FileKind::Pdf => PDF_MENU,
        FileKind::Podcast => PODCAST_MENU,
        FileKind::Other => &[],
    }
}

/// Where the menu was opened from (row in the rendered list)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Anchor(pub usize);

/// Tracks which file the action menu is open on.
///
/// Anchor and target are stored as one value so they are set and cleared
/// together.
#[derive(Debug, Default)]
pub struct ActionMenu {
    open: Option<(Anchor, FileEntry)>,
}

impl ActionMenu {
    /// Open on `file`, replacing any menu already open
    pub fn open(&mut self, anchor: Anchor, file: FileEntry) {
        self.open = Some((anchor, file));
    }

    pub fn close(&mut self) {
        self.open = None;
    }

    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }

    pub fn anchor(&self) -> Option<Anchor> {
        self.open.as_ref().map(|(anchor, _)| *anchor)
    }

    pub fn target(&self) -> Option<&FileEntry> {
        self.open.as_ref().map(|(_, file)| file)
    }

    /// Rows for the current target; empty when closed
    pub fn entries(&self) -> &'static [MenuEntry] {
        self.target().map(|f| menu_for(f.kind)).unwrap_or(&[])
    }

    /// Close and hand back the target, if any
    pub fn take_target(&mut self) -> Option<FileEntry> {
        self.open.take().map(|(_, file)| file)
    }

    /// Dispatch `kind` for the current target and close the menu.
    ///
    /// Returns the target's filename (to mark as processing) with the event
    /// for the host, or `None` when no menu is open.
    pub fn select_action(&mut self, kind: ActionKind) -> Option<(String, PanelEvent)> {
        let Some(target) = self.target() else {
            tracing::debug!("Ignoring {} with no menu target", kind.label());
            return None;
        };

        if !menu_for(target.kind).contains(&MenuEntry::Run(kind)) {
            tracing::debug!("{} is not offered for {} files", kind.label(), target.kind.label());
            return None;
        }

        let file = self.take_target()?;

        tracing::info!("Dispatching {} for {}", kind.label(), file.filename);
        let event = PanelEvent::Action {
            kind,
            filename: file.filename.clone(),
            whole_file: true,
        };
        Some((file.filename, event))
    }
}

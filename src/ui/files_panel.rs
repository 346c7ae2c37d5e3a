//! Files panel rendering

use crate::backend::{FileBackend, FileEntry};
use crate::panel::FilePanel;
use crate::session::PanelSession;
use crate::state::ListStatus;

const SPINNER: &str = "[*]";

/// Render the panel as lines of text.
///
/// Items are only drawn while the list is ready; a failed load shows the
/// error with a retry hint instead.
pub fn render_files_panel<B: FileBackend>(
    panel: &FilePanel<B>,
    selected: Option<&FileEntry>,
) -> Vec<String> {
    let mut lines = vec!["Files".to_string(), "-".repeat(52)];

    match panel.list().status() {
        ListStatus::Loading => {
            lines.push(format!("  {} Loading files...", SPINNER));
        }
        ListStatus::Error(msg) => {
            lines.push(format!("  Error: {}", msg));
            lines.push("  Type 'refresh' to retry.".to_string());
        }
        ListStatus::Ready if panel.is_empty() => {
            lines.push("  No files yet. Upload a PDF to get started.".to_string());
        }
        ListStatus::Ready => {
            let items = panel.list().items().unwrap_or(&[]);
            let anchor = panel.menu().anchor();
            for (row, file) in items.iter().enumerate() {
                lines.push(render_row(panel, row, file, selected));

                if anchor.is_some_and(|a| a.0 == row) {
                    for entry in panel.menu().entries() {
                        lines.push(format!("        - {:<18} (do {})", entry.title(), entry.label()));
                    }
                }
            }
        }
    }

    lines.push(String::new());
    lines.push("  Upload: upload <path>".to_string());

    if let Some(notice) = panel.notice() {
        lines.push(format!("  ! {}  (dismiss)", notice));
    }

    let flow = panel.delete_flow();
    if let Some(target) = flow.target() {
        lines.push(String::new());
        lines.push(format!("  Delete \"{}\"?", target.filename));
        if flow.controls_enabled() {
            lines.push("  This cannot be undone.".to_string());
            lines.push("  [confirm] [cancel]".to_string());
        } else {
            lines.push(format!("  {} Deleting...", SPINNER));
        }
    }

    lines
}

fn render_row<B: FileBackend>(
    panel: &FilePanel<B>,
    row: usize,
    file: &FileEntry,
    selected: Option<&FileEntry>,
) -> String {
    let is_selected = selected.is_some_and(|s| s.filename == file.filename);
    let marker = if is_selected { ">" } else { " " };

    // Truncate long names
    let name = if file.filename.chars().count() > 32 {
        let short: String = file.filename.chars().take(29).collect();
        format!("{}...", short)
    } else {
        file.filename.clone()
    };

    let mut line = format!("{} {:>3}. {:<32} {:<8}", marker, row + 1, name, file.kind.label());
    if panel.is_processing(&file.filename) {
        line.push_str(&format!(" {} Processing...", SPINNER));
    }
    line.trim_end().to_string()
}

/// Panel plus the session's status line and last action output
pub fn render_session<B: FileBackend>(session: &PanelSession<B>) -> String {
    let mut lines = render_files_panel(session.panel(), session.selected());

    if let Some(output) = session.last_output() {
        lines.push(String::new());
        lines.push(output.to_string());
    }

    lines.push(String::new());
    if let Some(running) = session.running_action() {
        lines.push(format!("Running: {} on {}", running.kind.title(), running.filename));
    }
    lines.push(format!("Status: {}", session.status_message()));
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::fake::FakeBackend;
    use crate::backend::BackendError;
    use crate::state::{processing_channel, ActionKind, Anchor};

    async fn loaded(files: Vec<FileEntry>) -> (FilePanel<FakeBackend>, FakeBackend) {
        let backend = FakeBackend::with_files(files);
        let (_flag, signal) = processing_channel();
        let mut panel = FilePanel::new(backend.clone(), signal);
        for _ in 0..20 {
            tokio::task::yield_now().await;
            panel.poll(None);
        }
        (panel, backend)
    }

    fn contains(lines: &[String], needle: &str) -> bool {
        lines.iter().any(|l| l.contains(needle))
    }

    #[tokio::test]
    async fn test_loading_indicator() {
        let backend = FakeBackend::default();
        let _gate = backend.gate_list();
        let (_flag, signal) = processing_channel();
        let panel = FilePanel::new(backend, signal);

        let lines = render_files_panel(&panel, None);
        assert!(contains(&lines, "Loading files..."));
    }

    #[tokio::test]
    async fn test_single_item_no_empty_state() {
        let (panel, _) = loaded(vec![FileEntry::pdf("a.pdf")]).await;
        let lines = render_files_panel(&panel, None);

        assert!(contains(&lines, "a.pdf"));
        assert!(!contains(&lines, "No files yet"));
        assert!(!contains(&lines, "Error"));
    }

    #[tokio::test]
    async fn test_empty_state_keeps_upload() {
        let (panel, _) = loaded(vec![]).await;
        let lines = render_files_panel(&panel, None);

        assert!(contains(&lines, "No files yet"));
        assert!(contains(&lines, "upload <path>"));
    }

    #[tokio::test]
    async fn test_error_banner_hides_items() {
        let backend = FakeBackend::with_files(vec![FileEntry::pdf("a.pdf")]);
        backend.fail_list(Some(BackendError::Status { status: 500, message: None }));
        let (_flag, signal) = processing_channel();
        let mut panel = FilePanel::new(backend, signal);
        for _ in 0..20 {
            tokio::task::yield_now().await;
            panel.poll(None);
        }

        let lines = render_files_panel(&panel, None);
        assert!(contains(&lines, "Error: Failed to load files"));
        assert!(contains(&lines, "retry"));
        assert!(!contains(&lines, "a.pdf"));
    }

    #[tokio::test]
    async fn test_selection_and_processing_marks() {
        let (mut panel, _) = loaded(vec![FileEntry::pdf("a.pdf"), FileEntry::pdf("b.pdf")]).await;
        panel.open_menu(Anchor(1), FileEntry::pdf("b.pdf"));
        panel.select_action(ActionKind::Summarize);

        let selected = FileEntry::pdf("a.pdf");
        let lines = render_files_panel(&panel, Some(&selected));
        let a = lines.iter().find(|l| l.contains("a.pdf")).unwrap();
        let b = lines.iter().find(|l| l.contains("b.pdf")).unwrap();

        assert!(a.starts_with('>'));
        assert!(!a.contains("Processing..."));
        assert!(b.contains("Processing..."));
    }

    #[tokio::test]
    async fn test_menu_under_anchor_row() {
        let (mut panel, _) =
            loaded(vec![FileEntry::pdf("a.pdf"), FileEntry::podcast("b.mp3")]).await;
        panel.open_menu(Anchor(1), FileEntry::podcast("b.mp3"));

        let lines = render_files_panel(&panel, None);
        let row = lines.iter().position(|l| l.contains("b.mp3")).unwrap();
        assert!(lines[row + 1].contains("Delete"));
        assert!(!contains(&lines, "Summarize"));
    }

    #[tokio::test]
    async fn test_confirm_dialog_names_target() {
        let (mut panel, _) = loaded(vec![FileEntry::pdf("quarterly report.pdf")]).await;
        panel.open_menu(Anchor(0), FileEntry::pdf("quarterly report.pdf"));
        panel.request_delete();

        let lines = render_files_panel(&panel, None);
        assert!(contains(&lines, "Delete \"quarterly report.pdf\"?"));
        assert!(contains(&lines, "[confirm] [cancel]"));
    }

    #[tokio::test]
    async fn test_in_flight_dialog_hides_controls() {
        let (mut panel, backend) = loaded(vec![FileEntry::pdf("a.pdf")]).await;
        let gate = backend.gate_delete();
        panel.open_menu(Anchor(0), FileEntry::pdf("a.pdf"));
        panel.request_delete();
        panel.confirm_delete();

        let lines = render_files_panel(&panel, None);
        assert!(contains(&lines, "Delete \"a.pdf\"?"));
        assert!(contains(&lines, "Deleting..."));
        assert!(!contains(&lines, "[confirm] [cancel]"));

        gate.send(()).unwrap();
        for _ in 0..20 {
            tokio::task::yield_now().await;
            panel.poll(None);
        }
        let lines = render_files_panel(&panel, None);
        assert!(!contains(&lines, "Delete \"a.pdf\"?"));
    }
}

//! File commands
//!
//! Each command drives a `PanelSession` the same way the shell does and
//! waits for it to go idle before reporting.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Subcommand;
use serde::Serialize;

use crate::backend::{FileBackend, FileEntry};
use crate::cli::output::Output;
use crate::config::Config;
use crate::session::PanelSession;
use crate::state::{ActionKind, MenuEntry};

#[derive(Subcommand, Debug)]
pub enum FilesCommands {
    /// List files in the document store
    List,

    /// Delete a file
    Delete {
        /// File name as listed
        name: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Upload a local file
    Upload {
        /// Path to the file
        path: PathBuf,
    },

    /// Run an action on a file (summarize, assess, podcast)
    Action {
        /// Action name
        kind: String,

        /// File name as listed
        name: String,
    },
}

#[derive(Serialize)]
struct FileListResult {
    files: Vec<FileEntry>,
    count: usize,
}

#[derive(Serialize)]
struct ActionResult {
    action: ActionKind,
    filename: String,
    status: String,
    output: Option<String>,
}

pub async fn run<B: FileBackend>(
    command: FilesCommands,
    backend: B,
    config: &Config,
    out: Output,
) -> Result<()> {
    let mut session = PanelSession::new(backend);
    let interval = config.shell.poll_interval();

    session.settle(interval, None).await;
    if let Some(error) = session.panel().list().error() {
        anyhow::bail!("{}", error);
    }

    match command {
        FilesCommands::List => list(&session, out),
        FilesCommands::Delete { name, yes } => delete(&mut session, &name, yes, interval, out).await,
        FilesCommands::Upload { path } => upload(&mut session, path, interval, out).await,
        FilesCommands::Action { kind, name } => {
            action(&mut session, &kind, &name, interval, out).await
        }
    }
}

fn list<B: FileBackend>(session: &PanelSession<B>, out: Output) -> Result<()> {
    let files = session.panel().list().items().unwrap_or(&[]).to_vec();
    let result = FileListResult {
        count: files.len(),
        files,
    };

    out.result(&result, |r| {
        if r.files.is_empty() {
            return "No files yet. Upload a PDF to get started.".to_string();
        }

        let mut lines = vec![format!("{:<40} {:<8}", "NAME", "TYPE"), "-".repeat(49)];
        for file in &r.files {
            lines.push(format!("{:<40} {:<8}", file.filename, file.kind.label()));
        }
        lines.push(String::new());
        lines.push(format!("{} file(s)", r.count));
        lines.join("\n")
    })
}

async fn delete<B: FileBackend>(
    session: &mut PanelSession<B>,
    name: &str,
    yes: bool,
    interval: std::time::Duration,
    out: Output,
) -> Result<()> {
    if !session.open_menu(name) {
        anyhow::bail!("File '{}' not found", name);
    }
    session.choose(MenuEntry::Delete);

    if !yes && !prompt_confirm(name)? {
        session.cancel_delete();
        return out.done("Cancelled");
    }

    session.confirm_delete();
    session.settle(interval, None).await;

    if let Some(notice) = session.panel().notice() {
        anyhow::bail!("{}", notice);
    }

    out.done(&format!("Deleted {}", name))
}

async fn upload<B: FileBackend>(
    session: &mut PanelSession<B>,
    path: PathBuf,
    interval: std::time::Duration,
    out: Output,
) -> Result<()> {
    if !path.is_file() {
        anyhow::bail!("No such file: {}", path.display());
    }

    session.upload(path);
    session.settle(interval, None).await;

    if let Some(notice) = session.panel().notice() {
        anyhow::bail!("{}", notice);
    }

    out.done(session.status_message())
}

async fn action<B: FileBackend>(
    session: &mut PanelSession<B>,
    kind: &str,
    name: &str,
    interval: std::time::Duration,
    out: Output,
) -> Result<()> {
    let kind = ActionKind::from_label(kind).with_context(|| {
        format!("Unknown action '{}' (expected summarize, assess or podcast)", kind)
    })?;

    if !session.open_menu(name) {
        anyhow::bail!("File '{}' not found", name);
    }

    let entry = MenuEntry::Run(kind);
    if !session.panel().menu().entries().contains(&entry) {
        let label = session
            .panel()
            .menu()
            .target()
            .map(|f| f.kind.label())
            .unwrap_or("this");
        anyhow::bail!("{} is not available for {} files", kind.title(), label);
    }

    session.choose(entry);
    session.settle(interval, None).await;

    if session.action_error().is_some() {
        anyhow::bail!("{}", session.status_message());
    }

    let result = ActionResult {
        action: kind,
        filename: name.to_string(),
        status: session.status_message().to_string(),
        output: session.last_output().map(str::to_string),
    };

    out.result(&result, |r| match &r.output {
        Some(output) => format!("{}\n\n{}", r.status, output),
        None => r.status.clone(),
    })
}

fn prompt_confirm(name: &str) -> Result<bool> {
    let mut editor = rustyline::DefaultEditor::new()?;
    let answer = editor.readline(&format!("Delete \"{}\"? This cannot be undone. [y/N] ", name))?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

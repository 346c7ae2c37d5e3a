//! Interactive panel shell
//!
//! A REPL over one long-lived `PanelSession`. Every command is followed by
//! a bounded wait for outstanding work and a redraw of the panel.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Editor, Helper};

use crate::backend::FileBackend;
use crate::cli::output::print_error;
use crate::config::Config;
use crate::session::PanelSession;
use crate::ui::render_session;

/// One line typed at the prompt
#[derive(Parser, Debug)]
#[command(no_binary_name = true, disable_help_subcommand = true)]
struct ShellLine {
    #[command(subcommand)]
    command: ShellCommand,
}

#[derive(Subcommand, Debug)]
enum ShellCommand {
    /// Reload the file list
    Refresh,
    /// Select a file
    Select { name: String },
    /// Clear the selection
    Deselect,
    /// Open the action menu on a file
    Menu { name: String },
    /// Close the action menu
    Close,
    /// Pick an entry from the open menu
    Do { action: String },
    /// Confirm the pending delete
    Confirm,
    /// Cancel the pending delete
    Cancel,
    /// Upload a local file
    Upload { path: PathBuf },
    /// Dismiss the notice line
    Dismiss,
    /// Redraw the panel
    Show,
    /// Wait until all outstanding work finishes
    Wait,
    /// Show help
    Help,
    /// Leave the shell
    #[command(alias = "quit")]
    Exit,
}

/// Command completer for the shell
struct ShellCompleter {
    commands: Vec<(&'static str, Vec<&'static str>)>,
}

impl ShellCompleter {
    fn new() -> Self {
        Self {
            commands: vec![
                ("refresh", vec![]),
                ("select", vec![]),
                ("deselect", vec![]),
                ("menu", vec![]),
                ("close", vec![]),
                ("do", vec!["summarize", "assess", "podcast", "delete"]),
                ("confirm", vec![]),
                ("cancel", vec![]),
                ("upload", vec![]),
                ("dismiss", vec![]),
                ("show", vec![]),
                ("wait", vec![]),
                ("help", vec![]),
                ("exit", vec![]),
                ("quit", vec![]),
            ],
        }
    }
}

fn pairs<'a>(words: impl Iterator<Item = &'a &'static str>, prefix: &str) -> Vec<Pair> {
    words
        .filter(|w| w.starts_with(prefix))
        .map(|w| Pair {
            display: w.to_string(),
            replacement: w.to_string(),
        })
        .collect()
}

impl Completer for ShellCompleter {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let line = &line[..pos];
        let words: Vec<&str> = line.split_whitespace().collect();
        let start = line.rfind(' ').map(|i| i + 1).unwrap_or(0);

        match (words.as_slice(), line.ends_with(' ')) {
            ([], _) => Ok((0, pairs(self.commands.iter().map(|(c, _)| c), ""))),
            ([prefix], false) => Ok((start, pairs(self.commands.iter().map(|(c, _)| c), prefix))),
            ([cmd], true) | ([cmd, _], false) => {
                let prefix = if line.ends_with(' ') { "" } else { words[1] };
                let candidates = self
                    .commands
                    .iter()
                    .find(|(c, _)| c == cmd)
                    .map(|(_, subs)| pairs(subs.iter(), prefix))
                    .unwrap_or_default();
                Ok((start, candidates))
            }
            _ => Ok((pos, vec![])),
        }
    }
}

impl Hinter for ShellCompleter {
    type Hint = String;

    fn hint(&self, _line: &str, _pos: usize, _ctx: &rustyline::Context<'_>) -> Option<String> {
        None
    }
}

impl Highlighter for ShellCompleter {}
impl Validator for ShellCompleter {}
impl Helper for ShellCompleter {}

/// Parse a command line into arguments, handling quotes
fn parse_args(line: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut quote_char = ' ';

    for c in line.chars() {
        match c {
            '"' | '\'' if !in_quotes => {
                in_quotes = true;
                quote_char = c;
            }
            c if c == quote_char && in_quotes => {
                in_quotes = false;
            }
            ' ' if !in_quotes => {
                if !current.is_empty() {
                    args.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(c),
        }
    }

    if !current.is_empty() {
        args.push(current);
    }

    args
}

/// Apply one command to the session.
/// Returns Ok(true) to continue, Ok(false) to exit gracefully.
async fn run_command<B: FileBackend>(
    session: &mut PanelSession<B>,
    args: Vec<String>,
    config: &Config,
) -> Result<bool> {
    if args.is_empty() {
        return Ok(true);
    }

    let command = match ShellLine::try_parse_from(&args) {
        Ok(line) => line.command,
        Err(e) => {
            println!("{}", e);
            return Ok(true);
        }
    };

    let interval = config.shell.poll_interval();
    let mut wait = Some(config.shell.wait());

    match command {
        ShellCommand::Help => {
            print_help();
            return Ok(true);
        }
        ShellCommand::Exit => return Ok(false),
        ShellCommand::Show => {}
        ShellCommand::Wait => wait = None,
        ShellCommand::Refresh => session.refresh(),
        ShellCommand::Select { name } => {
            if !session.select(&name) {
                println!("No listed file named '{}'", name);
            }
        }
        ShellCommand::Deselect => session.deselect(),
        ShellCommand::Menu { name } => {
            if !session.open_menu(&name) {
                println!("No listed file named '{}'", name);
            }
        }
        ShellCommand::Close => session.close_menu(),
        ShellCommand::Do { action } => pick(session, &action),
        ShellCommand::Confirm => {
            if !session.confirm_delete() {
                println!("Nothing to confirm");
            }
        }
        ShellCommand::Cancel => {
            if !session.cancel_delete() {
                println!("Nothing to cancel");
            }
        }
        ShellCommand::Upload { path } => {
            if path.is_file() {
                session.upload(path);
            } else {
                println!("No such file: {}", path.display());
            }
        }
        ShellCommand::Dismiss => session.dismiss_notice(),
    }

    if !session.settle(interval, wait).await {
        tracing::debug!("Still busy after {:?}", wait);
    }
    println!("{}\n", render_session(session));
    Ok(true)
}

/// Choose an entry of the open menu by its label
fn pick<B: FileBackend>(session: &mut PanelSession<B>, action: &str) {
    let menu = session.panel().menu();
    if !menu.is_open() {
        println!("No menu open. Use 'menu <file>' first.");
        return;
    }

    let Some(entry) = menu.entries().iter().copied().find(|e| e.label() == action) else {
        let offered: Vec<&str> = menu.entries().iter().map(|e| e.label()).collect();
        println!("'{}' is not in this menu (try: {})", action, offered.join(", "));
        return;
    };

    session.choose(entry);
}

fn print_help() {
    println!(
        r#"DocPanel Interactive Shell

Commands:
  refresh                  Reload the file list
  select <file>            Select a file
  deselect                 Clear the selection
  menu <file>              Open the action menu on a file
  close                    Close the action menu
  do <action>              Pick a menu entry (summarize, assess, podcast, delete)
  confirm                  Confirm the pending delete
  cancel                   Cancel the pending delete
  upload <path>            Upload a local file
  dismiss                  Dismiss the notice line
  show                     Redraw the panel
  wait                     Wait until all outstanding work finishes

  help                     Show this help
  exit, quit               Exit the shell

Names with spaces can be quoted: menu "quarterly report.pdf"
"#
    );
}

/// Get the history file path
fn history_path() -> Option<PathBuf> {
    Config::project_dirs().map(|dirs| dirs.data_dir().join("shell_history"))
}

/// Run the interactive shell
pub async fn run<B: FileBackend>(backend: B, config: &Config) -> Result<()> {
    println!("DocPanel Interactive Shell v{}", env!("CARGO_PKG_VERSION"));
    println!("Type 'help' for available commands, 'exit' to quit.\n");

    let editor_config = rustyline::Config::builder()
        .history_ignore_space(true)
        .completion_type(rustyline::CompletionType::List)
        .build();

    let mut rl = Editor::with_config(editor_config)?;
    rl.set_helper(Some(ShellCompleter::new()));

    let history = if config.shell.history { history_path() } else { None };
    if let Some(path) = &history {
        let _ = rl.load_history(path);
    }

    let mut session = PanelSession::new(backend);
    session.settle(config.shell.poll_interval(), Some(config.shell.wait())).await;
    println!("{}\n", render_session(&session));

    loop {
        match rl.readline("docpanel> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    // Pick up anything that finished in the background
                    session.poll();
                    println!("{}\n", render_session(&session));
                    continue;
                }

                rl.add_history_entry(line)?;

                match run_command(&mut session, parse_args(line), config).await {
                    Ok(true) => continue,
                    Ok(false) => break,
                    Err(e) => print_error(&e.to_string()),
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("exit");
                break;
            }
            Err(err) => {
                print_error(&format!("{:?}", err));
                break;
            }
        }
    }

    if let Some(path) = &history {
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let _ = rl.save_history(path);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::fake::FakeBackend;
    use crate::backend::FileEntry;

    fn quick() -> Config {
        let mut config = Config::default();
        config.shell.poll_interval_ms = 1;
        config.shell.wait_ms = 5_000;
        config
    }

    fn args(line: &str) -> Vec<String> {
        parse_args(line)
    }

    #[test]
    fn test_parse_args_quotes() {
        assert_eq!(parse_args("menu \"my notes.pdf\""), vec!["menu", "my notes.pdf"]);
        assert_eq!(parse_args("  do   summarize "), vec!["do", "summarize"]);
        assert_eq!(parse_args("select 'a b.mp3'"), vec!["select", "a b.mp3"]);
    }

    #[test]
    fn test_shell_line_parsing() {
        let line = ShellLine::try_parse_from(["do", "assess"]).unwrap();
        assert!(matches!(line.command, ShellCommand::Do { action } if action == "assess"));

        let line = ShellLine::try_parse_from(["quit"]).unwrap();
        assert!(matches!(line.command, ShellCommand::Exit));

        assert!(ShellLine::try_parse_from(["menu"]).is_err());
        assert!(ShellLine::try_parse_from(["launch"]).is_err());
    }

    #[tokio::test]
    async fn test_menu_and_action_commands() {
        let config = quick();
        let backend = FakeBackend::with_files(vec![FileEntry::pdf("a.pdf")]);
        let mut session = PanelSession::new(backend.clone());
        session.settle(config.shell.poll_interval(), Some(config.shell.wait())).await;

        assert!(run_command(&mut session, args("menu a.pdf"), &config).await.unwrap());
        assert!(session.panel().menu().is_open());

        assert!(run_command(&mut session, args("do summarize"), &config).await.unwrap());
        assert!(!session.panel().menu().is_open());
        assert!(backend.calls().contains(&"action:summarize:a.pdf:true".to_string()));
        assert_eq!(session.panel().processing_mark(), None);
    }

    #[tokio::test]
    async fn test_do_rejected_while_processing() {
        let config = quick();
        let backend = FakeBackend::with_files(vec![FileEntry::pdf("a.pdf"), FileEntry::pdf("b.pdf")]);
        let gate = backend.gate_action();
        let mut session = PanelSession::new(backend.clone());
        session.settle(config.shell.poll_interval(), Some(config.shell.wait())).await;

        session.open_menu("a.pdf");
        pick(&mut session, "assess");
        session.poll();
        assert!(session.panel().is_global_processing());

        session.open_menu("b.pdf");
        pick(&mut session, "podcast");
        assert_eq!(backend.count_calls("action"), 1);
        assert!(session.panel().menu().is_open());

        gate.send(()).unwrap();
        session.settle(config.shell.poll_interval(), Some(config.shell.wait())).await;
        assert!(!session.panel().is_global_processing());
    }

    #[tokio::test]
    async fn test_delete_via_commands() {
        let config = quick();
        let backend = FakeBackend::with_files(vec![FileEntry::podcast("b.mp3")]);
        let mut session = PanelSession::new(backend.clone());
        session.settle(config.shell.poll_interval(), Some(config.shell.wait())).await;

        run_command(&mut session, args("menu b.mp3"), &config).await.unwrap();
        run_command(&mut session, args("do summarize"), &config).await.unwrap();
        assert_eq!(backend.count_calls("action"), 0);

        run_command(&mut session, args("do delete"), &config).await.unwrap();
        assert!(session.panel().delete_flow().dialog_visible());

        run_command(&mut session, args("confirm"), &config).await.unwrap();
        assert!(session.panel().is_empty());
    }

    #[tokio::test]
    async fn test_exit_stops_loop() {
        let config = quick();
        let mut session = PanelSession::new(FakeBackend::default());
        assert!(!run_command(&mut session, args("exit"), &config).await.unwrap());
    }
}

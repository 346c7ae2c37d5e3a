//! CLI module for DocPanel
//!
//! One-shot commands drive a `PanelSession` to completion; without a
//! subcommand the interactive shell is started.

mod commands;
mod output;
mod shell;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::backend::HttpBackend;
use crate::config::Config;

use output::{Output, OutputFormat};

/// DocPanel - manage files in a document store
#[derive(Parser, Debug)]
#[command(name = "docpanel")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Output format
    #[command(flatten)]
    pub output: OutputOptions,

    /// Document store URL (overrides backend.base_url)
    #[arg(long, global = true, value_name = "URL")]
    pub backend: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Output formatting options
#[derive(Parser, Debug, Clone)]
pub struct OutputOptions {
    /// Output in JSON format (for machine parsing)
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Increase output verbosity
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

impl OutputOptions {
    pub fn format(&self) -> OutputFormat {
        if self.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }

    pub fn output(&self) -> Output {
        Output::new(self.format(), self.quiet)
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List, delete, upload and process files
    Files {
        #[command(subcommand)]
        command: commands::files::FilesCommands,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        command: commands::config::ConfigCommands,
    },

    /// Interactive panel shell (default)
    Shell,
}

/// Configuration with command-line overrides applied
fn resolve_config(backend: Option<String>) -> Result<Config> {
    let mut config = Config::load()?;
    if let Some(url) = backend {
        config.set("backend.base_url", &url)?;
    }
    Ok(config)
}

fn connect(config: &Config) -> Result<HttpBackend> {
    let backend = HttpBackend::new(&config.backend.base_url, config.backend.request_timeout())?;
    tracing::info!("Using document store at {}", backend.base_url());
    Ok(backend)
}

/// Run the CLI with parsed arguments
pub async fn run(cli: Cli) -> Result<()> {
    let out = cli.output.output();

    match cli.command {
        Some(Commands::Config { command }) => commands::config::run(command, out).await,
        Some(Commands::Files { command }) => {
            let config = resolve_config(cli.backend)?;
            let backend = connect(&config)?;
            commands::files::run(command, backend, &config, out).await
        }
        Some(Commands::Shell) | None => {
            let config = resolve_config(cli.backend)?;
            let backend = connect(&config)?;
            shell::run(backend, &config).await
        }
    }
}

//! Configuration management commands

use anyhow::Result;
use clap::Subcommand;
use serde::Serialize;

use crate::cli::output::{Output, OutputFormat};
use crate::config::Config;

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Get a specific config value
    Get {
        /// Config key (e.g., "backend.base_url", "shell.wait_ms")
        key: String,
    },

    /// Set a config value
    Set {
        /// Config key (e.g., "backend.base_url", "shell.wait_ms")
        key: String,

        /// Value to set
        value: String,
    },

    /// Show config file path
    Path,
}

#[derive(Serialize)]
struct ConfigPathResult {
    path: String,
    exists: bool,
}

pub async fn run(command: ConfigCommands, out: Output) -> Result<()> {
    match command {
        ConfigCommands::Show => show(out.format),
        ConfigCommands::Get { key } => get(&key, out.format),
        ConfigCommands::Set { key, value } => set(&key, &value, out),
        ConfigCommands::Path => path(out),
    }
}

fn show(format: OutputFormat) -> Result<()> {
    let config = Config::load()?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&config)?),
        OutputFormat::Text => println!("{}", toml::to_string_pretty(&config)?),
    }

    Ok(())
}

fn get(key: &str, format: OutputFormat) -> Result<()> {
    let value = Config::load()?.get(key)?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string(&value)?),
        OutputFormat::Text => println!("{}", value),
    }

    Ok(())
}

fn set(key: &str, value: &str, out: Output) -> Result<()> {
    let mut config = Config::load()?;
    config.set(key, value)?;
    config.save()?;

    out.done(&format!("Set {} = {}", key, value))
}

fn path(out: Output) -> Result<()> {
    let path = Config::config_path()?;

    let result = ConfigPathResult {
        path: path.to_string_lossy().to_string(),
        exists: path.exists(),
    };

    out.result(&result, |r| {
        format!("{}{}", r.path, if r.exists { "" } else { " (not found)" })
    })
}

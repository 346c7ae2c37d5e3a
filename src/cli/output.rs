//! How command results reach the terminal

use anyhow::Result;
use serde::Serialize;

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Format and verbosity chosen on the command line
#[derive(Debug, Clone, Copy)]
pub struct Output {
    pub format: OutputFormat,
    pub quiet: bool,
}

impl Output {
    pub fn new(format: OutputFormat, quiet: bool) -> Self {
        Self { format, quiet }
    }

    /// Print a command result: JSON as-is, or the text rendering
    pub fn result<T, F>(&self, value: &T, text: F) -> Result<()>
    where
        T: Serialize,
        F: FnOnce(&T) -> String,
    {
        println!("{}", self.render(value, text)?);
        Ok(())
    }

    fn render<T, F>(&self, value: &T, text: F) -> Result<String>
    where
        T: Serialize,
        F: FnOnce(&T) -> String,
    {
        Ok(match self.format {
            OutputFormat::Text => text(value),
            OutputFormat::Json => serde_json::to_string_pretty(value)?,
        })
    }

    /// Confirmation line; dropped with --quiet, and as JSON it becomes
    /// `{"message": ...}` so scripted callers always get an object
    pub fn done(&self, message: &str) -> Result<()> {
        if self.quiet {
            return Ok(());
        }
        #[derive(Serialize)]
        struct Done<'a> {
            message: &'a str,
        }
        self.result(&Done { message }, |d| d.message.to_string())
    }
}

/// Print an error message (never suppressed)
pub fn print_error(message: &str) {
    eprintln!("Error: {}", message);
}

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub shell: ShellConfig,
}

/// Document store connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the document store
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request timeout; unset means requests may wait indefinitely
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: None,
        }
    }
}

impl BackendConfig {
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

fn default_base_url() -> String {
    "http://localhost:5000".to_string()
}

/// Interactive shell behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShellConfig {
    /// How often outstanding work is polled
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    /// How long to wait for outstanding work before returning to the prompt
    #[serde(default = "default_wait")]
    pub wait_ms: u64,
    /// Keep command history between sessions
    #[serde(default = "default_true")]
    pub history: bool,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval(),
            wait_ms: default_wait(),
            history: true,
        }
    }
}

impl ShellConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn wait(&self) -> Duration {
        Duration::from_millis(self.wait_ms)
    }
}

fn default_poll_interval() -> u64 {
    50
}

fn default_wait() -> u64 {
    10_000
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Platform directories for this application
    pub fn project_dirs() -> Option<directories::ProjectDirs> {
        directories::ProjectDirs::from("com", "docpanel", "DocPanel")
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let dirs = Self::project_dirs()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

        let config_dir = dirs.config_dir();
        std::fs::create_dir_all(config_dir)?;

        Ok(config_dir.join("config.toml"))
    }

    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from `path`, falling back to defaults if missing
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let config: Config = toml::from_str(&content)
                .with_context(|| format!("Invalid configuration in {}", path.display()))?;
            tracing::info!("Loaded configuration from {:?}", path);
            Ok(config)
        } else {
            tracing::info!("No configuration file found, using defaults");
            Ok(Self::default())
        }
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        tracing::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Read a setting by dotted key
    pub fn get(&self, key: &str) -> Result<String> {
        let parts: Vec<&str> = key.split('.').collect();

        match parts.as_slice() {
            ["backend", "base_url"] => Ok(self.backend.base_url.clone()),
            ["backend", "request_timeout_secs"] => Ok(self
                .backend
                .request_timeout_secs
                .map(|s| s.to_string())
                .unwrap_or_else(|| "<not set>".to_string())),
            ["shell", "poll_interval_ms"] => Ok(self.shell.poll_interval_ms.to_string()),
            ["shell", "wait_ms"] => Ok(self.shell.wait_ms.to_string()),
            ["shell", "history"] => Ok(self.shell.history.to_string()),
            _ => anyhow::bail!("Unknown config key: {}", key),
        }
    }

    /// Update a setting by dotted key
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let parts: Vec<&str> = key.split('.').collect();

        match parts.as_slice() {
            ["backend", "base_url"] => {
                if !value.starts_with("http://") && !value.starts_with("https://") {
                    anyhow::bail!("base_url must start with http:// or https://");
                }
                self.backend.base_url = value.to_string();
            }
            ["backend", "request_timeout_secs"] => {
                self.backend.request_timeout_secs = match value {
                    "" | "none" => None,
                    v => Some(v.parse().context("Expected a number of seconds")?),
                };
            }
            ["shell", "poll_interval_ms"] => {
                self.shell.poll_interval_ms = value.parse().context("Expected milliseconds")?;
            }
            ["shell", "wait_ms"] => {
                self.shell.wait_ms = value.parse().context("Expected milliseconds")?;
            }
            ["shell", "history"] => {
                self.shell.history = value.parse().context("Expected true or false")?;
            }
            _ => anyhow::bail!("Unknown config key: {}", key),
        }
        Ok(())
    }
}

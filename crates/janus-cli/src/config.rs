use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

/// CLI configuration, read from `~/.config/janus/config.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default = "default_server_url")]
    pub server_url: String,

    /// HTTP request timeout. Must exceed the gateway's long-poll hold time.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Pause between long-poll requests in `listen`
    #[serde(default)]
    pub poll_interval_ms: u64,

    #[serde(default = "default_max_consecutive_errors")]
    pub max_consecutive_errors: u32,
}

fn default_server_url() -> String {
    "http://localhost:8088/janus".to_string()
}

fn default_request_timeout() -> u64 {
    60
}

fn default_max_consecutive_errors() -> u32 {
    5
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            request_timeout_secs: default_request_timeout(),
            poll_interval_ms: 0,
            max_consecutive_errors: default_max_consecutive_errors(),
        }
    }
}

impl Config {
    /// Default config file location, if the platform has a config dir.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "janus").map(|dirs| dirs.config_dir().join("config.json"))
    }

    /// Load config from file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Invalid config in {}", path.display()))
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

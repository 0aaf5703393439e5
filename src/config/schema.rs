//! Configuration schema for dobro
//!
//! Configuration is stored at `~/.config/dobro/config.toml`

use crate::staging::DEFAULT_STAGING_DIR;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Install defaults
    pub install: InstallConfig,

    /// Subprocess timeouts
    pub timeouts: TimeoutConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Enable verbose logging
    pub verbose: bool,

    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            log_format: "text".to_string(),
        }
    }
}

/// Install defaults, overridden by command-line flags
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallConfig {
    /// Packages processed concurrently
    pub jobs: usize,

    /// Staging directory, relative to the project directory
    pub staging_dir: PathBuf,

    /// Consult the cache but never write to it
    pub no_push: bool,
}

impl Default for InstallConfig {
    fn default() -> Self {
        Self {
            jobs: 1,
            staging_dir: PathBuf::from(DEFAULT_STAGING_DIR),
            no_push: false,
        }
    }
}

/// Subprocess timeouts
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Seconds before a git/svn/npm/postinstall command is killed (0 = never)
    pub command_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { command_secs: 600 }
    }
}

impl TimeoutConfig {
    /// Per-command timeout, `None` when disabled
    pub fn command_timeout(&self) -> Option<Duration> {
        (self.command_secs > 0).then(|| Duration::from_secs(self.command_secs))
    }
}

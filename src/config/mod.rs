//! User configuration
//!
//! Settings live in `<config dir>/dobro/config.toml` unless `--config` or
//! `DOBRO_CONFIG` points elsewhere. A missing file means built-in defaults;
//! command-line flags override whatever the file says.

pub mod schema;

pub use schema::Config;

use crate::error::{DobroError, DobroResult};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Written above the defaults by `dobro config init`
const FILE_HEADER: &str = "# dobro settings. Flags given on the command line take precedence.\n\n";

/// Locates, reads and initializes the config file
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Use `explicit` when given, the per-user location otherwise
    pub fn locate(explicit: Option<PathBuf>) -> Self {
        Self {
            config_path: explicit.unwrap_or_else(Self::default_config_path),
        }
    }

    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// `<config dir>/dobro/config.toml`, relative to `.` when the platform
    /// has no config dir
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("dobro")
            .join("config.toml")
    }

    /// Read the config file; defaults when there is none
    pub async fn load(&self) -> DobroResult<Config> {
        let content = match fs::read_to_string(&self.config_path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No config at {}, using defaults", self.config_path.display());
                return Ok(Config::default());
            }
            Err(e) => {
                return Err(DobroError::io(
                    format!("reading config from {}", self.config_path.display()),
                    e,
                ))
            }
        };

        toml::from_str(&content).map_err(|e| DobroError::ConfigInvalid {
            path: self.config_path.clone(),
            reason: e.to_string(),
        })
    }

    /// Write the default settings, keeping an existing file unless `force`
    ///
    /// Returns whether the file was written.
    pub async fn write_defaults(&self, force: bool) -> DobroResult<bool> {
        if !force && fs::metadata(&self.config_path).await.is_ok() {
            return Ok(false);
        }

        if let Some(dir) = self.config_path.parent() {
            fs::create_dir_all(dir)
                .await
                .map_err(|source| DobroError::ConfigDirCreate {
                    path: dir.to_path_buf(),
                    source,
                })?;
        }

        let body = toml::to_string_pretty(&Config::default())?;
        fs::write(&self.config_path, format!("{}{}", FILE_HEADER, body))
            .await
            .map_err(|e| {
                DobroError::io(format!("writing config to {}", self.config_path.display()), e)
            })?;

        info!("Wrote default config to {}", self.config_path.display());
        Ok(true)
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }
}

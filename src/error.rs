//! Error types for dobro
//!
//! All modules use `DobroResult<T>` as their return type. Storage pull
//! misses are not errors; they are reported through `PullResult`.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for dobro operations
pub type DobroResult<T> = Result<T, DobroError>;

/// All errors that can occur in dobro
#[derive(Error, Debug)]
pub enum DobroError {
    // Package errors
    #[error("Invalid package {package}: {reason}")]
    Validation { package: String, reason: String },

    #[error("Failed to install {package} ({operation}): {reason}")]
    Install {
        package: String,
        operation: String,
        reason: String,
    },

    // Storage errors
    #[error("Failed to store {key} for {package} in: {failures}")]
    StorageWrite {
        package: String,
        key: String,
        failures: String,
    },

    #[error("Cache verification failed for {package}: {key} was pushed but cannot be pulled back")]
    Consistency { package: String, key: String },

    #[error("Storage backend {backend} is misconfigured: {reason}")]
    StorageConfig { backend: String, reason: String },

    // Manifest errors
    #[error("Manifest not found: {0}")]
    ManifestNotFound(PathBuf),

    #[error("Invalid manifest at {path}: {reason}")]
    ManifestInvalid { path: PathBuf, reason: String },

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Process errors
    #[error("Command failed: {command}")]
    CommandFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command execution error: {command}, output: {output}")]
    CommandExecution { command: String, output: String },

    #[error("Command timed out after {secs}s: {command}")]
    Timeout { command: String, secs: u64 },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    User(String),
}

impl DobroError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a command failed error
    pub fn command_failed(command: impl Into<String>, source: std::io::Error) -> Self {
        Self::CommandFailed {
            command: command.into(),
            source,
        }
    }

    /// Create a command execution error
    pub fn command_exec(command: impl Into<String>, output: impl Into<String>) -> Self {
        Self::CommandExecution {
            command: command.into(),
            output: output.into(),
        }
    }

    /// Create a validation error for a package
    pub fn validation(package: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            package: package.into(),
            reason: reason.into(),
        }
    }

    /// Create an install error for a package
    pub fn install(
        package: impl Into<String>,
        operation: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Install {
            package: package.into(),
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Short name of the error kind, shown next to fatal errors
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "ValidationError",
            Self::Install { .. } => "InstallError",
            Self::StorageWrite { .. } => "StorageWriteError",
            Self::Consistency { .. } => "ConsistencyError",
            Self::Timeout { .. } => "TimeoutError",
            Self::StorageConfig { .. }
            | Self::ManifestNotFound(_)
            | Self::ManifestInvalid { .. }
            | Self::ConfigInvalid { .. }
            | Self::ConfigDirCreate { .. } => "ConfigurationError",
            Self::Io { .. }
            | Self::CommandFailed { .. }
            | Self::CommandExecution { .. } => "IoError",
            Self::Json(_) | Self::TomlParse(_) | Self::TomlSerialize(_) => "SerializationError",
            Self::Internal(_) | Self::User(_) => "Error",
        }
    }

    /// Name of the package the error is about, when known
    pub fn package(&self) -> Option<&str> {
        match self {
            Self::Validation { package, .. }
            | Self::Install { package, .. }
            | Self::StorageWrite { package, .. }
            | Self::Consistency { package, .. } => Some(package),
            _ => None,
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::ManifestNotFound(_) => Some("Run: dobro init"),
            Self::Consistency { .. } => {
                Some("Check that the storage backends are reachable and writable")
            }
            Self::StorageWrite { .. } => Some("Retry with --no-push to skip updating the cache"),
            Self::CommandFailed { .. } => Some("Run: dobro status"),
            _ => None,
        }
    }
}

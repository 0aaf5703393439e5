//! Storage backend configuration
//!
//! Backends are selected by the `type` tag of each manifest `storage` entry.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// One entry of the storage chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StorageConfig {
    /// Archives kept in a local (or mounted) directory
    Local {
        path: PathBuf,
        #[serde(default)]
        readonly: bool,
    },
    /// Archives imported into an SVN repository
    Svn {
        url: String,
        #[serde(default)]
        readonly: bool,
    },
}

impl StorageConfig {
    /// Whether pushes to this backend are skipped
    pub fn is_readonly(&self) -> bool {
        match self {
            Self::Local { readonly, .. } | Self::Svn { readonly, .. } => *readonly,
        }
    }

    /// Backend kind name
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Local { .. } => "local",
            Self::Svn { .. } => "svn",
        }
    }

    /// Resolve a relative local path against `base`
    pub fn resolve_relative(self, base: &Path) -> Self {
        match self {
            Self::Local { path, readonly } if path.is_relative() => Self::Local {
                path: base.join(path),
                readonly,
            },
            other => other,
        }
    }
}

impl fmt::Display for StorageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local { path, .. } => write!(f, "local:{}", path.display()),
            Self::Svn { url, .. } => write!(f, "svn:{}", url),
        }
    }
}

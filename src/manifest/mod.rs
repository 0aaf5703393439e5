//! Manifest loading
//!
//! The manifest (`dobro.json`) lists the storage chain and the flat,
//! pre-resolved dependency list for one project.

pub mod package;

pub use package::{validate_version, PackageKind, PackageSource, PackageSpec, RawPackage};

use crate::error::{DobroError, DobroResult};
use crate::storage::StorageConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default manifest file name
pub const MANIFEST_FILE: &str = "dobro.json";

/// A single value or a list of values
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> Default for OneOrMany<T> {
    fn default() -> Self {
        Self::Many(Vec::new())
    }
}

impl<T> OneOrMany<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            Self::One(item) => vec![item],
            Self::Many(items) => items,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawManifest {
    #[serde(default)]
    storage: OneOrMany<StorageConfig>,
    #[serde(default)]
    dependencies: Vec<RawPackage>,
}

/// Parsed and validated manifest
#[derive(Debug, Clone)]
pub struct Manifest {
    /// Where the manifest was read from
    pub path: PathBuf,
    /// Storage chain, in fallback order
    pub storage: Vec<StorageConfig>,
    /// Packages, in manifest order
    pub dependencies: Vec<PackageSpec>,
}

impl Manifest {
    /// Locate the manifest for a project directory
    pub fn find(project_dir: &Path) -> DobroResult<PathBuf> {
        let path = project_dir.join(MANIFEST_FILE);
        if path.is_file() {
            Ok(path)
        } else {
            Err(DobroError::ManifestNotFound(path))
        }
    }

    /// Load a manifest from disk
    pub async fn load(path: &Path) -> DobroResult<Self> {
        if !path.exists() {
            return Err(DobroError::ManifestNotFound(path.to_path_buf()));
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| DobroError::io(format!("reading manifest {}", path.display()), e))?;

        Self::parse(&content, path)
    }

    /// Parse manifest content; `path` is used for errors and to resolve
    /// relative local storage paths
    pub fn parse(content: &str, path: &Path) -> DobroResult<Self> {
        let raw: RawManifest =
            serde_json::from_str(content).map_err(|e| DobroError::ManifestInvalid {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));

        let storage: Vec<StorageConfig> = raw
            .storage
            .into_vec()
            .into_iter()
            .map(|config| config.resolve_relative(base_dir))
            .collect();

        let dependencies = raw
            .dependencies
            .into_iter()
            .map(PackageSpec::try_from)
            .collect::<DobroResult<Vec<_>>>()?;

        debug!(
            "Loaded manifest {}: {} package(s), {} storage backend(s)",
            path.display(),
            dependencies.len(),
            storage.len()
        );

        Ok(Self {
            path: path.to_path_buf(),
            storage,
            dependencies,
        })
    }

    /// Directory containing the manifest
    pub fn base_dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("."))
    }
}

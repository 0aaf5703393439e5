//! Cache key derivation
//!
//! A cache key names the expected build output of a package spec, assuming
//! the content at the referenced commit, revision or version never changes.
//! Same spec = same key.

use crate::error::{DobroError, DobroResult};
use crate::manifest::{validate_version, PackageSource, PackageSpec};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::{Component, Path, PathBuf};

/// Placeholder used in the key of git packages without a pinned commit
pub const UNPINNED_COMMIT: &str = "HEAD";

/// Deterministic identifier for a package's build output
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Wrap an existing key string
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The key as a string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name of the archive stored under this key
    pub fn archive_name(&self) -> String {
        format!("{}.tar", self.0)
    }

    /// Whether the key names exactly one plain directory entry
    pub fn is_single_component(&self) -> bool {
        if self.0.contains(['/', '\\']) {
            return false;
        }
        let mut components = Path::new(&self.0).components();
        matches!(
            (components.next(), components.next()),
            (Some(Component::Normal(_)), None)
        )
    }

    /// `base/<key>`, refusing keys that would resolve outside `base`
    pub fn dir_in(&self, base: &Path) -> DobroResult<PathBuf> {
        if !self.is_single_component() {
            return Err(DobroError::Internal(format!(
                "cache key '{}' is not a single path component",
                self.0
            )));
        }
        Ok(base.join(&self.0))
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Hash a repository URL using SHA256, returning the first 32 hex chars
pub fn hash_repo_url(url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    let result = hasher.finalize();

    hex::encode(&result[..16])
}

/// Derive the cache key for a package
///
/// Fails only for registry packages whose version is not strict.
pub fn derive_key(spec: &PackageSpec) -> DobroResult<CacheKey> {
    // Keys are single path components; scoped npm names carry a slash
    let name = spec.name.replace('/', "+");

    let key = match &spec.source {
        PackageSource::Git { repo, commit, .. } => format!(
            "{}_{}_{}",
            name,
            hash_repo_url(repo),
            commit.as_deref().unwrap_or(UNPINNED_COMMIT)
        ),
        PackageSource::Svn { revision, .. } => format!("{}_{}", name, revision),
        PackageSource::Registry { version } => {
            validate_version(&spec.name, version)?;
            format!("{}_{}", name, version)
        }
    };

    let key = CacheKey(key);
    if !key.is_single_component() {
        return Err(DobroError::validation(
            &spec.name,
            format!("cache key '{}' is not a valid directory name", key),
        ));
    }
    Ok(key)
}

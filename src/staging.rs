//! Run-scoped staging area
//!
//! Layout:
//!
//! ```text
//! <root>/                 removed at run start if present, and at run end
//!   .scratch/svn/         svn checkout/import scratch space
//!   <cache-key>/          one directory per package, created lazily
//! ```

use crate::cache::CacheKey;
use crate::error::{DobroError, DobroResult};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, warn};

/// Default staging directory name, relative to the project directory
pub const DEFAULT_STAGING_DIR: &str = "__dobro_temp__";

/// Backend scratch spaces live under this subdirectory
const SCRATCH_DIR: &str = ".scratch";

/// Backends that get a scratch directory before any backend runs
const SCRATCH_BACKENDS: &[&str] = &["svn"];

/// Temporary workspace for one run
#[derive(Debug)]
pub struct StagingArea {
    root: PathBuf,
    removed: AtomicBool,
}

impl StagingArea {
    /// Create a fresh staging area, removing any leftover from a previous run
    pub async fn create(root: impl Into<PathBuf>) -> DobroResult<Self> {
        let root = root.into();

        if fs::metadata(&root).await.is_ok() {
            debug!("Removing stale staging area {}", root.display());
            fs::remove_dir_all(&root).await.map_err(|e| {
                DobroError::io(format!("removing stale staging area {}", root.display()), e)
            })?;
        }

        let staging = Self {
            root,
            removed: AtomicBool::new(false),
        };

        for backend in SCRATCH_BACKENDS {
            let dir = staging.scratch_dir(backend);
            fs::create_dir_all(&dir)
                .await
                .map_err(|e| DobroError::io(format!("creating directory {}", dir.display()), e))?;
        }

        debug!("Created staging area {}", staging.root.display());
        Ok(staging)
    }

    /// Create a staging area, run `body`, and remove the area whatever the
    /// outcome
    pub async fn scoped<F, Fut, T>(root: impl Into<PathBuf>, body: F) -> DobroResult<T>
    where
        F: FnOnce(Arc<StagingArea>) -> Fut,
        Fut: Future<Output = DobroResult<T>>,
    {
        let staging = Arc::new(Self::create(root).await?);
        let result = body(staging.clone()).await;
        let cleanup = staging.cleanup().await;

        match (result, cleanup) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(e)) => Err(e),
            (Err(e), Err(cleanup_err)) => {
                warn!("Failed to remove staging area: {}", cleanup_err);
                Err(e)
            }
            (Err(e), Ok(())) => Err(e),
        }
    }

    /// Root of the staging area
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Scratch directory reserved for a backend kind
    pub fn scratch_dir(&self, backend: &str) -> PathBuf {
        self.root.join(SCRATCH_DIR).join(backend)
    }

    /// Path of a package's staging directory (not created)
    ///
    /// Fails for keys that would resolve outside the staging root.
    pub fn package_path(&self, key: &CacheKey) -> DobroResult<PathBuf> {
        key.dir_in(&self.root)
    }

    /// Create a package's staging directory, emptying it if it exists
    ///
    /// Safe to call concurrently for different keys.
    pub async fn reset_package_dir(&self, key: &CacheKey) -> DobroResult<PathBuf> {
        let path = self.package_path(key)?;
        reset_dir(&path).await?;
        Ok(path)
    }

    /// Remove the whole staging area
    pub async fn cleanup(&self) -> DobroResult<()> {
        if self.removed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        match fs::remove_dir_all(&self.root).await {
            Ok(()) => {
                debug!("Removed staging area {}", self.root.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(DobroError::io(
                format!("removing staging area {}", self.root.display()),
                e,
            )),
        }
    }
}

impl Drop for StagingArea {
    fn drop(&mut self) {
        if !self.removed.load(Ordering::SeqCst) && self.root.exists() {
            if let Err(e) = std::fs::remove_dir_all(&self.root) {
                warn!("Failed to remove staging area {}: {}", self.root.display(), e);
            }
        }
    }
}

/// Remove a directory if present and recreate it empty
pub async fn reset_dir(path: &Path) -> DobroResult<()> {
    match fs::remove_dir_all(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            return Err(DobroError::io(format!("clearing {}", path.display()), e));
        }
    }
    fs::create_dir_all(path)
        .await
        .map_err(|e| DobroError::io(format!("creating directory {}", path.display()), e))
}

//! Local directory backend
//!
//! Archives live at `<root>/<key>/<key>.tar`. The root may be a network
//! mount shared between machines.

use crate::cache::CacheKey;
use crate::error::{DobroError, DobroResult};
use crate::events::{PipelineEvent, SharedSink};
use crate::storage::archive;
use crate::storage::backend::{PullResult, PushResult, StorageBackend};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::fs;
use tracing::debug;
use uuid::Uuid;

/// An archive held by a local backend
#[derive(Debug, Clone)]
pub struct LocalEntry {
    pub key: CacheKey,
    /// Archive size in bytes
    pub size: u64,
    pub modified: Option<SystemTime>,
}

/// Backend storing archives in a directory tree
#[derive(Clone)]
pub struct LocalBackend {
    root: PathBuf,
    readonly: bool,
    sink: SharedSink,
}

impl LocalBackend {
    pub fn new(root: impl Into<PathBuf>, readonly: bool, sink: SharedSink) -> Self {
        Self {
            root: root.into(),
            readonly,
            sink,
        }
    }

    /// Root directory of the store
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path where the archive for `key` is kept
    pub fn archive_path(&self, key: &CacheKey) -> DobroResult<PathBuf> {
        Ok(key.dir_in(&self.root)?.join(key.archive_name()))
    }

    /// Archives currently in the store, sorted by key
    ///
    /// A missing root is an empty store. Directories without a
    /// `<key>.tar` inside are ignored.
    pub async fn entries(&self) -> DobroResult<Vec<LocalEntry>> {
        let mut dir = match fs::read_dir(&self.root).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(DobroError::io(
                    format!("reading {}", self.root.display()),
                    e,
                ))
            }
        };

        let mut entries = Vec::new();
        while let Some(entry) = dir
            .next_entry()
            .await
            .map_err(|e| DobroError::io(format!("reading {}", self.root.display()), e))?
        {
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if name.starts_with('.') {
                continue;
            }

            let key = CacheKey::new(name);
            let Ok(path) = self.archive_path(&key) else {
                continue;
            };
            if let Ok(meta) = fs::metadata(path).await {
                if meta.is_file() {
                    entries.push(LocalEntry {
                        key,
                        size: meta.len(),
                        modified: meta.modified().ok(),
                    });
                }
            }
        }

        entries.sort_by(|a, b| a.key.as_str().cmp(b.key.as_str()));
        Ok(entries)
    }

    /// Delete the entry for `key`
    pub async fn remove(&self, key: &CacheKey) -> DobroResult<()> {
        if self.readonly {
            return Err(DobroError::StorageConfig {
                backend: self.describe(),
                reason: "backend is readonly".to_string(),
            });
        }

        let dir = key.dir_in(&self.root)?;
        match fs::remove_dir_all(&dir).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(DobroError::io(format!("removing {}", dir.display()), e)),
        }
    }

    async fn store(&self, src: &Path, key: &CacheKey) -> DobroResult<()> {
        let target = self.archive_path(key)?;
        let dir = target
            .parent()
            .ok_or_else(|| DobroError::Internal(format!("{} has no parent", target.display())))?;

        fs::create_dir_all(dir)
            .await
            .map_err(|e| DobroError::io(format!("creating directory {}", dir.display()), e))?;

        // Readers only ever observe a complete archive
        let tmp = dir.join(format!(".{}.{}.tmp", key.archive_name(), Uuid::new_v4().simple()));
        if let Err(e) = archive::pack_dir(src, &tmp).await {
            self.discard(&tmp).await;
            return Err(e);
        }

        fs::rename(&tmp, &target).await.map_err(|e| {
            DobroError::io(format!("moving archive into {}", target.display()), e)
        })?;

        debug!("Stored {} at {}", key, target.display());
        self.sink.emit(PipelineEvent::Archived {
            key: key.to_string(),
            location: target.display().to_string(),
        });
        Ok(())
    }

    async fn discard(&self, tmp: &Path) {
        match fs::remove_file(tmp).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => self.sink.emit(PipelineEvent::Warning {
                message: format!("Can't remove partial archive {}: {}", tmp.display(), e),
            }),
        }
    }
}

#[async_trait]
impl StorageBackend for LocalBackend {
    async fn pull(&self, dest: &Path, key: &CacheKey) -> PullResult {
        let archive_path = match self.archive_path(key) {
            Ok(path) => path,
            Err(e) => return PullResult::Error(e.to_string()),
        };

        match fs::metadata(&archive_path).await {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => {
                return PullResult::Error(format!("{} is not a file", archive_path.display()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return PullResult::Miss,
            Err(e) => return PullResult::Error(format!("{}: {}", archive_path.display(), e)),
        }

        match archive::unpack(&archive_path, dest).await {
            Ok(()) => PullResult::Hit,
            Err(e) => PullResult::Error(e.to_string()),
        }
    }

    async fn push(&self, src: &Path, key: &CacheKey) -> PushResult {
        if self.readonly {
            debug!("{} is readonly, not writing {}", self.describe(), key);
            return PushResult::Skipped;
        }

        match self.store(src, key).await {
            Ok(()) => PushResult::Stored,
            Err(e) => PushResult::Failed(e.to_string()),
        }
    }

    fn is_readonly(&self) -> bool {
        self.readonly
    }

    fn describe(&self) -> String {
        format!("local:{}", self.root.display())
    }
}

//! SVN repository backend
//!
//! Each cache key is a directory `<url><key>/` holding `<key>.tar`. Pulls
//! check the directory out into scratch space and extract the archive;
//! pushes pack the staged tree and `svn import` it. Imports of an existing
//! key fail on the server, which surfaces as a push failure.

use crate::cache::CacheKey;
use crate::error::{DobroError, DobroResult};
use crate::events::{PipelineEvent, SharedSink};
use crate::process::CommandRunner;
use crate::storage::archive;
use crate::storage::backend::{PullResult, PushResult, StorageBackend};
use async_trait::async_trait;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;
use uuid::Uuid;

/// Error codes and messages svn uses for a path that isn't in the repository
const MISSING_MARKERS: &[&str] = &["E170000", "E160013", "doesn't exist", "non-existent"];

/// Backend storing archives in an SVN repository
#[derive(Clone)]
pub struct SvnBackend {
    url: String,
    readonly: bool,
    scratch_root: PathBuf,
    runner: CommandRunner,
    sink: SharedSink,
}

impl SvnBackend {
    /// Create a backend; a trailing `/` is added to `url` if missing
    pub fn new(
        url: impl Into<String>,
        readonly: bool,
        scratch_root: impl Into<PathBuf>,
        runner: CommandRunner,
        sink: SharedSink,
    ) -> Self {
        let mut url = url.into();
        if !url.ends_with('/') {
            url.push('/');
        }

        Self {
            url,
            readonly,
            scratch_root: scratch_root.into(),
            runner,
            sink,
        }
    }

    /// Repository URL with trailing slash
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Repository URL of the directory holding `key`
    pub fn key_url(&self, key: &CacheKey) -> String {
        format!("{}{}", self.url, key)
    }

    fn scratch(&self, operation: &str, key: &CacheKey) -> PathBuf {
        self.scratch_root
            .join(format!("{}-{}-{}", operation, key, Uuid::new_v4().simple()))
    }

    async fn checkout_and_extract(&self, scratch: &Path, dest: &Path, key: &CacheKey) -> PullResult {
        let url = self.key_url(key);
        let checkout = self
            .runner
            .run(
                "svn",
                [
                    OsStr::new("checkout"),
                    OsStr::new("--non-interactive"),
                    OsStr::new(&url),
                    scratch.as_os_str(),
                ],
                None,
            )
            .await;

        match checkout {
            Ok(_) => {}
            Err(DobroError::CommandExecution { output, .. }) if is_missing(&output) => {
                return PullResult::Miss
            }
            Err(e) => return PullResult::Error(e.to_string()),
        }

        let archive_path = scratch.join(key.archive_name());
        if fs::metadata(&archive_path).await.is_err() {
            return PullResult::Miss;
        }

        match archive::unpack(&archive_path, dest).await {
            Ok(()) => PullResult::Hit,
            Err(e) => PullResult::Error(e.to_string()),
        }
    }

    async fn import(&self, scratch: &Path, src: &Path, key: &CacheKey) -> DobroResult<()> {
        fs::create_dir_all(scratch)
            .await
            .map_err(|e| DobroError::io(format!("creating directory {}", scratch.display()), e))?;

        archive::pack_dir(src, &scratch.join(key.archive_name())).await?;

        let message = format!("Add {}", key);
        let url = self.key_url(key);
        self.runner
            .run(
                "svn",
                [
                    OsStr::new("import"),
                    OsStr::new("--non-interactive"),
                    OsStr::new("-m"),
                    OsStr::new(&message),
                    scratch.as_os_str(),
                    OsStr::new(&url),
                ],
                None,
            )
            .await?;

        debug!("Imported {} into {}", key, self.url);
        self.sink.emit(PipelineEvent::Archived {
            key: key.to_string(),
            location: url,
        });
        Ok(())
    }

    /// Scratch leftovers only cost disk space, so failure is a warning
    async fn remove_scratch(&self, path: &Path) {
        match fs::remove_dir_all(path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => self.sink.emit(PipelineEvent::Warning {
                message: format!("Can't remove svn scratch {}: {}", path.display(), e),
            }),
        }
    }
}

#[async_trait]
impl StorageBackend for SvnBackend {
    async fn pull(&self, dest: &Path, key: &CacheKey) -> PullResult {
        let scratch = self.scratch("pull", key);
        let result = self.checkout_and_extract(&scratch, dest, key).await;
        self.remove_scratch(&scratch).await;
        result
    }

    async fn push(&self, src: &Path, key: &CacheKey) -> PushResult {
        if self.readonly {
            return PushResult::Skipped;
        }

        let scratch = self.scratch("push", key);
        let result = self.import(&scratch, src, key).await;
        self.remove_scratch(&scratch).await;

        match result {
            Ok(()) => PushResult::Stored,
            Err(e) => PushResult::Failed(e.to_string()),
        }
    }

    fn is_readonly(&self) -> bool {
        self.readonly
    }

    fn describe(&self) -> String {
        format!("svn:{}", self.url)
    }
}

fn is_missing(output: &str) -> bool {
    MISSING_MARKERS.iter().any(|marker| output.contains(marker))
}

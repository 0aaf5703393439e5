//! Ordered storage chain
//!
//! Pulls try backends in configuration order and stop at the first hit.
//! Pushes go to every backend concurrently, and the caller decides what an
//! individual failure means.

use crate::cache::CacheKey;
use crate::error::DobroResult;
use crate::events::{PipelineEvent, SharedSink};
use crate::staging::reset_dir;
use crate::storage::backend::{PullResult, PushResult, StorageBackend};
use futures_util::future::join_all;
use std::path::Path;
use std::sync::Arc;

/// Outcome of a chain pull
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainPull {
    /// First backend that had the artifact
    Hit { backend: String },
    /// No backend had it (or every backend errored)
    Miss,
}

/// Per-backend outcome of a broadcast push
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PushReport {
    pub stored: Vec<String>,
    pub skipped: Vec<String>,
    pub failed: Vec<(String, String)>,
}

impl PushReport {
    /// At least one backend rejected the write
    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }

    /// At least one backend holds the artifact now
    pub fn any_stored(&self) -> bool {
        !self.stored.is_empty()
    }

    /// `backend: message` pairs joined for error reporting
    pub fn failure_summary(&self) -> String {
        self.failed
            .iter()
            .map(|(backend, message)| format!("{}: {}", backend, message))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Backends in fallback order
#[derive(Clone)]
pub struct StorageChain {
    backends: Vec<Arc<dyn StorageBackend>>,
    sink: SharedSink,
}

impl StorageChain {
    pub fn new(backends: Vec<Arc<dyn StorageBackend>>, sink: SharedSink) -> Self {
        Self { backends, sink }
    }

    /// Chain with no backends; every pull misses, every push is a no-op
    pub fn empty(sink: SharedSink) -> Self {
        Self::new(Vec::new(), sink)
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    /// Backend descriptions in order
    pub fn describe(&self) -> Vec<String> {
        self.backends.iter().map(|b| b.describe()).collect()
    }

    /// Pull `key` into `dest`, trying each backend in order
    ///
    /// A backend error is reported and the destination is emptied before the
    /// next backend is tried. Only failing to empty `dest` is an error.
    pub async fn pull(&self, dest: &Path, key: &CacheKey) -> DobroResult<ChainPull> {
        for backend in &self.backends {
            let name = backend.describe();
            self.sink.emit(PipelineEvent::PullAttempt {
                key: key.to_string(),
                backend: name.clone(),
            });

            match backend.pull(dest, key).await {
                PullResult::Hit => {
                    self.sink.emit(PipelineEvent::BackendHit {
                        key: key.to_string(),
                        backend: name.clone(),
                    });
                    return Ok(ChainPull::Hit { backend: name });
                }
                PullResult::Miss => {
                    self.sink.emit(PipelineEvent::BackendMiss {
                        key: key.to_string(),
                        backend: name,
                    });
                }
                PullResult::Error(message) => {
                    self.sink.emit(PipelineEvent::BackendError {
                        key: key.to_string(),
                        backend: name,
                        message,
                    });
                    reset_dir(dest).await?;
                }
            }
        }

        Ok(ChainPull::Miss)
    }

    /// Push `src` under `key` to every backend concurrently
    pub async fn push(&self, src: &Path, key: &CacheKey) -> PushReport {
        let results = join_all(self.backends.iter().map(|backend| async move {
            (backend.describe(), backend.push(src, key).await)
        }))
        .await;

        let mut report = PushReport::default();
        for (backend, result) in results {
            match result {
                PushResult::Stored => {
                    self.sink.emit(PipelineEvent::PushStored {
                        key: key.to_string(),
                        backend: backend.clone(),
                    });
                    report.stored.push(backend);
                }
                PushResult::Skipped => {
                    self.sink.emit(PipelineEvent::PushSkipped {
                        key: key.to_string(),
                        backend: backend.clone(),
                    });
                    report.skipped.push(backend);
                }
                PushResult::Failed(message) => {
                    self.sink.emit(PipelineEvent::PushFailed {
                        key: key.to_string(),
                        backend: backend.clone(),
                        message: message.clone(),
                    });
                    report.failed.push((backend, message));
                }
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::MemorySink;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    struct FakeBackend {
        name: &'static str,
        pull: PullResult,
        push: PushResult,
        pulls: AtomicUsize,
        pushes: AtomicUsize,
    }

    impl FakeBackend {
        fn new(name: &'static str, pull: PullResult, push: PushResult) -> Arc<Self> {
            Arc::new(Self {
                name,
                pull,
                push,
                pulls: AtomicUsize::new(0),
                pushes: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl StorageBackend for FakeBackend {
        async fn pull(&self, dest: &Path, _key: &CacheKey) -> PullResult {
            self.pulls.fetch_add(1, Ordering::SeqCst);
            // Leave debris behind to check the chain resets between backends
            std::fs::write(dest.join(format!("{}.partial", self.name)), "x").unwrap();
            self.pull.clone()
        }

        async fn push(&self, _src: &Path, _key: &CacheKey) -> PushResult {
            self.pushes.fetch_add(1, Ordering::SeqCst);
            self.push.clone()
        }

        fn is_readonly(&self) -> bool {
            self.push == PushResult::Skipped
        }

        fn describe(&self) -> String {
            self.name.to_string()
        }
    }

    fn dest(temp: &TempDir) -> std::path::PathBuf {
        let dest = temp.path().join("dest");
        std::fs::create_dir_all(&dest).unwrap();
        dest
    }

    #[tokio::test]
    async fn pull_falls_back_in_order() {
        let temp = TempDir::new().unwrap();
        let a = FakeBackend::new("a", PullResult::Miss, PushResult::Stored);
        let b = FakeBackend::new("b", PullResult::Hit, PushResult::Stored);
        let c = FakeBackend::new("c", PullResult::Hit, PushResult::Stored);
        let sink = Arc::new(MemorySink::new());
        let backends: Vec<Arc<dyn StorageBackend>> = vec![a.clone(), b.clone(), c.clone()];
        let chain = StorageChain::new(backends, sink.clone());

        let result = chain.pull(&dest(&temp), &CacheKey::new("k_1")).await.unwrap();

        assert_eq!(result, ChainPull::Hit { backend: "b".into() });
        assert_eq!(a.pulls.load(Ordering::SeqCst), 1);
        assert_eq!(b.pulls.load(Ordering::SeqCst), 1);
        assert_eq!(c.pulls.load(Ordering::SeqCst), 0);

        let attempts: Vec<String> = sink
            .events()
            .into_iter()
            .filter_map(|e| match e {
                PipelineEvent::PullAttempt { backend, .. } => Some(backend),
                _ => None,
            })
            .collect();
        assert_eq!(attempts, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn pull_error_resets_dest_and_continues() {
        let temp = TempDir::new().unwrap();
        let dest = dest(&temp);
        let a = FakeBackend::new("a", PullResult::Error("corrupt".into()), PushResult::Stored);
        let b = FakeBackend::new("b", PullResult::Miss, PushResult::Stored);
        let sink = Arc::new(MemorySink::new());
        let backends: Vec<Arc<dyn StorageBackend>> = vec![a, b];
        let chain = StorageChain::new(backends, sink.clone());

        let result = chain.pull(&dest, &CacheKey::new("k_1")).await.unwrap();

        assert_eq!(result, ChainPull::Miss);
        assert!(!dest.join("a.partial").exists());
        assert_eq!(
            sink.count(|e| matches!(e, PipelineEvent::BackendError { .. })),
            1
        );
    }

    #[tokio::test]
    async fn empty_chain_always_misses() {
        let temp = TempDir::new().unwrap();
        let chain = StorageChain::empty(Arc::new(MemorySink::new()));
        assert!(chain.is_empty());

        let result = chain.pull(&dest(&temp), &CacheKey::new("k_1")).await.unwrap();
        assert_eq!(result, ChainPull::Miss);

        let report = chain.push(temp.path(), &CacheKey::new("k_1")).await;
        assert_eq!(report, PushReport::default());
    }

    #[tokio::test]
    async fn push_reaches_every_backend_and_aggregates_failures() {
        let temp = TempDir::new().unwrap();
        let a = FakeBackend::new("a", PullResult::Miss, PushResult::Stored);
        let b = FakeBackend::new("b", PullResult::Miss, PushResult::Failed("disk full".into()));
        let c = FakeBackend::new("c", PullResult::Miss, PushResult::Skipped);
        let backends: Vec<Arc<dyn StorageBackend>> = vec![a.clone(), b.clone(), c.clone()];
        let chain = StorageChain::new(backends, Arc::new(MemorySink::new()));

        let report = chain.push(temp.path(), &CacheKey::new("k_1")).await;

        assert_eq!(a.pushes.load(Ordering::SeqCst), 1);
        assert_eq!(b.pushes.load(Ordering::SeqCst), 1);
        assert_eq!(c.pushes.load(Ordering::SeqCst), 1);
        assert_eq!(report.stored, vec!["a"]);
        assert_eq!(report.skipped, vec!["c"]);
        assert!(report.has_failures());
        assert!(report.any_stored());
        assert_eq!(report.failure_summary(), "b: disk full");
    }
}

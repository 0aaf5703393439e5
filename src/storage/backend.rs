//! Storage backend abstraction
//!
//! A backend stores one archive per cache key. Backends never raise on a
//! pull: a missing artifact is a `Miss` and an unreachable store is an
//! `Error`, so the chain can fall through to the next backend either way.

use crate::cache::CacheKey;
use async_trait::async_trait;
use std::path::Path;

/// Outcome of pulling an artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PullResult {
    /// Artifact found and materialized into the destination
    Hit,
    /// Backend reachable, artifact absent
    Miss,
    /// Backend could not be queried or the artifact could not be restored
    Error(String),
}

/// Outcome of pushing an artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushResult {
    /// Artifact written
    Stored,
    /// Backend is readonly, nothing written
    Skipped,
    /// Write attempted and failed
    Failed(String),
}

/// Abstract artifact store
///
/// Implementations:
/// - `LocalBackend`: tar archives in a directory
/// - `SvnBackend`: tar archives imported into an SVN repository
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Materialize the artifact for `key` into `dest` (an existing, empty dir)
    async fn pull(&self, dest: &Path, key: &CacheKey) -> PullResult;

    /// Store the contents of `src` under `key`
    ///
    /// Readonly backends return `Skipped` without touching their location.
    async fn push(&self, src: &Path, key: &CacheKey) -> PushResult;

    /// Whether pushes are skipped
    fn is_readonly(&self) -> bool;

    /// Human-readable identity, e.g. `local:/var/cache/dobro`
    fn describe(&self) -> String;
}

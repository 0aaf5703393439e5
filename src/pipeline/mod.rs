//! Install pipeline
//!
//! For every package: derive its cache key, try the storage chain, install
//! on a miss, push the fresh artifact to every backend, pull it back to
//! verify the cache serves it, then copy the result into the project.
//!
//! Packages are processed by a bounded worker pool. The first fatal error
//! stops scheduling; the staging area is removed on every exit path.

mod copy;

pub use copy::copy_tree;

use crate::cache::{derive_key, CacheKey};
use crate::error::{DobroError, DobroResult};
use crate::events::{PipelineEvent, ReadySource, SharedSink};
use crate::install::PackageInstaller;
use crate::manifest::{Manifest, PackageSpec};
use crate::process::CommandRunner;
use crate::staging::{StagingArea, DEFAULT_STAGING_DIR};
use crate::storage::{create_chain, ChainPull, StorageChain};
use futures_util::stream::{self, TryStreamExt};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::debug;

/// How the storage chain is used
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InstallMode {
    /// Pull, install on miss, push and verify
    #[default]
    Cached,
    /// Pull, install on miss, never write to the cache
    NoPush,
    /// Always install, never touch the cache
    Local,
}

impl InstallMode {
    /// Mode selected by the `--local` / `--no-push` flags
    pub fn from_flags(local: bool, no_push: bool) -> Self {
        if local {
            Self::Local
        } else if no_push {
            Self::NoPush
        } else {
            Self::Cached
        }
    }
}

/// Result for one package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageOutcome {
    pub name: String,
    pub key: CacheKey,
    pub source: ReadySource,
}

/// Drives packages through pull, install, push, verify and copy
pub struct Orchestrator {
    chain: StorageChain,
    installer: Arc<dyn PackageInstaller>,
    staging: Arc<StagingArea>,
    sink: SharedSink,
    mode: InstallMode,
    jobs: usize,
}

impl Orchestrator {
    pub fn new(
        chain: StorageChain,
        installer: Arc<dyn PackageInstaller>,
        staging: Arc<StagingArea>,
        sink: SharedSink,
    ) -> Self {
        Self {
            chain,
            installer,
            staging,
            sink,
            mode: InstallMode::default(),
            jobs: 1,
        }
    }

    pub fn with_mode(mut self, mode: InstallMode) -> Self {
        self.mode = mode;
        self
    }

    /// Number of packages processed concurrently (at least one)
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    /// Install every package into `project_dir`
    ///
    /// Keys for all packages are derived before anything runs, so a
    /// malformed or colliding entry fails the run without side effects.
    pub async fn install_all(
        &self,
        specs: &[PackageSpec],
        project_dir: &Path,
    ) -> DobroResult<Vec<PackageOutcome>> {
        preflight(specs)?;

        self.sink.emit(PipelineEvent::RunStarted {
            packages: specs.len(),
            jobs: self.jobs,
        });

        let outcomes = Mutex::new(Vec::with_capacity(specs.len()));

        stream::iter(specs.iter().enumerate().map(Ok::<_, DobroError>))
            .try_for_each_concurrent(self.jobs, |(index, spec)| {
                let outcomes = &outcomes;
                async move {
                    match self.install_package(spec, project_dir).await {
                        Ok(outcome) => {
                            if let Ok(mut done) = outcomes.lock() {
                                done.push((index, outcome));
                            }
                            Ok(())
                        }
                        Err(e) => {
                            self.sink.emit(PipelineEvent::Failed {
                                package: spec.name.clone(),
                                error: e.to_string(),
                            });
                            Err(e)
                        }
                    }
                }
            })
            .await?;

        let mut done = outcomes
            .into_inner()
            .map_err(|_| DobroError::Internal("outcome list poisoned".to_string()))?;
        done.sort_by_key(|(index, _)| *index);
        Ok(done.into_iter().map(|(_, outcome)| outcome).collect())
    }

    /// Install one package into `project_dir`
    pub async fn install_package(
        &self,
        spec: &PackageSpec,
        project_dir: &Path,
    ) -> DobroResult<PackageOutcome> {
        let key = derive_key(spec)?;
        self.sink.emit(PipelineEvent::PackageStarted {
            package: spec.name.clone(),
            key: key.to_string(),
        });

        let staging = self.staging.reset_package_dir(&key).await?;

        if self.mode == InstallMode::Local {
            self.run_installer(&staging, spec, &key).await?;
            return self.finish(spec, key, &staging, project_dir, ReadySource::Uncached).await;
        }

        match self.chain.pull(&staging, &key).await? {
            ChainPull::Hit { backend } => {
                self.sink.emit(PipelineEvent::CacheHit {
                    package: spec.name.clone(),
                    key: key.to_string(),
                    backend: backend.clone(),
                });
                return self
                    .finish(spec, key, &staging, project_dir, ReadySource::Cache { backend })
                    .await;
            }
            ChainPull::Miss => {
                self.sink.emit(PipelineEvent::CacheMiss {
                    package: spec.name.clone(),
                    key: key.to_string(),
                });
            }
        }

        self.run_installer(&staging, spec, &key).await?;

        if self.mode == InstallMode::NoPush {
            return self.finish(spec, key, &staging, project_dir, ReadySource::Uncached).await;
        }

        self.sink.emit(PipelineEvent::Pushing {
            package: spec.name.clone(),
            key: key.to_string(),
        });
        let report = self.chain.push(&staging, &key).await;

        if report.has_failures() {
            return Err(DobroError::StorageWrite {
                package: spec.name.clone(),
                key: key.to_string(),
                failures: report.failure_summary(),
            });
        }

        if !report.any_stored() {
            self.sink.emit(PipelineEvent::VerifySkipped {
                package: spec.name.clone(),
                key: key.to_string(),
            });
            return self.finish(spec, key, &staging, project_dir, ReadySource::Uncached).await;
        }

        // Serve the project from the cache so it gets exactly what others will
        self.sink.emit(PipelineEvent::Verifying {
            package: spec.name.clone(),
            key: key.to_string(),
        });
        let staging = self.staging.reset_package_dir(&key).await?;
        match self.chain.pull(&staging, &key).await? {
            ChainPull::Hit { .. } => {
                self.finish(spec, key, &staging, project_dir, ReadySource::Fresh).await
            }
            ChainPull::Miss => Err(DobroError::Consistency {
                package: spec.name.clone(),
                key: key.to_string(),
            }),
        }
    }

    /// Run the installer, retrying once after a timeout
    async fn run_installer(&self, staging: &Path, spec: &PackageSpec, key: &CacheKey) -> DobroResult<()> {
        self.sink.emit(PipelineEvent::Installing {
            package: spec.name.clone(),
            kind: spec.kind().to_string(),
        });

        let err = match self.installer.install(staging, spec).await {
            Ok(()) => return Ok(()),
            Err(e) if e.is_retryable() => e,
            Err(e) => return Err(as_install_error(spec, e)),
        };

        self.sink.emit(PipelineEvent::InstallRetry {
            package: spec.name.clone(),
            reason: err.to_string(),
        });
        self.staging.reset_package_dir(key).await?;

        self.installer
            .install(staging, spec)
            .await
            .map_err(|e| as_install_error(spec, e))
    }

    async fn finish(
        &self,
        spec: &PackageSpec,
        key: CacheKey,
        staging: &Path,
        project_dir: &Path,
        source: ReadySource,
    ) -> DobroResult<PackageOutcome> {
        copy_tree(staging, project_dir).await?;
        debug!("Copied {} into {}", spec.name, project_dir.display());

        self.sink.emit(PipelineEvent::Ready {
            package: spec.name.clone(),
            key: key.to_string(),
            source: source.clone(),
        });

        Ok(PackageOutcome {
            name: spec.name.clone(),
            key,
            source,
        })
    }
}

fn as_install_error(spec: &PackageSpec, err: DobroError) -> DobroError {
    match err {
        DobroError::Install { .. } => err,
        other => DobroError::install(&spec.name, "install", other.to_string()),
    }
}

/// Validate every spec, derive its key and reject collisions
pub fn preflight(specs: &[PackageSpec]) -> DobroResult<Vec<CacheKey>> {
    let mut seen: HashMap<CacheKey, &str> = HashMap::new();
    let mut keys = Vec::with_capacity(specs.len());

    for spec in specs {
        spec.validate()?;
        let key = derive_key(spec)?;
        if let Some(first) = seen.insert(key.clone(), &spec.name) {
            return Err(DobroError::validation(
                &spec.name,
                format!("cache key {} is already used by {}", key, first),
            ));
        }
        keys.push(key);
    }

    Ok(keys)
}

/// Settings for a full install run
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub mode: InstallMode,
    pub jobs: usize,
    /// Staging root; relative paths are resolved against the project directory
    pub staging_dir: PathBuf,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            mode: InstallMode::default(),
            jobs: 1,
            staging_dir: PathBuf::from(DEFAULT_STAGING_DIR),
        }
    }
}

impl RunOptions {
    /// Absolute staging root for `project_dir`
    pub fn staging_root(&self, project_dir: &Path) -> PathBuf {
        if self.staging_dir.is_absolute() {
            self.staging_dir.clone()
        } else {
            project_dir.join(&self.staging_dir)
        }
    }
}

/// Install a whole manifest into `project_dir`
///
/// Creates the staging area and the storage chain, runs every package and
/// removes the staging area whatever the outcome.
pub async fn install_manifest(
    manifest: &Manifest,
    project_dir: &Path,
    options: &RunOptions,
    runner: &CommandRunner,
    installer: Arc<dyn PackageInstaller>,
    sink: SharedSink,
) -> DobroResult<Vec<PackageOutcome>> {
    let chain_sink = sink.clone();
    install_with_chain(manifest, project_dir, options, installer, sink, move |staging| {
        create_chain(&manifest.storage, staging, runner, chain_sink)
    })
    .await
}

/// `install_manifest` with the storage chain built by `build_chain` once the
/// staging area exists
pub async fn install_with_chain<F>(
    manifest: &Manifest,
    project_dir: &Path,
    options: &RunOptions,
    installer: Arc<dyn PackageInstaller>,
    sink: SharedSink,
    build_chain: F,
) -> DobroResult<Vec<PackageOutcome>>
where
    F: FnOnce(&StagingArea) -> DobroResult<StorageChain>,
{
    let root = options.staging_root(project_dir);

    StagingArea::scoped(root, |staging| async move {
        let chain = build_chain(staging.as_ref())?;
        Orchestrator::new(chain, installer, staging, sink)
            .with_mode(options.mode)
            .with_jobs(options.jobs)
            .install_all(&manifest.dependencies, project_dir)
            .await
    })
    .await
}

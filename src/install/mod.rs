//! Package installers
//!
//! An installer materializes one package into its staging directory:
//! - git: clone, optional checkout, strip `.git`
//! - svn: checkout at a revision, strip `.svn`
//! - npm: `npm install` with the staging directory as prefix, peers nested
//!
//! then runs the package's `postinstall` command there.

mod git;
mod registry;
mod svn;

use crate::error::{DobroError, DobroResult};
use crate::manifest::{PackageSource, PackageSpec};
use crate::process::CommandRunner;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;

pub use registry::relocate_peers;

/// Fetches a package into a staging directory
#[async_trait]
pub trait PackageInstaller: Send + Sync {
    /// Install `spec` into `staging`
    ///
    /// Failures are `DobroError::Install` naming the package, except
    /// timeouts, which surface as `DobroError::Timeout` so callers can retry.
    async fn install(&self, staging: &Path, spec: &PackageSpec) -> DobroResult<()>;
}

/// Installer that shells out to git, svn and npm
#[derive(Clone)]
pub struct SourceInstaller {
    runner: CommandRunner,
}

impl SourceInstaller {
    pub fn new(runner: CommandRunner) -> Self {
        Self { runner }
    }

    /// Run the package's postinstall command in `staging`, if it has one
    pub async fn postinstall(&self, staging: &Path, spec: &PackageSpec) -> DobroResult<()> {
        let Some(ref script) = spec.postinstall else {
            return Ok(());
        };

        self.runner
            .shell(script, staging)
            .await
            .map_err(|e| install_error(&spec.name, "postinstall", e))?;
        Ok(())
    }
}

#[async_trait]
impl PackageInstaller for SourceInstaller {
    async fn install(&self, staging: &Path, spec: &PackageSpec) -> DobroResult<()> {
        match &spec.source {
            PackageSource::Git { repo, commit, .. } => {
                git::fetch(&self.runner, staging, spec, repo, commit.as_deref()).await?
            }
            PackageSource::Svn { url, revision, .. } => {
                svn::fetch(&self.runner, staging, spec, url, revision).await?
            }
            PackageSource::Registry { version } => {
                registry::fetch(&self.runner, staging, spec, version).await?
            }
        }

        self.postinstall(staging, spec).await
    }
}

/// Directory a git or svn package is checked out into:
/// `<staging>/<dest>/<name>` or `<staging>/<name>`
pub fn checkout_target(staging: &Path, spec: &PackageSpec) -> PathBuf {
    match spec.dest() {
        Some(dest) => staging.join(dest).join(&spec.name),
        None => staging.join(&spec.name),
    }
}

/// Wrap a failure of `operation` into an install error, keeping timeouts
pub(crate) fn install_error(package: &str, operation: &str, err: DobroError) -> DobroError {
    match err {
        DobroError::Timeout { .. } => err,
        DobroError::CommandExecution { output, .. } => {
            DobroError::install(package, operation, output)
        }
        other => DobroError::install(package, operation, other.to_string()),
    }
}

/// Create the parent of a checkout target
pub(crate) async fn prepare_target(package: &str, target: &Path) -> DobroResult<()> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).await.map_err(|e| {
            DobroError::install(
                package,
                "prepare",
                format!("creating {}: {}", parent.display(), e),
            )
        })?;
    }
    Ok(())
}

/// Remove a VCS metadata directory from a checkout
pub(crate) async fn strip_metadata(package: &str, target: &Path, dir: &str) -> DobroResult<()> {
    let path = target.join(dir);
    match fs::remove_dir_all(&path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(DobroError::install(
            package,
            format!("remove {}", dir),
            format!("{}: {}", path.display(), e),
        )),
    }
}

//! CLI command implementations

pub mod cache;
pub mod config;
pub mod fingerprint;
pub mod init;
pub mod install;
pub mod keys;
pub mod status;

pub use cache::execute as cache;
pub use config::execute as config;
pub use fingerprint::execute as fingerprint;
pub use init::execute as init;
pub use install::execute as install;
pub use keys::execute as keys;
pub use status::execute as status;

use crate::cli::args::ProjectArgs;
use crate::error::{DobroError, DobroResult};
use crate::manifest::Manifest;
use std::path::PathBuf;

/// Project directory and manifest selected by `--project` / `--manifest`
pub(crate) async fn load_project(project: &ProjectArgs) -> DobroResult<(PathBuf, Manifest)> {
    let cwd = std::env::current_dir().map_err(|e| DobroError::io("getting current directory", e))?;
    let project_dir = project.project_dir(&cwd);

    let manifest_path = match &project.manifest {
        Some(path) if path.is_absolute() => path.clone(),
        Some(path) => cwd.join(path),
        None => Manifest::find(&project_dir)?,
    };

    let manifest = Manifest::load(&manifest_path).await?;
    Ok((project_dir, manifest))
}

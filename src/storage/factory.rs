//! Backend factory
//!
//! Builds backend instances from manifest storage entries.

use crate::error::{DobroError, DobroResult};
use crate::events::SharedSink;
use crate::process::CommandRunner;
use crate::staging::StagingArea;
use crate::storage::backend::StorageBackend;
use crate::storage::chain::StorageChain;
use crate::storage::config::StorageConfig;
use crate::storage::local::LocalBackend;
use crate::storage::svn::SvnBackend;
use std::sync::Arc;

/// Create the backend described by `config`
///
/// SVN backends get their scratch space inside the staging area. Every
/// backend reports into `sink`.
pub fn create_backend(
    config: &StorageConfig,
    staging: &StagingArea,
    runner: &CommandRunner,
    sink: &SharedSink,
) -> DobroResult<Arc<dyn StorageBackend>> {
    match config {
        StorageConfig::Local { path, readonly } => {
            if path.as_os_str().is_empty() {
                return Err(DobroError::StorageConfig {
                    backend: config.kind().to_string(),
                    reason: "path is empty".to_string(),
                });
            }
            Ok(Arc::new(LocalBackend::new(
                path.clone(),
                *readonly,
                sink.clone(),
            )))
        }
        StorageConfig::Svn { url, readonly } => {
            if url.trim().is_empty() {
                return Err(DobroError::StorageConfig {
                    backend: config.kind().to_string(),
                    reason: "url is empty".to_string(),
                });
            }
            Ok(Arc::new(SvnBackend::new(
                url.trim(),
                *readonly,
                staging.scratch_dir("svn"),
                runner.clone(),
                sink.clone(),
            )))
        }
    }
}

/// Create a chain from storage entries, preserving their order
pub fn create_chain(
    configs: &[StorageConfig],
    staging: &StagingArea,
    runner: &CommandRunner,
    sink: SharedSink,
) -> DobroResult<StorageChain> {
    let backends = configs
        .iter()
        .map(|config| create_backend(config, staging, runner, &sink))
        .collect::<DobroResult<Vec<_>>>()?;

    Ok(StorageChain::new(backends, sink))
}

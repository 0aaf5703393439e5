//! SVN installer

use crate::error::DobroResult;
use crate::install::{checkout_target, install_error, prepare_target, strip_metadata};
use crate::manifest::PackageSpec;
use crate::process::CommandRunner;
use std::ffi::OsStr;
use std::path::Path;

/// Check `url` out at `revision` into the package's checkout target
pub(super) async fn fetch(
    runner: &CommandRunner,
    staging: &Path,
    spec: &PackageSpec,
    url: &str,
    revision: &str,
) -> DobroResult<()> {
    let target = checkout_target(staging, spec);
    prepare_target(&spec.name, &target).await?;

    let revision = normalize_revision(revision);
    runner
        .run(
            "svn",
            [
                OsStr::new("checkout"),
                OsStr::new("--non-interactive"),
                OsStr::new("--quiet"),
                OsStr::new("-r"),
                OsStr::new(revision),
                OsStr::new(url),
                target.as_os_str(),
            ],
            None,
        )
        .await
        .map_err(|e| install_error(&spec.name, "svn checkout", e))?;

    strip_metadata(&spec.name, &target, ".svn").await
}

/// `r1234` and `1234` name the same revision
fn normalize_revision(revision: &str) -> &str {
    revision
        .strip_prefix('r')
        .filter(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()))
        .unwrap_or(revision)
}

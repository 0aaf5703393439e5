//! npm registry installer
//!
//! `npm --prefix <staging> install <name>@<version>` leaves the package and
//! any hoisted peers side by side under `<staging>/node_modules/`. Peers are
//! then moved under the package's own `node_modules/` so the cached artifact
//! only contains `node_modules/<name>`.

use crate::error::{DobroError, DobroResult};
use crate::install::install_error;
use crate::manifest::PackageSpec;
use crate::process::CommandRunner;
use std::ffi::OsStr;
use std::path::Path;
use tokio::fs;
use tracing::debug;

/// Files npm writes to the prefix root that aren't part of the artifact
const PREFIX_LEFTOVERS: &[&str] = &["package.json", "package-lock.json"];

pub(super) async fn fetch(
    runner: &CommandRunner,
    staging: &Path,
    spec: &PackageSpec,
    version: &str,
) -> DobroResult<()> {
    let modules = staging.join("node_modules");
    fs::create_dir_all(&modules).await.map_err(|e| {
        DobroError::install(
            &spec.name,
            "prepare",
            format!("creating {}: {}", modules.display(), e),
        )
    })?;

    let requirement = format!("{}@{}", spec.name, version);
    runner
        .run(
            "npm",
            [
                OsStr::new("--prefix"),
                staging.as_os_str(),
                OsStr::new("install"),
                OsStr::new("--no-audit"),
                OsStr::new("--no-fund"),
                OsStr::new(&requirement),
            ],
            None,
        )
        .await
        .map_err(|e| install_error(&spec.name, "npm install", e))?;

    relocate_peers(staging, &spec.name)
        .await
        .map_err(|e| install_error(&spec.name, "relocate peers", e))?;

    for leftover in PREFIX_LEFTOVERS {
        match fs::remove_file(staging.join(leftover)).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(DobroError::install(
                    &spec.name,
                    "cleanup",
                    format!("removing {}: {}", leftover, e),
                ))
            }
        }
    }

    Ok(())
}

/// Move every top-level module other than `package` under
/// `node_modules/<package>/node_modules/`
///
/// Hidden entries (`.bin`, `.package-lock.json`) are left alone. Scoped
/// modules keep their scope directory.
pub async fn relocate_peers(staging: &Path, package: &str) -> DobroResult<()> {
    let modules = staging.join("node_modules");
    let nested = modules.join(package).join("node_modules");

    for entry in read_names(&modules).await? {
        if entry.starts_with('.') {
            continue;
        }

        if entry.starts_with('@') {
            let scope_dir = modules.join(&entry);
            for sub in read_names(&scope_dir).await? {
                let qualified = format!("{}/{}", entry, sub);
                if qualified == package {
                    continue;
                }
                move_module(&scope_dir.join(&sub), &nested.join(&entry).join(&sub)).await?;
            }
            if read_names(&scope_dir).await?.is_empty() {
                remove_dir(&scope_dir).await?;
            }
        } else if entry != package {
            move_module(&modules.join(&entry), &nested.join(&entry)).await?;
        }
    }

    Ok(())
}

async fn read_names(dir: &Path) -> DobroResult<Vec<String>> {
    let mut names = Vec::new();
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(names),
        Err(e) => return Err(DobroError::io(format!("reading {}", dir.display()), e)),
    };

    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| DobroError::io(format!("reading {}", dir.display()), e))?
    {
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    names.sort();
    Ok(names)
}

async fn move_module(from: &Path, to: &Path) -> DobroResult<()> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| DobroError::io(format!("creating directory {}", parent.display()), e))?;
    }
    if fs::symlink_metadata(to).await.is_ok() {
        remove_dir(to).await?;
    }

    fs::rename(from, to).await.map_err(|e| {
        DobroError::io(format!("moving {} to {}", from.display(), to.display()), e)
    })?;
    debug!("Moved {} to {}", from.display(), to.display());
    Ok(())
}

async fn remove_dir(path: &Path) -> DobroResult<()> {
    fs::remove_dir_all(path)
        .await
        .map_err(|e| DobroError::io(format!("removing {}", path.display()), e))
}

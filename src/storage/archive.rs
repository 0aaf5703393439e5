//! Tar packing and unpacking for cached artifacts

use crate::error::{DobroError, DobroResult};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Component, Path};
use tar::{Archive, Builder, HeaderMode};
use walkdir::WalkDir;

/// Pack the contents of `src` (not `src` itself) into a tar file at `tar_path`
pub async fn pack_dir(src: &Path, tar_path: &Path) -> DobroResult<()> {
    let src = src.to_path_buf();
    let tar_path = tar_path.to_path_buf();

    tokio::task::spawn_blocking(move || pack_dir_blocking(&src, &tar_path))
        .await
        .map_err(|e| DobroError::Internal(format!("archive task failed: {e}")))?
}

/// Unpack `tar_path` into `dest`
///
/// Ownership and permission bits recorded in the archive are not restored;
/// files get the process umask.
pub async fn unpack(tar_path: &Path, dest: &Path) -> DobroResult<()> {
    let tar_path = tar_path.to_path_buf();
    let dest = dest.to_path_buf();

    tokio::task::spawn_blocking(move || unpack_blocking(&tar_path, &dest))
        .await
        .map_err(|e| DobroError::Internal(format!("extract task failed: {e}")))?
}

fn pack_dir_blocking(src: &Path, tar_path: &Path) -> DobroResult<()> {
    let context = |what: &str| format!("{} {}", what, tar_path.display());

    let file = File::create(tar_path).map_err(|e| DobroError::io(context("creating"), e))?;
    let mut builder = Builder::new(BufWriter::new(file));
    builder.mode(HeaderMode::Complete);
    builder.follow_symlinks(false);

    for entry in WalkDir::new(src)
        .follow_links(false)
        .sort_by(|a, b| a.file_name().cmp(b.file_name()))
    {
        let entry = entry.map_err(|e| {
            DobroError::Io {
                context: format!("walking {}", src.display()),
                source: e.into(),
            }
        })?;

        let rel_path = entry
            .path()
            .strip_prefix(src)
            .map_err(|_| DobroError::Internal(format!("{} escaped {}", entry.path().display(), src.display())))?;

        // Skip root itself
        if rel_path.as_os_str().is_empty() {
            continue;
        }

        builder
            .append_path_with_name(entry.path(), rel_path)
            .map_err(|e| DobroError::io(format!("archiving {}", entry.path().display()), e))?;
    }

    let writer = builder
        .into_inner()
        .map_err(|e| DobroError::io(context("finishing"), e))?;
    writer
        .into_inner()
        .map_err(|e| DobroError::io(context("flushing"), e.into_error()))?
        .sync_all()
        .map_err(|e| DobroError::io(context("syncing"), e))?;

    Ok(())
}

fn unpack_blocking(tar_path: &Path, dest: &Path) -> DobroResult<()> {
    let file = File::open(tar_path)
        .map_err(|e| DobroError::io(format!("opening {}", tar_path.display()), e))?;
    std::fs::create_dir_all(dest)
        .map_err(|e| DobroError::io(format!("creating directory {}", dest.display()), e))?;

    let mut archive = Archive::new(file);
    archive.set_preserve_permissions(false);
    archive.set_preserve_ownerships(false);
    archive.set_preserve_mtime(true);
    archive.set_unpack_xattrs(false);
    archive.set_overwrite(true);

    let read_err = |e| DobroError::io(format!("reading {}", tar_path.display()), e);

    for entry in archive.entries().map_err(read_err)? {
        let mut entry = entry.map_err(read_err)?;
        let path = entry.path().map_err(read_err)?.into_owned();

        if path
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)))
        {
            return Err(DobroError::Internal(format!(
                "archive {} contains unsafe path {}",
                tar_path.display(),
                path.display()
            )));
        }

        entry
            .unpack_in(dest)
            .map_err(|e| DobroError::io(format!("extracting {}", path.display()), e))?;
    }

    Ok(())
}

//! Merge a staged package tree into the project directory

use crate::error::{DobroError, DobroResult};
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

/// Copy the contents of `src` into `dest`, overwriting files that already
/// exist and leaving unrelated project files untouched
pub async fn copy_tree(src: &Path, dest: &Path) -> DobroResult<()> {
    let src = src.to_path_buf();
    let dest = dest.to_path_buf();

    tokio::task::spawn_blocking(move || copy_tree_blocking(&src, &dest))
        .await
        .map_err(|e| DobroError::Internal(format!("copy task failed: {e}")))?
}

fn copy_tree_blocking(src: &Path, dest: &Path) -> DobroResult<()> {
    fs::create_dir_all(dest)
        .map_err(|e| DobroError::io(format!("creating directory {}", dest.display()), e))?;

    for entry in WalkDir::new(src)
        .min_depth(1)
        .follow_links(false)
        .sort_by(|a, b| a.file_name().cmp(b.file_name()))
    {
        let entry = entry.map_err(|e| DobroError::Io {
            context: format!("walking {}", src.display()),
            source: e.into(),
        })?;
        let rel = entry
            .path()
            .strip_prefix(src)
            .map_err(|_| DobroError::Internal(format!("{} escaped {}", entry.path().display(), src.display())))?;
        let target = dest.join(rel);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            if target.is_file() || target.is_symlink() {
                remove_existing(&target)?;
            }
            fs::create_dir_all(&target)
                .map_err(|e| DobroError::io(format!("creating directory {}", target.display()), e))?;
        } else if file_type.is_symlink() {
            if fs::symlink_metadata(&target).is_ok() {
                remove_existing(&target)?;
            }
            copy_symlink(entry.path(), &target)?;
        } else {
            // Never write through an existing link
            if target.is_dir() || target.is_symlink() {
                remove_existing(&target)?;
            }
            fs::copy(entry.path(), &target).map_err(|e| {
                DobroError::io(
                    format!("copying {} to {}", entry.path().display(), target.display()),
                    e,
                )
            })?;
        }
    }

    Ok(())
}

fn remove_existing(path: &Path) -> DobroResult<()> {
    let meta = fs::symlink_metadata(path)
        .map_err(|e| DobroError::io(format!("inspecting {}", path.display()), e))?;
    let result = if meta.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    result.map_err(|e| DobroError::io(format!("replacing {}", path.display()), e))
}

#[cfg(unix)]
fn copy_symlink(src: &Path, target: &Path) -> DobroResult<()> {
    let link = fs::read_link(src)
        .map_err(|e| DobroError::io(format!("reading link {}", src.display()), e))?;
    std::os::unix::fs::symlink(&link, target)
        .map_err(|e| DobroError::io(format!("creating link {}", target.display()), e))
}

#[cfg(not(unix))]
fn copy_symlink(src: &Path, target: &Path) -> DobroResult<()> {
    fs::copy(src, target)
        .map(|_| ())
        .map_err(|e| DobroError::io(format!("copying {}", src.display()), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn merges_into_existing_project() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("stage");
        let dest = temp.path().join("project");
        std::fs::create_dir_all(src.join("node_modules/a")).unwrap();
        std::fs::write(src.join("node_modules/a/index.js"), "new").unwrap();
        std::fs::create_dir_all(dest.join("node_modules/a")).unwrap();
        std::fs::write(dest.join("node_modules/a/index.js"), "old").unwrap();
        std::fs::write(dest.join("README.md"), "mine").unwrap();

        copy_tree(&src, &dest).await.unwrap();

        assert_eq!(
            std::fs::read_to_string(dest.join("node_modules/a/index.js")).unwrap(),
            "new"
        );
        assert_eq!(std::fs::read_to_string(dest.join("README.md")).unwrap(), "mine");
    }

    #[tokio::test]
    async fn file_replaces_directory() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("stage");
        let dest = temp.path().join("project");
        std::fs::create_dir_all(&src).unwrap();
        std::fs::write(src.join("lib"), "file now").unwrap();
        std::fs::create_dir_all(dest.join("lib/old")).unwrap();

        copy_tree(&src, &dest).await.unwrap();
        assert_eq!(std::fs::read_to_string(dest.join("lib")).unwrap(), "file now");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn symlinks_are_recreated() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("stage");
        let dest = temp.path().join("project");
        std::fs::create_dir_all(src.join("bin")).unwrap();
        std::fs::write(src.join("tool.js"), "x").unwrap();
        std::os::unix::fs::symlink("../tool.js", src.join("bin/tool")).unwrap();

        copy_tree(&src, &dest).await.unwrap();

        let link = std::fs::read_link(dest.join("bin/tool")).unwrap();
        assert_eq!(link, Path::new("../tool.js"));
    }
}

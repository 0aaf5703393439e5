//! Git installer

use crate::error::{DobroError, DobroResult};
use crate::install::{checkout_target, install_error, prepare_target, strip_metadata};
use crate::manifest::PackageSpec;
use crate::process::CommandRunner;
use std::ffi::OsStr;
use std::path::Path;
use tracing::debug;

/// Clone `repo` into the package's checkout target and pin it to `commit`
pub(super) async fn fetch(
    runner: &CommandRunner,
    staging: &Path,
    spec: &PackageSpec,
    repo: &str,
    commit: Option<&str>,
) -> DobroResult<()> {
    if let Some(commit) = commit.filter(|c| c.starts_with('-')) {
        return Err(DobroError::validation(
            &spec.name,
            format!("commit '{}' must not start with '-'", commit),
        ));
    }

    let target = checkout_target(staging, spec);
    prepare_target(&spec.name, &target).await?;

    runner
        .run(
            "git",
            [
                OsStr::new("clone"),
                OsStr::new("--quiet"),
                OsStr::new("--"),
                OsStr::new(repo),
                target.as_os_str(),
            ],
            None,
        )
        .await
        .map_err(|e| install_error(&spec.name, "git clone", e))?;

    if let Some(commit) = commit {
        runner
            .run(
                "git",
                ["-c", "advice.detachedHead=false", "checkout", "--quiet", commit],
                Some(target.as_path()),
            )
            .await
            .map_err(|e| install_error(&spec.name, "git checkout", e))?;
    }

    strip_metadata(&spec.name, &target, ".git").await?;
    debug!("Cloned {} into {}", spec.name, target.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::MemorySink;
    use crate::process::tool_available;
    use std::process::Command;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn git(cwd: &Path, args: &[&str]) -> String {
        let output = Command::new("git")
            .args(args)
            .current_dir(cwd)
            .env("GIT_AUTHOR_NAME", "dobro")
            .env("GIT_AUTHOR_EMAIL", "dobro@example.com")
            .env("GIT_COMMITTER_NAME", "dobro")
            .env("GIT_COMMITTER_EMAIL", "dobro@example.com")
            .output()
            .unwrap();
        assert!(output.status.success(), "git {:?} failed", args);
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    }

    /// Repository with two commits; returns (path, first commit)
    fn fixture_repo(root: &Path) -> (std::path::PathBuf, String) {
        let repo = root.join("origin");
        std::fs::create_dir_all(&repo).unwrap();
        git(&repo, &["init", "--quiet"]);
        std::fs::write(repo.join("VERSION"), "1\n").unwrap();
        git(&repo, &["add", "."]);
        git(&repo, &["commit", "--quiet", "-m", "one"]);
        let first = git(&repo, &["rev-parse", "HEAD"]);
        std::fs::write(repo.join("VERSION"), "2\n").unwrap();
        git(&repo, &["commit", "--quiet", "-am", "two"]);
        (repo, first)
    }

    #[tokio::test]
    async fn clones_pinned_commit_without_metadata() {
        if !tool_available("git", &["--version"]).await {
            eprintln!("git not available, skipping");
            return;
        }

        let temp = TempDir::new().unwrap();
        let (repo, first) = fixture_repo(temp.path());
        let staging = temp.path().join("stage");
        std::fs::create_dir_all(&staging).unwrap();

        let sink = Arc::new(MemorySink::new());
        let runner = CommandRunner::new(None, sink.clone());
        let repo_url = repo.display().to_string();
        let spec = PackageSpec::git("lib", &repo_url, Some(first.as_str())).with_dest("vendor");

        fetch(&runner, &staging, &spec, &repo_url, Some(first.as_str()))
            .await
            .unwrap();

        let target = staging.join("vendor/lib");
        assert_eq!(std::fs::read_to_string(target.join("VERSION")).unwrap(), "1\n");
        assert!(!target.join(".git").exists());
        assert_eq!(
            sink.count(|e| matches!(e, crate::events::PipelineEvent::Command { .. })),
            2
        );
    }

    #[tokio::test]
    async fn bad_repository_is_install_error() {
        if !tool_available("git", &["--version"]).await {
            return;
        }

        let temp = TempDir::new().unwrap();
        let runner = CommandRunner::new(None, Arc::new(MemorySink::new()));
        let missing = temp.path().join("missing").display().to_string();
        let spec = PackageSpec::git("lib", &missing, None);

        let err = fetch(&runner, temp.path(), &spec, &missing, None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "InstallError");
        assert_eq!(err.package(), Some("lib"));
    }

    #[tokio::test]
    async fn repo_is_never_parsed_as_option() {
        let temp = TempDir::new().unwrap();
        let sink = Arc::new(MemorySink::new());
        let runner = CommandRunner::new(None, sink.clone());
        let repo = "--upload-pack=touch owned";
        let spec = PackageSpec::git("lib", repo, None);

        assert!(fetch(&runner, temp.path(), &spec, repo, None).await.is_err());

        let commands: Vec<String> = sink
            .events()
            .into_iter()
            .filter_map(|e| match e {
                crate::events::PipelineEvent::Command { command } => Some(command),
                _ => None,
            })
            .collect();
        assert_eq!(commands.len(), 1);
        assert!(commands[0].starts_with("git clone --quiet -- --upload-pack"));
        assert!(!temp.path().join("owned").exists());
    }

    #[tokio::test]
    async fn dash_commit_is_rejected_before_cloning() {
        let temp = TempDir::new().unwrap();
        let sink = Arc::new(MemorySink::new());
        let runner = CommandRunner::new(None, sink.clone());
        let spec = PackageSpec::git("lib", "repo", Some("--orphan"));

        let err = fetch(&runner, temp.path(), &spec, "repo", Some("--orphan"))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "ValidationError");
        assert!(sink.events().is_empty());
    }
}

//! Integration tests for dobro

mod pipeline_tests {
    use async_trait::async_trait;
    use dobro::error::{DobroError, DobroResult};
    use dobro::events::{MemorySink, PipelineEvent, ReadySource};
    use dobro::install::{PackageInstaller, SourceInstaller};
    use dobro::manifest::{Manifest, PackageSpec};
    use dobro::pipeline::{install_manifest, InstallMode, RunOptions};
    use dobro::process::{tool_available, CommandRunner};
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;

    /// Installer that writes `<name>/index.js` and counts invocations
    #[derive(Default)]
    struct CountingInstaller {
        calls: AtomicUsize,
        fail: bool,
    }

    impl CountingInstaller {
        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PackageInstaller for CountingInstaller {
        async fn install(&self, staging: &Path, spec: &PackageSpec) -> DobroResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(DobroError::install(&spec.name, "npm install", "registry down"));
            }
            let dir = staging.join("node_modules").join(&spec.name);
            std::fs::create_dir_all(&dir).unwrap();
            std::fs::write(dir.join("index.js"), format!("// {}", spec.name)).unwrap();
            Ok(())
        }
    }

    fn write_manifest(dir: &Path, body: &str) -> Manifest {
        std::fs::create_dir_all(dir).unwrap();
        let path = dir.join("dobro.json");
        std::fs::write(&path, body).unwrap();
        Manifest::parse(body, &path).unwrap()
    }

    fn registry_manifest(project: &Path, store: &Path) -> Manifest {
        let body = format!(
            r#"{{
                "storage": [{{"type": "local", "path": "{}"}}],
                "dependencies": [
                    {{"name": "left-pad", "version": "1.3.0"}},
                    {{"name": "is-odd", "version": "3.0.1"}}
                ]
            }}"#,
            store.display()
        );
        write_manifest(project, &body)
    }

    fn runner(sink: Arc<MemorySink>) -> CommandRunner {
        CommandRunner::new(None, sink)
    }

    fn staging_root(project: &Path) -> PathBuf {
        RunOptions::default().staging_root(project)
    }

    #[tokio::test]
    async fn second_install_is_served_from_cache() {
        let temp = TempDir::new().unwrap();
        let store = temp.path().join("store");
        let options = RunOptions::default();

        // First checkout builds and fills the cache
        let first = temp.path().join("checkout-a");
        let manifest = registry_manifest(&first, &store);
        let installer = Arc::new(CountingInstaller::default());
        let sink = Arc::new(MemorySink::new());

        let outcomes = install_manifest(
            &manifest,
            &first,
            &options,
            &runner(sink.clone()),
            installer.clone(),
            sink.clone(),
        )
        .await
        .unwrap();

        assert_eq!(installer.calls(), 2);
        assert!(outcomes.iter().all(|o| o.source == ReadySource::Fresh));
        assert_eq!(outcomes[0].name, "left-pad");
        assert_eq!(outcomes[1].name, "is-odd");
        assert!(store.join("left-pad_1.3.0/left-pad_1.3.0.tar").is_file());
        assert!(first.join("node_modules/left-pad/index.js").is_file());

        // Second checkout never runs the installer
        let second = temp.path().join("checkout-b");
        let manifest = registry_manifest(&second, &store);
        let installer = Arc::new(CountingInstaller::default());
        let sink = Arc::new(MemorySink::new());

        let outcomes = install_manifest(
            &manifest,
            &second,
            &options,
            &runner(sink.clone()),
            installer.clone(),
            sink.clone(),
        )
        .await
        .unwrap();

        assert_eq!(installer.calls(), 0);
        assert!(outcomes
            .iter()
            .all(|o| matches!(o.source, ReadySource::Cache { .. })));
        assert_eq!(
            std::fs::read_to_string(second.join("node_modules/is-odd/index.js")).unwrap(),
            "// is-odd"
        );
        assert_eq!(
            sink.count(|e| matches!(e, PipelineEvent::CacheHit { .. })),
            2
        );
        assert!(!staging_root(&second).exists());
    }

    #[tokio::test]
    async fn no_push_leaves_cache_empty() {
        let temp = TempDir::new().unwrap();
        let store = temp.path().join("store");
        let project = temp.path().join("project");
        let manifest = registry_manifest(&project, &store);
        let installer = Arc::new(CountingInstaller::default());
        let sink = Arc::new(MemorySink::new());
        let options = RunOptions {
            mode: InstallMode::NoPush,
            ..RunOptions::default()
        };

        let outcomes = install_manifest(
            &manifest,
            &project,
            &options,
            &runner(sink.clone()),
            installer.clone(),
            sink,
        )
        .await
        .unwrap();

        assert_eq!(installer.calls(), 2);
        assert!(outcomes.iter().all(|o| o.source == ReadySource::Uncached));
        assert!(!store.exists());
    }

    #[tokio::test]
    async fn failed_install_removes_staging() {
        let temp = TempDir::new().unwrap();
        let project = temp.path().join("project");
        let manifest = registry_manifest(&project, &temp.path().join("store"));
        let installer = Arc::new(CountingInstaller {
            fail: true,
            ..CountingInstaller::default()
        });
        let sink = Arc::new(MemorySink::new());

        let err = install_manifest(
            &manifest,
            &project,
            &RunOptions::default(),
            &runner(sink.clone()),
            installer,
            sink.clone(),
        )
        .await
        .unwrap_err();

        assert_eq!(err.kind(), "InstallError");
        assert_eq!(err.package(), Some("left-pad"));
        assert!(!staging_root(&project).exists());
        assert!(!project.join("node_modules").exists());
        assert_eq!(sink.count(|e| matches!(e, PipelineEvent::Failed { .. })), 1);
    }

    #[tokio::test]
    async fn colliding_keys_fail_before_installing() {
        let temp = TempDir::new().unwrap();
        let project = temp.path().join("project");
        let manifest = write_manifest(
            &project,
            r#"{"dependencies": [
                {"type": "svn", "name": "lib", "url": "https://svn.example.com/a", "revision": "7"},
                {"type": "svn", "name": "lib", "url": "https://svn.example.com/b", "revision": "7"}
            ]}"#,
        );
        let installer = Arc::new(CountingInstaller::default());
        let sink = Arc::new(MemorySink::new());

        let err = install_manifest(
            &manifest,
            &project,
            &RunOptions::default(),
            &runner(sink.clone()),
            installer.clone(),
            sink,
        )
        .await
        .unwrap_err();

        assert_eq!(err.kind(), "ValidationError");
        assert_eq!(installer.calls(), 0);
    }

    fn git(cwd: &Path, args: &[&str]) {
        let status = std::process::Command::new("git")
            .args(args)
            .current_dir(cwd)
            .env("GIT_AUTHOR_NAME", "dobro")
            .env("GIT_AUTHOR_EMAIL", "dobro@example.com")
            .env("GIT_COMMITTER_NAME", "dobro")
            .env("GIT_COMMITTER_EMAIL", "dobro@example.com")
            .status()
            .unwrap();
        assert!(status.success(), "git {:?} failed", args);
    }

    #[tokio::test]
    async fn git_package_installs_without_storage() {
        if !tool_available("git", &["--version"]).await {
            eprintln!("git not available, skipping");
            return;
        }

        let temp = TempDir::new().unwrap();
        let origin = temp.path().join("origin");
        std::fs::create_dir_all(&origin).unwrap();
        git(&origin, &["init", "--quiet"]);
        std::fs::write(origin.join("README"), "hello\n").unwrap();
        git(&origin, &["add", "."]);
        git(&origin, &["commit", "--quiet", "-m", "init"]);

        let project = temp.path().join("project");
        let body = format!(
            r#"{{"dependencies": [{{"type": "git", "name": "hello", "repo": "{}", "dest": "vendor"}}]}}"#,
            origin.display()
        );
        let manifest = write_manifest(&project, &body);

        let sink = Arc::new(MemorySink::new());
        let runner = runner(sink.clone());
        let installer = Arc::new(SourceInstaller::new(runner.clone()));

        let outcomes = install_manifest(
            &manifest,
            &project,
            &RunOptions::default(),
            &runner,
            installer,
            sink.clone(),
        )
        .await
        .unwrap();

        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].source, ReadySource::Uncached);
        assert!(outcomes[0].key.as_str().ends_with("_HEAD"));
        assert_eq!(
            std::fs::read_to_string(project.join("vendor/hello/README")).unwrap(),
            "hello\n"
        );
        assert!(!project.join("vendor/hello/.git").exists());
        assert!(!staging_root(&project).exists());
        assert_eq!(
            sink.count(|e| matches!(e, PipelineEvent::VerifySkipped { .. })),
            1
        );
    }
}

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use tempfile::TempDir;

    fn dobro() -> Command {
        cargo_bin_cmd!("dobro")
    }

    fn project_with(body: &str) -> TempDir {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("dobro.json"), body).unwrap();
        temp
    }

    #[test]
    fn help_displays() {
        dobro()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("dependency installer"));
    }

    #[test]
    fn version_displays() {
        dobro()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("dobro"));
    }

    #[test]
    fn keys_plain_prints_one_key_per_package() {
        let project = project_with(
            r#"{"dependencies": [
                {"name": "left-pad", "version": "1.3.0"},
                {"type": "svn", "name": "legacy", "url": "https://svn.example.com/legacy", "revision": "r42"}
            ]}"#,
        );

        dobro()
            .args(["keys", "--format", "plain", "--project"])
            .arg(project.path())
            .assert()
            .success()
            .stdout(predicate::str::contains("left-pad_1.3.0"))
            .stdout(predicate::str::contains("legacy_"));
    }

    #[test]
    fn keys_rejects_loose_version() {
        let project = project_with(r#"{"dependencies": [{"name": "left-pad", "version": "^1.3.0"}]}"#);

        dobro()
            .args(["keys", "--project"])
            .arg(project.path())
            .assert()
            .failure()
            .stderr(predicate::str::contains("Error:"))
            .stderr(predicate::str::contains("ValidationError"));
    }

    #[test]
    fn install_rejects_path_like_revision() {
        let project = project_with(
            r#"{"dependencies": [{"type": "svn", "name": "old", "url": "u", "revision": "1/../.."}]}"#,
        );
        std::fs::write(project.path().join("main.c"), "int main;").unwrap();

        dobro()
            .args(["install", "--local", "--project"])
            .arg(project.path())
            .assert()
            .failure()
            .stderr(predicate::str::contains("ValidationError"))
            .stderr(predicate::str::contains("old"));

        assert!(project.path().join("main.c").is_file());
    }

    #[test]
    fn fingerprint_is_stable_across_order() {
        let a = project_with(
            r#"{"dependencies": [{"name": "a", "version": "1.0.0"}, {"name": "b", "version": "2.0.0"}]}"#,
        );
        let b = project_with(
            r#"{"dependencies": [{"name": "b", "version": "2.0.0"}, {"name": "a", "version": "1.0.0"}]}"#,
        );

        let first = dobro()
            .args(["fingerprint", "--project"])
            .arg(a.path())
            .output()
            .unwrap();
        let second = dobro()
            .args(["fingerprint", "--project"])
            .arg(b.path())
            .output()
            .unwrap();

        assert!(first.status.success());
        assert_eq!(first.stdout, second.stdout);
        assert_eq!(String::from_utf8_lossy(&first.stdout).trim().len(), 64);
    }

    #[test]
    fn missing_manifest_fails_with_hint() {
        let temp = TempDir::new().unwrap();

        dobro()
            .args(["install", "--project"])
            .arg(temp.path())
            .assert()
            .failure()
            .stderr(predicate::str::contains("Manifest not found"))
            .stderr(predicate::str::contains("dobro init"));
    }

    #[test]
    fn init_then_refuse_overwrite() {
        let temp = TempDir::new().unwrap();

        dobro()
            .args(["init", "--path"])
            .arg(temp.path())
            .assert()
            .success();
        assert!(temp.path().join("dobro.json").is_file());

        dobro()
            .args(["init", "--path"])
            .arg(temp.path())
            .assert()
            .failure()
            .stderr(predicate::str::contains("already exists"));
    }

    #[test]
    fn install_empty_manifest_succeeds() {
        let project = project_with(r#"{"dependencies": []}"#);

        dobro()
            .args(["install", "--project"])
            .arg(project.path())
            .assert()
            .success()
            .stdout(predicate::str::contains("No dependencies"));
    }

    #[test]
    fn cache_list_without_local_storage() {
        let project = project_with(r#"{"dependencies": []}"#);

        dobro()
            .args(["cache", "list", "--project"])
            .arg(project.path())
            .assert()
            .success()
            .stdout(predicate::str::contains("No local storage"));
    }

    #[test]
    fn config_path() {
        let temp = TempDir::new().unwrap();
        let config = temp.path().join("config.toml");

        dobro()
            .args(["config", "path"])
            .env("DOBRO_CONFIG", &config)
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show() {
        let temp = TempDir::new().unwrap();

        dobro()
            .args(["config", "show"])
            .env("DOBRO_CONFIG", temp.path().join("config.toml"))
            .assert()
            .success()
            .stdout(predicate::str::contains("[install]"));
    }

    #[test]
    fn status_runs() {
        // Missing tools are reported, not fatal
        dobro()
            .arg("status")
            .assert()
            .success()
            .stdout(predicate::str::contains("Tools"));
    }
}

//! Install command - install the manifest's dependencies into the project

use crate::cache::bundle_fingerprint;
use crate::cli::args::InstallArgs;
use crate::cli::commands::load_project;
use crate::config::Config;
use crate::error::DobroResult;
use crate::events::{FanoutSink, ReadySource, SharedSink, TracingSink};
use crate::install::SourceInstaller;
use crate::pipeline::{self, InstallMode, PackageOutcome, RunOptions};
use crate::process::CommandRunner;
use crate::ui::{self, InstallProgress, UiContext};
use std::sync::Arc;
use tracing::debug;

/// Execute the install command
pub async fn execute(args: InstallArgs, config: &Config) -> DobroResult<()> {
    let ctx = UiContext::detect().with_detail(config.general.verbose);
    let (project_dir, manifest) = load_project(&args.project).await?;
    let options = run_options(&args, config);

    debug!(
        "Installing into {} with {:?}, {} job(s)",
        project_dir.display(),
        options.mode,
        options.jobs
    );

    ui::intro(&ctx, &format!("dobro install ({})", manifest.path.display()));
    if manifest.dependencies.is_empty() {
        ui::outro_warn(&ctx, "No dependencies listed");
        return Ok(());
    }

    let progress = Arc::new(InstallProgress::new(&ctx));
    let sinks: Vec<SharedSink> = vec![Arc::new(TracingSink), progress.clone()];
    let sink: SharedSink = Arc::new(FanoutSink::new(sinks));

    let runner = CommandRunner::new(config.timeouts.command_timeout(), sink.clone());
    let installer = Arc::new(SourceInstaller::new(runner.clone()));

    let result = pipeline::install_manifest(
        &manifest,
        &project_dir,
        &options,
        &runner,
        installer,
        sink,
    )
    .await;
    progress.finish();
    let outcomes = result?;

    ui::outro_success(&ctx, &summary(&outcomes));
    ui::remark(
        &ctx,
        &format!("fingerprint {}", bundle_fingerprint(&manifest.dependencies)),
    );

    Ok(())
}

/// Flags override the config file
fn run_options(args: &InstallArgs, config: &Config) -> RunOptions {
    let no_push = args.no_push || config.install.no_push;
    let staging_dir = if config.install.staging_dir.as_os_str().is_empty() {
        RunOptions::default().staging_dir
    } else {
        config.install.staging_dir.clone()
    };

    RunOptions {
        mode: InstallMode::from_flags(args.local, no_push),
        jobs: args.jobs.unwrap_or(config.install.jobs).max(1),
        staging_dir,
    }
}

fn summary(outcomes: &[PackageOutcome]) -> String {
    let cached = outcomes
        .iter()
        .filter(|o| matches!(o.source, ReadySource::Cache { .. }))
        .count();
    let fresh = outcomes
        .iter()
        .filter(|o| o.source == ReadySource::Fresh)
        .count();
    let uncached = outcomes.len() - cached - fresh;

    format!(
        "Installed {} package(s): {} from cache, {} built and cached, {} built only",
        outcomes.len(),
        cached,
        fresh,
        uncached
    )
}

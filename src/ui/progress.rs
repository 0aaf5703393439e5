//! Progress indicators with CI fallback

use super::context::UiContext;
use super::output::Tone;
use crate::events::{EventSink, PipelineEvent, ReadySource};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Install progress shown while the pipeline runs.
///
/// Receives pipeline events as a sink. Shows an indicatif bar counting
/// ready packages in interactive mode, plain lines in CI.
pub struct InstallProgress {
    bar: Option<ProgressBar>,
    detailed: bool,
}

impl InstallProgress {
    pub fn new(ctx: &UiContext) -> Self {
        let bar = if ctx.use_fancy_output() {
            let bar = ProgressBar::new(0);
            let template = ProgressStyle::default_bar()
                .template(
                    "  {spinner:.cyan} Installing  {bar:20.cyan/dim} {pos}/{len} {msg:.dim}  {elapsed:.dim}",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar());
            bar.set_style(
                template
                    .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
                    .progress_chars("━╸─"),
            );
            bar.enable_steady_tick(std::time::Duration::from_millis(120));
            Some(bar)
        } else {
            None
        };

        Self {
            bar,
            detailed: ctx.detailed(),
        }
    }

    /// Finish and clear the progress bar
    pub fn finish(&self) {
        if let Some(ref bar) = self.bar {
            bar.disable_steady_tick();
            bar.finish_and_clear();
        }
    }

    fn line(&self, text: String) {
        match self.bar {
            Some(ref bar) => bar.println(text),
            None => println!("{}", text),
        }
    }

    fn message(&self, text: String) {
        if let Some(ref bar) = self.bar {
            bar.set_message(text);
        }
    }
}

impl EventSink for InstallProgress {
    fn emit(&self, event: PipelineEvent) {
        match &event {
            PipelineEvent::RunStarted { packages, .. } => {
                if let Some(ref bar) = self.bar {
                    bar.set_length(*packages as u64);
                }
            }
            PipelineEvent::PackageStarted { package, .. } => self.message(package.clone()),
            PipelineEvent::Installing { package, kind } => {
                self.message(format!("{} ({})", package, kind))
            }
            PipelineEvent::Pushing { package, .. } => self.message(format!("pushing {}", package)),
            PipelineEvent::Ready {
                package, source, ..
            } => {
                if let Some(ref bar) = self.bar {
                    bar.inc(1);
                }
                let origin = match source {
                    ReadySource::Cache { backend } => format!("cache {}", backend),
                    ReadySource::Fresh => "installed, cached".to_string(),
                    ReadySource::Uncached => "installed".to_string(),
                };
                self.line(format!(
                    "  {} {} {}",
                    Tone::Ok.tag(),
                    package,
                    style(format!("({})", origin)).dim()
                ));
            }
            PipelineEvent::Failed { .. } => {
                self.line(format!("  {} {}", Tone::Fail.tag(), event));
            }
            PipelineEvent::Warning { .. }
            | PipelineEvent::PushFailed { .. }
            | PipelineEvent::BackendError { .. }
            | PipelineEvent::InstallRetry { .. } => {
                self.line(format!("  {} {}", Tone::Warn.tag(), event));
            }
            _ if self.detailed => self.line(format!("    {}", style(&event).dim())),
            _ => {}
        }
    }
}

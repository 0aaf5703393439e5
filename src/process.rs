//! Subprocess execution
//!
//! Every external tool (git, svn, npm, postinstall hooks) runs through
//! `CommandRunner`, which logs the command line as an event, applies the
//! configured timeout and turns non-zero exits into errors carrying the tail
//! of the tool's output.

use crate::error::{DobroError, DobroResult};
use crate::events::{PipelineEvent, SharedSink};
use std::ffi::{OsStr, OsString};
use std::path::Path;
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Max number of output lines to include in error messages.
const ERROR_TAIL_LINES: usize = 50;

/// Extract the useful tail of command output for error diagnostics.
///
/// Combines stdout and stderr, then returns the last `ERROR_TAIL_LINES`
/// lines so error messages are actionable without being overwhelming.
pub fn error_output(stdout: &str, stderr: &str) -> String {
    let lines: Vec<&str> = stdout.lines().chain(stderr.lines()).collect();
    let total = lines.len();
    let tail: Vec<&str> = if total > ERROR_TAIL_LINES {
        lines[total - ERROR_TAIL_LINES..].to_vec()
    } else {
        lines
    };
    tail.join("\n")
}

/// Runs external commands with a shared timeout and event sink
#[derive(Clone)]
pub struct CommandRunner {
    timeout: Option<Duration>,
    sink: SharedSink,
}

impl CommandRunner {
    /// Create a runner; `None` disables the timeout
    pub fn new(timeout: Option<Duration>, sink: SharedSink) -> Self {
        Self { timeout, sink }
    }

    /// Configured per-command timeout
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Run `program` with `args`, failing on non-zero exit
    pub async fn run<I, S>(&self, program: &str, args: I, cwd: Option<&Path>) -> DobroResult<Output>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let args: Vec<OsString> = args.into_iter().map(|a| a.as_ref().to_os_string()).collect();
        let shown = display_command(program, &args);

        let mut command = Command::new(program);
        command.args(&args);
        if let Some(dir) = cwd {
            command.current_dir(dir);
        }

        self.execute(command, shown).await
    }

    /// Run a shell script with `sh -c` in `cwd`
    pub async fn shell(&self, script: &str, cwd: &Path) -> DobroResult<Output> {
        let mut command = Command::new("sh");
        command.arg("-c").arg(script).current_dir(cwd);

        self.execute(command, script.to_string()).await
    }

    async fn execute(&self, mut command: Command, shown: String) -> DobroResult<Output> {
        self.sink.emit(PipelineEvent::Command {
            command: shown.clone(),
        });

        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, command.output())
                .await
                .map_err(|_| DobroError::Timeout {
                    command: shown.clone(),
                    secs: limit.as_secs(),
                })?,
            None => command.output().await,
        }
        .map_err(|e| DobroError::command_failed(shown.clone(), e))?;

        if output.status.success() {
            debug!("Command succeeded: {}", shown);
            Ok(output)
        } else {
            let stdout = String::from_utf8_lossy(&output.stdout);
            let stderr = String::from_utf8_lossy(&output.stderr);
            let mut diagnostic = error_output(&stdout, &stderr);
            if diagnostic.is_empty() {
                diagnostic = format!("exited with {}", output.status);
            }
            Err(DobroError::command_exec(shown, diagnostic))
        }
    }
}

fn display_command(program: &str, args: &[OsString]) -> String {
    let mut parts = vec![program.to_string()];
    parts.extend(args.iter().map(|a| a.to_string_lossy().into_owned()));
    parts.join(" ")
}

/// Check whether `program args...` runs and exits successfully
pub async fn tool_available(program: &str, args: &[&str]) -> bool {
    Command::new(program)
        .args(args)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .map(|s| s.success())
        .unwrap_or(false)
}

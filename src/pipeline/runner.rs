use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::process::Command;
use tracing::{debug, warn};

use super::descriptor::JobDescriptor;

/// How one pipeline invocation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    Completed,
    Failed { detail: String },
    TimedOut,
}

/// Outcome of one pipeline invocation. Says nothing about artifacts; the
/// collector judges those.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub status: RunStatus,
    pub duration: Duration,
}

impl RunOutcome {
    pub fn ok(&self) -> bool {
        matches!(self.status, RunStatus::Completed)
    }
}

/// Invokes the external AI pipeline, one process per descriptor.
///
/// The descriptor artifact path is appended as the final argument. No retry
/// here; re-running a project is the retry mechanism.
#[derive(Debug, Clone)]
pub struct PipelineRunner {
    program: PathBuf,
    args: Vec<String>,
    timeout: Duration,
}

impl PipelineRunner {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }

    /// Split a configured command line into program + fixed arguments.
    /// Returns `None` for an empty command line.
    pub fn from_command_line(command_line: &str, timeout: Duration) -> Option<Self> {
        let mut parts = command_line.split_whitespace();
        let program = parts.next()?;
        Some(Self::new(
            program,
            parts.map(str::to_string).collect(),
            timeout,
        ))
    }

    /// Run the pipeline for one descriptor and wait for it to finish.
    ///
    /// A process that overruns the timeout is killed, never left running.
    /// Spawn errors surface as `Failed`, not as a panic or `Err`.
    pub async fn run(&self, descriptor: &JobDescriptor) -> RunOutcome {
        let start = Instant::now();

        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .arg(descriptor.artifact_path())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        debug!(
            program = %self.program.display(),
            artifact = %descriptor.artifact_path().display(),
            "spawning pipeline process"
        );

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                return RunOutcome {
                    status: RunStatus::Failed {
                        detail: format!("failed to spawn {}: {e}", self.program.display()),
                    },
                    duration: start.elapsed(),
                };
            }
        };

        let status = match tokio::time::timeout(self.timeout, child.wait()).await {
            Ok(Ok(exit)) if exit.success() => RunStatus::Completed,
            Ok(Ok(exit)) => RunStatus::Failed {
                detail: format!("pipeline exited with {exit}"),
            },
            Ok(Err(e)) => RunStatus::Failed {
                detail: format!("wait on pipeline process failed: {e}"),
            },
            Err(_) => {
                if let Err(e) = child.start_kill() {
                    warn!(error = %e, "could not kill timed-out pipeline process");
                }
                let _ = child.wait().await;
                RunStatus::TimedOut
            }
        };

        RunOutcome {
            status,
            duration: start.elapsed(),
        }
    }
}

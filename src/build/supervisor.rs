//! Build supervision.
//!
//! Runs the external build command to completion and reports the outcome.
//! Failures are logged and returned, never escalated.

use std::future::Future;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::process::Command;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::Instrument;

use super::command::BuildCommand;
use crate::error::BuildError;

/// Outcome of one build invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildResult {
    /// `Ok` when the command exited with status 0.
    pub outcome: std::result::Result<(), BuildError>,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
    /// Wall-clock time the build took.
    pub duration: Duration,
}

impl BuildResult {
    /// A successful build.
    #[must_use]
    pub fn success(stdout: impl Into<String>, stderr: impl Into<String>, duration: Duration) -> Self {
        Self {
            outcome: Ok(()),
            stdout: stdout.into(),
            stderr: stderr.into(),
            duration,
        }
    }

    /// A failed build.
    #[must_use]
    pub fn failure(
        error: BuildError,
        stdout: impl Into<String>,
        stderr: impl Into<String>,
        duration: Duration,
    ) -> Self {
        Self {
            outcome: Err(error),
            stdout: stdout.into(),
            stderr: stderr.into(),
            duration,
        }
    }

    /// Whether the build succeeded.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Something that can perform one complete build.
pub trait BuildRunner: Send + Sync + 'static {
    /// Run the build to completion.
    fn run(&self) -> impl Future<Output = BuildResult> + Send;
}

/// Runs a [`BuildCommand`] as a child process.
#[derive(Debug, Clone)]
pub struct CommandRunner {
    command: BuildCommand,
}

impl CommandRunner {
    /// Create a runner for `command`.
    #[must_use]
    pub const fn new(command: BuildCommand) -> Self {
        Self { command }
    }

    /// The command this runner executes.
    #[must_use]
    pub const fn command(&self) -> &BuildCommand {
        &self.command
    }
}

impl BuildRunner for CommandRunner {
    async fn run(&self) -> BuildResult {
        let started = Instant::now();
        tracing::info!(command = %self.command, "Running build command");

        let output = Command::new(self.command.program())
            .args(self.command.args())
            .stdin(Stdio::null())
            .output()
            .await;

        let output = match output {
            Ok(output) => output,
            Err(e) => {
                let error = BuildError::Launch {
                    program: self.command.program().display().to_string(),
                    reason: e.to_string(),
                };
                return BuildResult::failure(error, "", "", started.elapsed());
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        let duration = started.elapsed();

        if output.status.success() {
            BuildResult::success(stdout, stderr, duration)
        } else {
            let error = output
                .status
                .code()
                .map_or(BuildError::Signaled, |code| BuildError::Exit { code });
            BuildResult::failure(error, stdout, stderr, duration)
        }
    }
}

/// Serializes builds so at most one runs at a time.
///
/// Share one supervisor between watch loops with `Arc`.
#[derive(Debug)]
pub struct BuildSupervisor<R = CommandRunner> {
    runner: R,
    lock: Mutex<()>,
    attempts: AtomicU64,
}

impl<R: BuildRunner> BuildSupervisor<R> {
    /// Create a supervisor around `runner`.
    pub fn new(runner: R) -> Self {
        Self {
            runner,
            lock: Mutex::new(()),
            attempts: AtomicU64::new(0),
        }
    }

    /// The underlying runner.
    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Number of builds started so far.
    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::Relaxed)
    }

    /// Run one build, waiting for any build already in progress.
    ///
    /// The result is logged before it is returned.
    pub async fn build(&self) -> BuildResult {
        let _guard = self.lock.lock().await;
        let attempt = self.attempts.fetch_add(1, Ordering::Relaxed) + 1;
        let span = tracing::info_span!("build", attempt);

        let result = self.runner.run().instrument(span.clone()).await;
        span.in_scope(|| log_result(&result));
        result
    }
}

fn log_result(result: &BuildResult) {
    let duration_ms = u64::try_from(result.duration.as_millis()).unwrap_or(u64::MAX);
    let stdout = result.stdout.trim_end();
    let stderr = result.stderr.trim_end();

    match &result.outcome {
        Ok(()) => {
            if !stdout.is_empty() {
                tracing::info!(output = %stdout, "Build stdout");
            }
            if !stderr.is_empty() {
                tracing::info!(output = %stderr, "Build stderr");
            }
            tracing::info!(duration_ms, "Build finished");
        }
        Err(e) => {
            if !stdout.is_empty() {
                tracing::warn!(output = %stdout, "Build stdout");
            }
            if !stderr.is_empty() {
                tracing::warn!(output = %stderr, "Build stderr");
            }
            tracing::error!(error = %e, duration_ms, "Build failed");
        }
    }
}

//! Command execution gateway.
//!
//! Every external program (docker, crontab, chown, stat) is reached through
//! [`ShellRunner`] as a `sh -c` command string. Production code uses
//! [`SystemShell`]; tests substitute a scripted runner.

use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

use crate::error::{CommandError, Result};

/// Timeout for short synchronous-style commands.
pub const RUN_TIMEOUT_SECS: u64 = 30;

/// Timeout for long-running commands such as image pulls.
pub const EXEC_TIMEOUT_SECS: u64 = 120;

/// Captured output of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Standard output.
    pub stdout: String,
    /// Standard error.
    pub stderr: String,
}

/// Capability for running shell commands.
#[async_trait]
pub trait ShellRunner: Send + Sync {
    /// Runs a short command and returns its trimmed standard output.
    ///
    /// # Errors
    ///
    /// Returns an error on a non-zero exit status or after
    /// [`RUN_TIMEOUT_SECS`].
    async fn run(&self, command: &str) -> Result<String>;

    /// Runs a long command and returns its full output.
    ///
    /// # Errors
    ///
    /// Returns an error on a non-zero exit status or after
    /// [`EXEC_TIMEOUT_SECS`].
    async fn exec(&self, command: &str) -> Result<CommandOutput>;

    /// Runs a command attached to the current terminal.
    ///
    /// # Errors
    ///
    /// Returns an error if the command cannot start or exits non-zero.
    async fn run_interactive(&self, command: &str) -> Result<()>;

    /// Runs a probe: like [`ShellRunner::run`], with failures mapped to `None`.
    async fn run_safe(&self, command: &str) -> Option<String> {
        match self.run(command).await {
            Ok(output) => Some(output),
            Err(e) => {
                debug!("Probe failed: {e}");
                None
            }
        }
    }
}

/// [`ShellRunner`] backed by `sh -c` on the host.
#[derive(Debug, Clone)]
pub struct SystemShell {
    run_timeout: Duration,
    exec_timeout: Duration,
}

impl Default for SystemShell {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemShell {
    /// Creates a runner with the default timeouts.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            run_timeout: Duration::from_secs(RUN_TIMEOUT_SECS),
            exec_timeout: Duration::from_secs(EXEC_TIMEOUT_SECS),
        }
    }

    /// Overrides both timeouts.
    #[must_use]
    pub const fn with_timeouts(mut self, run_timeout: Duration, exec_timeout: Duration) -> Self {
        self.run_timeout = run_timeout;
        self.exec_timeout = exec_timeout;
        self
    }

    async fn capture(&self, command: &str, timeout: Duration) -> Result<CommandOutput> {
        debug!("Running: {command}");

        let child = Command::new("sh")
            .arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| CommandError::Spawn {
                command: command.to_string(),
                message: e.to_string(),
            })?;

        let output = tokio::time::timeout(timeout, child.wait_with_output())
            .await
            .map_err(|_| CommandError::Timeout {
                command: command.to_string(),
                timeout_secs: timeout.as_secs(),
            })??;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            return Err(CommandError::Failed {
                command: command.to_string(),
                status: output.status.code().unwrap_or(-1),
                stderr: stderr.trim().to_string(),
            }
            .into());
        }

        Ok(CommandOutput { stdout, stderr })
    }
}

#[async_trait]
impl ShellRunner for SystemShell {
    async fn run(&self, command: &str) -> Result<String> {
        let output = self.capture(command, self.run_timeout).await?;
        Ok(output.stdout.trim().to_string())
    }

    async fn exec(&self, command: &str) -> Result<CommandOutput> {
        self.capture(command, self.exec_timeout).await
    }

    async fn run_interactive(&self, command: &str) -> Result<()> {
        debug!("Running attached: {command}");

        let status = Command::new("sh")
            .arg("-c")
            .arg(command)
            .status()
            .await
            .map_err(|e| CommandError::Spawn {
                command: command.to_string(),
                message: e.to_string(),
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(CommandError::Failed {
                command: command.to_string(),
                status: status.code().unwrap_or(-1),
                stderr: String::new(),
            }
            .into())
        }
    }
}

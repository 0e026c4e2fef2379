use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;

pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(90);

/// Exit code recorded when a command timed out, failed to spawn, or died by signal.
pub const ABNORMAL_EXIT: i32 = -1;

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("Execution failed: {0}")]
    ExecutionFailed(String),
    #[error("Timeout after {0:?}")]
    Timeout(Duration),
}

/// Outcome of one shell command. Output is trimmed at the end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResult {
    pub command: String,
    #[serde(alias = "returncode")]
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// A result standing in for a command that never produced an exit status.
    pub fn from_error(command: &str, err: &ExecutorError) -> Self {
        Self {
            command: command.to_string(),
            exit_code: ABNORMAL_EXIT,
            stdout: String::new(),
            stderr: err.to_string(),
        }
    }
}

/// Runs a single shell command. Implementations never fail: every problem
/// is folded into the returned `CommandResult`.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, command: &str) -> CommandResult;
}

/// `sh -c` runner with a fixed per-command timeout.
#[derive(Debug, Clone)]
pub struct ShellRunner {
    timeout: Duration,
    shell: String,
}

impl ShellRunner {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            shell: "sh".to_string(),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn try_run(&self, command: &str) -> Result<CommandResult, ExecutorError> {
        tracing::info!(command, "Executing command");

        let child = Command::new(&self.shell)
            .arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ExecutorError::ExecutionFailed(e.to_string()))?;

        // Dropping the future on timeout kills the child.
        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| ExecutorError::Timeout(self.timeout))?
            .map_err(|e| ExecutorError::ExecutionFailed(e.to_string()))?;

        Ok(CommandResult {
            command: command.to_string(),
            exit_code: output.status.code().unwrap_or(ABNORMAL_EXIT),
            stdout: String::from_utf8_lossy(&output.stdout).trim_end().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim_end().to_string(),
        })
    }
}

impl Default for ShellRunner {
    fn default() -> Self {
        Self::new(DEFAULT_COMMAND_TIMEOUT)
    }
}

#[async_trait]
impl CommandRunner for ShellRunner {
    async fn run(&self, command: &str) -> CommandResult {
        match self.try_run(command).await {
            Ok(result) => {
                if !result.success() {
                    tracing::warn!(
                        command,
                        exit_code = result.exit_code,
                        "Command exited non-zero"
                    );
                }
                result
            }
            Err(e) => {
                tracing::warn!(command, error = %e, "Command did not complete");
                CommandResult::from_error(command, &e)
            }
        }
    }
}

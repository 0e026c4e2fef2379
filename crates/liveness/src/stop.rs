use crate::LivenessError;
use async_trait::async_trait;
use opsmcp_executor::CommandRunner;
use std::sync::Arc;
use tracing::info;

pub const DEFAULT_SERVICE_UNIT: &str = "opsmcp";

/// What the idle watcher does once the agent is judged idle.
#[async_trait]
pub trait StopAction: Send + Sync {
    async fn stop(&self) -> Result<(), LivenessError>;
}

/// Stops a systemd unit through the shell runner.
pub struct ServiceStop {
    runner: Arc<dyn CommandRunner>,
    unit: String,
}

impl ServiceStop {
    pub fn new(runner: Arc<dyn CommandRunner>, unit: impl Into<String>) -> Self {
        Self {
            runner,
            unit: unit.into(),
        }
    }

    pub fn command(&self) -> String {
        format!("systemctl stop {}", self.unit)
    }
}

#[async_trait]
impl StopAction for ServiceStop {
    async fn stop(&self) -> Result<(), LivenessError> {
        let command = self.command();
        info!(unit = %self.unit, "Stopping service");

        let result = self.runner.run(&command).await;
        if result.success() {
            Ok(())
        } else {
            Err(LivenessError::Stop(format!(
                "`{}` exited with {}: {}",
                command, result.exit_code, result.stderr
            )))
        }
    }
}

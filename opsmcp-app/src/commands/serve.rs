use crate::config::AgentConfig;
use anyhow::Result;
use opsmcp_liveness::{HeartbeatFile, HeartbeatWriter};
use tokio_util::sync::CancellationToken;

/// Keep the heartbeat fresh until a termination signal arrives.
pub async fn run(config: &AgentConfig, token: CancellationToken) -> Result<()> {
    HeartbeatWriter::new(
        HeartbeatFile::new(config.heartbeat_path()),
        config.heartbeat_interval(),
    )
    .run(token)
    .await;
    Ok(())
}

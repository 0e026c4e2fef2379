use crate::config::AgentConfig;
use anyhow::Result;
use opsmcp_executor::ShellRunner;
use opsmcp_liveness::{HeartbeatFile, IdleWatcher, ServiceStop, WatchExit};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

pub async fn run(config: &AgentConfig, token: CancellationToken) -> Result<()> {
    let stopper = ServiceStop::new(
        Arc::new(ShellRunner::new(config.command_timeout())),
        config.service_unit.clone(),
    );
    let watcher = IdleWatcher::new(
        HeartbeatFile::new(config.heartbeat_path()),
        config.watch_interval(),
        config.idle_limit(),
        Arc::new(stopper),
    );

    match watcher.run(token).await {
        WatchExit::Stopped => info!(unit = %config.service_unit, "Idle shutdown issued"),
        WatchExit::Cancelled => info!("Idle watcher exiting"),
    }
    Ok(())
}

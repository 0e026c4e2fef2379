use crate::config::AgentConfig;
use opsmcp_liveness::{probe, HeartbeatFile};

/// One-shot probe; returns whether the agent is healthy.
pub async fn run(config: &AgentConfig) -> bool {
    let status = probe(
        &HeartbeatFile::new(config.heartbeat_path()),
        config.health_max_age(),
    )
    .await;

    if status.is_healthy() {
        println!("✅ {}", status);
        true
    } else {
        println!("❌ {}", status);
        false
    }
}

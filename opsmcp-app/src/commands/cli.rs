use crate::bootstrap::{build_dispatcher, StderrProgress};
use crate::config::AgentConfig;
use crate::repl::Repl;
use anyhow::Result;
use opsmcp_liveness::{HeartbeatFile, HeartbeatWriter};
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Interactive session with the heartbeat writer running alongside.
pub async fn run(config: &AgentConfig, token: CancellationToken) -> Result<()> {
    let dispatcher = Arc::new(build_dispatcher(config, Arc::new(StderrProgress))?);

    let writer = HeartbeatWriter::new(
        HeartbeatFile::new(config.heartbeat_path()),
        config.heartbeat_interval(),
    );

    with_heartbeat(writer, Repl::new(dispatcher).run(token)).await
}

/// Keep `writer` beating until `work` completes, including any in-flight
/// request drained after shutdown was requested.
pub async fn with_heartbeat<F: Future>(writer: HeartbeatWriter, work: F) -> F::Output {
    let heartbeat_token = CancellationToken::new();
    let heartbeat = {
        let token = heartbeat_token.clone();
        tokio::spawn(async move { writer.run(token).await })
    };

    let output = work.await;

    heartbeat_token.cancel();
    let _ = heartbeat.await;
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use opsmcp_liveness::now_secs;
    use std::time::Duration;

    #[tokio::test]
    async fn test_heartbeat_outlives_shutdown_request() {
        let dir = tempfile::tempdir().unwrap();
        let file = HeartbeatFile::new(dir.path().join("state.json"));
        let writer = HeartbeatWriter::new(file.clone(), Duration::from_millis(10));
        let shutdown = CancellationToken::new();

        let cancelled_at = with_heartbeat(writer, async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            shutdown.cancel();
            let cancelled_at = now_secs();
            // Still draining a request after shutdown was requested.
            tokio::time::sleep(Duration::from_millis(80)).await;
            cancelled_at
        })
        .await;

        assert!(shutdown.is_cancelled());
        let state = file.read().await.unwrap();
        assert!(state.last_heartbeat > cancelled_at);
    }
}

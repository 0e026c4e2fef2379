use crate::LivenessError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(10);
pub const STATUS_RUNNING: &str = "running";

/// Seconds since the Unix epoch, with sub-second precision.
pub fn now_secs() -> f64 {
    chrono::Utc::now().timestamp_millis() as f64 / 1000.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeartbeatState {
    pub last_heartbeat: f64,
    pub status: String,
}

impl HeartbeatState {
    pub fn running_at(now: f64) -> Self {
        Self {
            last_heartbeat: now,
            status: STATUS_RUNNING.to_string(),
        }
    }

    pub fn age_at(&self, now: f64) -> f64 {
        now - self.last_heartbeat
    }
}

/// Location of the shared heartbeat state.
#[derive(Debug, Clone)]
pub struct HeartbeatFile {
    path: PathBuf,
}

impl HeartbeatFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the file wholesale; readers never observe a partial write.
    pub async fn write(&self, state: &HeartbeatState) -> Result<(), LivenessError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp_file = self.path.with_extension("tmp");
        let content = serde_json::to_string(state)?;
        tokio::fs::write(&tmp_file, content).await?;
        tokio::fs::rename(&tmp_file, &self.path).await?;
        Ok(())
    }

    pub async fn read(&self) -> Result<HeartbeatState, LivenessError> {
        let content = tokio::fs::read_to_string(&self.path).await?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// Periodically stamps the heartbeat file while the agent is alive.
pub struct HeartbeatWriter {
    file: HeartbeatFile,
    interval: Duration,
}

impl HeartbeatWriter {
    pub fn new(file: HeartbeatFile, interval: Duration) -> Self {
        Self { file, interval }
    }

    pub async fn beat(&self) -> Result<(), LivenessError> {
        self.file.write(&HeartbeatState::running_at(now_secs())).await
    }

    /// Write immediately, then every interval until `token` is cancelled.
    /// Write failures are logged and never end the loop.
    pub async fn run(&self, token: CancellationToken) {
        info!(
            path = %self.file.path().display(),
            interval_secs = self.interval.as_secs_f64(),
            "Heartbeat writer started"
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = ticker.tick() => {
                    match self.beat().await {
                        Ok(()) => debug!("Heartbeat written"),
                        Err(e) => warn!(
                            path = %self.file.path().display(),
                            error = %e,
                            "Heartbeat write failed"
                        ),
                    }
                }
            }
        }

        info!("Heartbeat writer stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let file = HeartbeatFile::new(dir.path().join("state/heartbeat.json"));

        let state = HeartbeatState::running_at(1_700_000_000.5);
        file.write(&state).await.unwrap();

        assert_eq!(file.read().await.unwrap(), state);
        assert!(!dir.path().join("state/heartbeat.tmp").exists());
    }

    #[tokio::test]
    async fn test_read_missing_and_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let file = HeartbeatFile::new(dir.path().join("heartbeat.json"));
        assert!(matches!(file.read().await, Err(LivenessError::Io(_))));

        std::fs::write(file.path(), "{not json").unwrap();
        assert!(matches!(file.read().await, Err(LivenessError::Malformed(_))));
    }

    #[tokio::test]
    async fn test_writer_beats_until_cancelled() {
        let dir = tempfile::tempdir().unwrap();
        let file = HeartbeatFile::new(dir.path().join("heartbeat.json"));
        let writer = HeartbeatWriter::new(file.clone(), Duration::from_millis(10));
        let token = CancellationToken::new();

        let handle = {
            let token = token.clone();
            tokio::spawn(async move { writer.run(token).await })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        token.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();

        let state = file.read().await.unwrap();
        assert_eq!(state.status, STATUS_RUNNING);
        assert!(state.age_at(now_secs()) < 5.0);
    }

    #[tokio::test]
    async fn test_writer_survives_write_failures() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("heartbeat.json");
        std::fs::create_dir(&target).unwrap();
        std::fs::write(target.join("occupied"), "x").unwrap();

        let file = HeartbeatFile::new(&target);
        assert!(file.write(&HeartbeatState::running_at(now_secs())).await.is_err());

        let writer = HeartbeatWriter::new(file, Duration::from_millis(10));
        let token = CancellationToken::new();
        let handle = {
            let token = token.clone();
            tokio::spawn(async move { writer.run(token).await })
        };

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(!handle.is_finished());

        token.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(target.is_dir());
    }
}

//! Heartbeat writer, idle watcher and health probe sharing one state file.

pub mod health;
pub mod heartbeat;
pub mod stop;
pub mod watcher;

pub use health::{check_at, probe, HealthStatus, DEFAULT_MAX_AGE};
pub use heartbeat::{
    now_secs, HeartbeatFile, HeartbeatState, HeartbeatWriter, DEFAULT_HEARTBEAT_INTERVAL,
    STATUS_RUNNING,
};
pub use stop::{ServiceStop, StopAction, DEFAULT_SERVICE_UNIT};
pub use watcher::{is_idle, IdleWatcher, WatchExit, DEFAULT_IDLE_LIMIT, DEFAULT_WATCH_INTERVAL};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LivenessError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed heartbeat: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("Stop action failed: {0}")]
    Stop(String),
}

use crate::heartbeat::{now_secs, HeartbeatFile, HeartbeatState};
use crate::stop::StopAction;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

pub const DEFAULT_WATCH_INTERVAL: Duration = Duration::from_secs(60);
pub const DEFAULT_IDLE_LIMIT: Duration = Duration::from_secs(1800);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchExit {
    Stopped,
    Cancelled,
}

/// Strictly older than `limit` counts as idle.
pub fn is_idle(state: &HeartbeatState, now: f64, limit: Duration) -> bool {
    state.age_at(now) > limit.as_secs_f64()
}

pub struct IdleWatcher {
    file: HeartbeatFile,
    interval: Duration,
    idle_limit: Duration,
    stopper: Arc<dyn StopAction>,
}

impl IdleWatcher {
    pub fn new(
        file: HeartbeatFile,
        interval: Duration,
        idle_limit: Duration,
        stopper: Arc<dyn StopAction>,
    ) -> Self {
        Self {
            file,
            interval,
            idle_limit,
            stopper,
        }
    }

    /// Poll the heartbeat until it goes stale or `token` is cancelled.
    ///
    /// The stop action fires at most once; the watcher exits right after.
    pub async fn run(&self, token: CancellationToken) -> WatchExit {
        info!(
            path = %self.file.path().display(),
            idle_limit_secs = self.idle_limit.as_secs(),
            "Idle watcher started"
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    info!("Idle watcher cancelled");
                    return WatchExit::Cancelled;
                }
                _ = ticker.tick() => {}
            }

            let state = match self.file.read().await {
                Ok(state) => state,
                Err(e) => {
                    warn!(path = %self.file.path().display(), error = %e, "Cannot read heartbeat");
                    continue;
                }
            };

            let now = now_secs();
            if is_idle(&state, now, self.idle_limit) {
                info!(
                    idle_secs = state.age_at(now),
                    "Agent idle past limit, stopping"
                );
                if let Err(e) = self.stopper.stop().await {
                    error!(error = %e, "Stop action failed");
                }
                return WatchExit::Stopped;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idle_boundary_is_strict() {
        let now = 10_000.0;
        let limit = Duration::from_secs(1800);
        assert!(!is_idle(&HeartbeatState::running_at(now - 1800.0), now, limit));
        assert!(is_idle(&HeartbeatState::running_at(now - 1801.0), now, limit));
    }
}

//! One-shot freshness probe over the heartbeat file.

use crate::heartbeat::{now_secs, HeartbeatFile, HeartbeatState};
use crate::LivenessError;
use std::fmt;
use std::time::Duration;

pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq)]
pub enum HealthStatus {
    Healthy { age: f64 },
    Stale { age: f64, max_age: f64 },
    Missing(String),
    Malformed(String),
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthStatus::Healthy { .. })
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthStatus::Healthy { age } => write!(f, "healthy (heartbeat {:.1}s old)", age),
            HealthStatus::Stale { age, max_age } => {
                write!(f, "stale heartbeat ({:.1}s old, limit {:.0}s)", age, max_age)
            }
            HealthStatus::Missing(reason) => write!(f, "heartbeat unavailable: {}", reason),
            HealthStatus::Malformed(reason) => write!(f, "heartbeat malformed: {}", reason),
        }
    }
}

/// Judge a heartbeat against `now`. An age equal to `max_age` still passes.
pub fn check_at(state: &HeartbeatState, now: f64, max_age: Duration) -> HealthStatus {
    let age = state.age_at(now);
    let limit = max_age.as_secs_f64();
    if age > limit {
        HealthStatus::Stale {
            age,
            max_age: limit,
        }
    } else {
        HealthStatus::Healthy { age }
    }
}

pub async fn probe(file: &HeartbeatFile, max_age: Duration) -> HealthStatus {
    match file.read().await {
        Ok(state) => check_at(&state, now_secs(), max_age),
        Err(LivenessError::Malformed(e)) => HealthStatus::Malformed(e.to_string()),
        Err(e) => HealthStatus::Missing(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: f64 = 1_700_000_000.0;

    #[test]
    fn test_fresh_heartbeat_passes() {
        let state = HeartbeatState::running_at(NOW - 5.0);
        let status = check_at(&state, NOW, DEFAULT_MAX_AGE);
        assert_eq!(status, HealthStatus::Healthy { age: 5.0 });
        assert!(status.is_healthy());
    }

    #[test]
    fn test_old_heartbeat_fails() {
        let state = HeartbeatState::running_at(NOW - 45.0);
        let status = check_at(&state, NOW, DEFAULT_MAX_AGE);
        assert!(!status.is_healthy());
        assert!(status.to_string().contains("stale"));
    }

    #[tokio::test]
    async fn test_probe_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let file = HeartbeatFile::new(dir.path().join("absent.json"));
        assert!(matches!(
            probe(&file, DEFAULT_MAX_AGE).await,
            HealthStatus::Missing(_)
        ));
    }

    #[tokio::test]
    async fn test_probe_malformed_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("heartbeat.json");
        std::fs::write(&path, r#"{"status": "running"}"#).unwrap();

        let status = probe(&HeartbeatFile::new(path), DEFAULT_MAX_AGE).await;
        assert!(matches!(status, HealthStatus::Malformed(_)));
    }

    #[tokio::test]
    async fn test_probe_fresh_file_passes() {
        let dir = tempfile::tempdir().unwrap();
        let file = HeartbeatFile::new(dir.path().join("heartbeat.json"));
        file.write(&HeartbeatState::running_at(now_secs())).await.unwrap();

        assert!(probe(&file, DEFAULT_MAX_AGE).await.is_healthy());
    }
}

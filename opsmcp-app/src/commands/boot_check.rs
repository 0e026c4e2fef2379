//! Startup diagnostics driven by a list of pattern names.

use crate::config::AgentConfig;
use anyhow::Result;
use opsmcp_executor::{CommandRunner, ShellRunner};
use opsmcp_liveness::now_secs;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize)]
pub struct BootReport {
    pub timestamp: f64,
    pub repo_path: String,
    pub checks: Map<String, Value>,
}

/// Pattern names from a JSON list. Missing or malformed files yield none.
pub async fn read_patterns(path: &Path) -> Vec<String> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Cannot read patterns");
            return Vec::new();
        }
    };

    match serde_json::from_str(&content) {
        Ok(patterns) => patterns,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Malformed patterns file");
            Vec::new()
        }
    }
}

pub async fn run_checks(
    runner: &dyn CommandRunner,
    patterns: &[String],
    repo_path: &Path,
) -> BootReport {
    let wants = |name: &str| patterns.iter().any(|p| p == name);
    let mut checks = Map::new();

    if wants("OOM") {
        let swap = runner.run("swapon --show").await.stdout;
        let recent = runner
            .run("dmesg | grep -i 'out of memory' | tail -5")
            .await
            .stdout;
        checks.insert("OOM".to_string(), json!({ "swap": swap, "recent": recent }));
    }

    if wants("DISK") {
        checks.insert(
            "DISK".to_string(),
            Value::String(runner.run("df -h /").await.stdout),
        );
    }

    if wants("SERVICE") {
        checks.insert(
            "SERVICE".to_string(),
            Value::String(runner.run("systemctl --failed").await.stdout),
        );
    }

    BootReport {
        timestamp: now_secs(),
        repo_path: repo_path.display().to_string(),
        checks,
    }
}

pub async fn run(config: &AgentConfig) -> Result<()> {
    let patterns = read_patterns(&config.patterns_path()).await;
    let runner = ShellRunner::new(config.boot_probe_timeout());
    let report = run_checks(&runner, &patterns, &config.data_dir).await;

    let path = config.boot_report_path();
    let content = serde_json::to_string_pretty(&report)?;
    let written = async {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, content).await
    }
    .await;

    match written {
        Ok(()) => info!(
            path = %path.display(),
            checks = report.checks.len(),
            "Boot report written"
        ),
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to write boot report"),
    }
    Ok(())
}

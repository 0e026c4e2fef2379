//! EXECUTE / NO_EXEC gate and sequential runner.

use crate::metrics::Metrics;
use crate::progress::{ProgressEvent, ProgressSink};
use crate::types::{DispatchOutcome, ExecutionPlan};
use opsmcp_executor::{CommandResult, CommandRunner};
use std::path::Path;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

pub struct ExecutionGate {
    runner: Arc<dyn CommandRunner>,
    progress: Arc<dyn ProgressSink>,
    metrics: Arc<Metrics>,
}

impl ExecutionGate {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        progress: Arc<dyn ProgressSink>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            runner,
            progress,
            metrics,
        }
    }

    /// Run `plan` through the gate.
    ///
    /// An empty command list is always NO_EXEC. Otherwise every command runs,
    /// in order, and each result is recorded even when an earlier one failed.
    pub async fn execute(&self, plan: ExecutionPlan) -> DispatchOutcome {
        if plan.commands.is_empty() {
            info!("Plan has no commands, skipping execution");
            return DispatchOutcome::NoExec {
                description: plan.description,
            };
        }

        self.progress.notify(ProgressEvent::Executing {
            commands: plan.commands.len(),
        });

        let mut results = Vec::with_capacity(plan.commands.len());
        for command in &plan.commands {
            let result = self.runner.run(command).await;
            self.metrics.inc_commands_run();
            if !result.success() {
                self.metrics.inc_command_failures();
            }
            results.push(result);
        }

        if let Some(path) = &plan.output_file {
            if let Err(e) = append_results(path, &results).await {
                warn!(path = %path.display(), error = %e, "Failed to save command results");
            }
        }

        DispatchOutcome::Execute {
            description: plan.description,
            results,
            saved_to: plan.output_file,
        }
    }
}

/// Append a plain-text block per command to `path`.
async fn append_results(path: &Path, results: &[CommandResult]) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;

    file.write_all(render_results(results).as_bytes()).await?;
    file.flush().await
}

pub(crate) fn render_results(results: &[CommandResult]) -> String {
    let mut out = format!("=== {} ===\n", chrono::Utc::now().to_rfc3339());
    for result in results {
        out.push_str(&format!("$ {}\n", result.command));
        out.push_str(&format!("[exit {}]\n", result.exit_code));
        if !result.stdout.is_empty() {
            out.push_str(&result.stdout);
            out.push('\n');
        }
        if !result.stderr.is_empty() {
            out.push_str("--- stderr ---\n");
            out.push_str(&result.stderr);
            out.push('\n');
        }
        out.push('\n');
    }
    out
}

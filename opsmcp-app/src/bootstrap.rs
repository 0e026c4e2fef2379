//! Wiring from `AgentConfig` to a ready `Dispatcher`.

use crate::config::{AgentConfig, ProviderKind};
use anyhow::{Context, Result};
use opsmcp_core::{Dispatcher, ProgressEvent, ProgressSink};
use opsmcp_executor::ShellRunner;
use opsmcp_providers::{ChatModel, OllamaProvider, OpenAICompatibleProvider};
use std::io::Write;
use std::sync::Arc;
use tracing::warn;

/// Writes progress lines to stderr so stdout stays machine-readable.
pub struct StderrProgress;

impl ProgressSink for StderrProgress {
    fn notify(&self, event: ProgressEvent) {
        let mut stderr = std::io::stderr().lock();
        let _ = writeln!(stderr, "{}", event);
    }
}

pub fn build_chat_model(config: &AgentConfig) -> Arc<dyn ChatModel> {
    if config.api_key.is_none() {
        warn!("No API key configured; remote models may reject requests");
    }

    match config.provider {
        ProviderKind::Ollama => Arc::new(OllamaProvider::new(
            config.api_host.clone(),
            config.api_key.clone(),
            config.request_timeout(),
        )),
        ProviderKind::OpenaiCompatible => Arc::new(OpenAICompatibleProvider::new(
            config.api_host.clone(),
            config.api_key.clone(),
            config.request_timeout(),
        )),
    }
}

/// Validates the `dispatch` section; only `cli` and `run` depend on it.
pub fn build_dispatcher(
    config: &AgentConfig,
    progress: Arc<dyn ProgressSink>,
) -> Result<Dispatcher> {
    let chat = build_chat_model(config);
    let runner = Arc::new(ShellRunner::new(config.command_timeout()));
    Dispatcher::with_progress(chat, runner, config.dispatch.clone(), progress)
        .context("Invalid dispatch configuration")
}

pub fn is_root() -> bool {
    // SAFETY: geteuid has no preconditions and cannot fail.
    unsafe { libc::geteuid() == 0 }
}

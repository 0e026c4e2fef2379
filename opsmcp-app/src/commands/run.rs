use super::{error_payload, render_response};
use crate::bootstrap::{build_dispatcher, StderrProgress};
use crate::config::AgentConfig;
use anyhow::Result;
use std::sync::Arc;
use tracing::error;

/// Handle one request and print the response as a single JSON line.
pub async fn run(config: &AgentConfig, text: &str) -> Result<()> {
    let response = match build_dispatcher(config, Arc::new(StderrProgress)) {
        Ok(dispatcher) => render_response(dispatcher.handle(text).await),
        Err(e) => {
            error!(error = %format!("{:#}", e), "Failed to initialize dispatcher");
            error_payload()
        }
    };

    println!("{}", serde_json::to_string(&response)?);
    Ok(())
}

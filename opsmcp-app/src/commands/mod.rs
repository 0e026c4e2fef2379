pub mod boot_check;
pub mod cli;
pub mod health;
pub mod idle_watch;
pub mod run;
pub mod serve;

use opsmcp_core::{DispatchError, DispatchOutcome};
use serde_json::{json, Value};
use tracing::error;

pub const GENERIC_ERROR: &str = "AI processing failed";

pub fn error_payload() -> Value {
    json!({ "error": GENERIC_ERROR })
}

/// JSON shown to the user. Failure details go to the log, never to the caller.
pub fn render_response(result: Result<DispatchOutcome, DispatchError>) -> Value {
    match result {
        Ok(outcome) => serde_json::to_value(&outcome).unwrap_or_else(|e| {
            error!(error = %e, "Failed to serialize outcome");
            error_payload()
        }),
        Err(e) => {
            error!(error = %e, "Request handling failed");
            error_payload()
        }
    }
}

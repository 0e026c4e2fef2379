//! Ordered model fallback.
//!
//! Each model is tried once, in chain order. An attempt produces an explicit
//! [`Attempt`] value and the loop moves on when it is `Failed`. The first
//! parsed reply wins; if none parses the caller gets
//! [`DispatchError::ModelsExhausted`] carrying the last failure.

use crate::error::DispatchError;
use crate::metrics::Metrics;
use crate::parse::{parse_model_json, sanitize_model_output};
use crate::progress::{ProgressEvent, ProgressSink};
use opsmcp_providers::{ChatFormat, ChatModel};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    /// The reply must parse as JSON.
    Json,
    /// JSON when it parses, otherwise any non-empty text.
    JsonOrText,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Json(Value),
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Attempt {
    Parsed(Reply),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelFailure {
    pub model: String,
    pub reason: String,
}

/// Successful invocation: which model answered, and who failed before it.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub model: String,
    pub reply: Reply,
    pub failures: Vec<ModelFailure>,
}

pub struct FallbackInvoker {
    chat: Arc<dyn ChatModel>,
    progress: Arc<dyn ProgressSink>,
    metrics: Arc<Metrics>,
}

impl FallbackInvoker {
    pub fn new(
        chat: Arc<dyn ChatModel>,
        progress: Arc<dyn ProgressSink>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            chat,
            progress,
            metrics,
        }
    }

    pub async fn invoke(
        &self,
        models: &[String],
        system_prompt: &str,
        payload: &Value,
        format: ResponseFormat,
    ) -> Result<Invocation, DispatchError> {
        let payload = serde_json::to_string(payload)?;
        let mut failures = Vec::new();

        for model in models {
            self.progress.notify(ProgressEvent::QueryingModel {
                model: model.clone(),
            });
            self.metrics.inc_model_attempts();

            match self.attempt(model, system_prompt, &payload, format).await {
                Attempt::Parsed(reply) => {
                    debug!(model = %model, skipped = failures.len(), "Model answered");
                    return Ok(Invocation {
                        model: model.clone(),
                        reply,
                        failures,
                    });
                }
                Attempt::Failed(reason) => {
                    warn!(model = %model, reason = %reason, "Model attempt failed");
                    self.metrics.inc_model_failures();
                    self.progress.notify(ProgressEvent::ModelFailed {
                        model: model.clone(),
                        reason: reason.clone(),
                    });
                    failures.push(ModelFailure {
                        model: model.clone(),
                        reason,
                    });
                }
            }
        }

        let last = failures
            .last()
            .map(|f| format!("{}: {}", f.model, f.reason))
            .unwrap_or_else(|| "empty model chain".to_string());

        Err(DispatchError::ModelsExhausted {
            attempts: failures.len(),
            last,
        })
    }

    async fn attempt(
        &self,
        model: &str,
        system_prompt: &str,
        payload: &str,
        format: ResponseFormat,
    ) -> Attempt {
        let chat_format = match format {
            ResponseFormat::Json => ChatFormat::Json,
            ResponseFormat::JsonOrText => ChatFormat::Text,
        };

        let raw = match self
            .chat
            .chat(model, system_prompt, payload, chat_format)
            .await
        {
            Ok(raw) => raw,
            Err(e) => return Attempt::Failed(e.to_string()),
        };

        interpret_reply(&raw, format)
    }
}

/// Turn raw reply text into an attempt outcome for the requested format.
pub fn interpret_reply(raw: &str, format: ResponseFormat) -> Attempt {
    if raw.trim().is_empty() {
        return Attempt::Failed("empty response".to_string());
    }

    match parse_model_json(raw) {
        Ok(value) => Attempt::Parsed(Reply::Json(value)),
        Err(e) => match format {
            ResponseFormat::Json => Attempt::Failed(format!("malformed JSON: {}", e)),
            ResponseFormat::JsonOrText => {
                Attempt::Parsed(Reply::Text(sanitize_model_output(raw).to_string()))
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_interpret_json() {
        assert_eq!(
            interpret_reply("```json\n{\"a\":1}\n```", ResponseFormat::Json),
            Attempt::Parsed(Reply::Json(json!({"a": 1})))
        );
    }

    #[test]
    fn test_interpret_text_rejected_for_json() {
        assert!(matches!(
            interpret_reply("sorry, I can't", ResponseFormat::Json),
            Attempt::Failed(_)
        ));
    }

    #[test]
    fn test_interpret_text_accepted_for_json_or_text() {
        assert_eq!(
            interpret_reply("  Disk usage is fine.  ", ResponseFormat::JsonOrText),
            Attempt::Parsed(Reply::Text("Disk usage is fine.".to_string()))
        );
    }

    #[test]
    fn test_interpret_empty_fails_for_any_format() {
        assert!(matches!(
            interpret_reply("   ", ResponseFormat::JsonOrText),
            Attempt::Failed(_)
        ));
    }
}

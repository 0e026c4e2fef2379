//! Plan building and report generation, both bound to a fixed system prompt.

use crate::context::FileContext;
use crate::error::DispatchError;
use crate::fallback::{FallbackInvoker, Reply, ResponseFormat};
use crate::prompts::{PLANNER_PROMPT, REPORT_PROMPT};
use crate::types::{DispatchOutcome, ExecutionPlan, ReportBody};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

fn request_payload(rewritten_request: &str, context: &FileContext) -> Value {
    json!({
        "rewritten_request": rewritten_request,
        "project_context": context,
    })
}

pub struct PlanBuilder {
    invoker: Arc<FallbackInvoker>,
    system_prompt: String,
}

impl PlanBuilder {
    pub fn new(invoker: Arc<FallbackInvoker>) -> Self {
        Self::with_prompt(invoker, PLANNER_PROMPT.to_string())
    }

    pub fn with_prompt(invoker: Arc<FallbackInvoker>, system_prompt: String) -> Self {
        Self {
            invoker,
            system_prompt,
        }
    }

    pub async fn build(
        &self,
        models: &[String],
        rewritten_request: &str,
        context: &FileContext,
    ) -> Result<ExecutionPlan, DispatchError> {
        let invocation = self
            .invoker
            .invoke(
                models,
                &self.system_prompt,
                &request_payload(rewritten_request, context),
                ResponseFormat::Json,
            )
            .await?;

        let plan = match invocation.reply {
            Reply::Json(value) => ExecutionPlan::from_value(&value),
            Reply::Text(text) => ExecutionPlan::without_commands(text),
        };

        info!(
            model = %invocation.model,
            commands = plan.commands.len(),
            "Execution plan built"
        );
        Ok(plan)
    }
}

pub struct ReportGenerator {
    invoker: Arc<FallbackInvoker>,
    system_prompt: String,
}

impl ReportGenerator {
    pub fn new(invoker: Arc<FallbackInvoker>) -> Self {
        Self::with_prompt(invoker, REPORT_PROMPT.to_string())
    }

    pub fn with_prompt(invoker: Arc<FallbackInvoker>, system_prompt: String) -> Self {
        Self {
            invoker,
            system_prompt,
        }
    }

    /// Produce a REPORT outcome. Never carries commands: a `commands` key in
    /// a structured reply is dropped.
    pub async fn generate(
        &self,
        models: &[String],
        rewritten_request: &str,
        context: &FileContext,
    ) -> Result<DispatchOutcome, DispatchError> {
        let invocation = self
            .invoker
            .invoke(
                models,
                &self.system_prompt,
                &request_payload(rewritten_request, context),
                ResponseFormat::JsonOrText,
            )
            .await?;

        info!(model = %invocation.model, "Report generated");
        Ok(DispatchOutcome::Report {
            body: report_body(invocation.reply),
        })
    }
}

fn report_body(reply: Reply) -> ReportBody {
    match reply {
        Reply::Json(Value::Object(mut map)) => {
            map.remove("commands");
            ReportBody::Structured(Value::Object(map))
        }
        Reply::Json(Value::String(text)) | Reply::Text(text) => ReportBody::Summary(text),
        Reply::Json(other) => ReportBody::Structured(other),
    }
}

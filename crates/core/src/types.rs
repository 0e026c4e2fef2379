use opsmcp_executor::CommandResult;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::PathBuf;

/// Intent label that selects a model chain.
///
/// Serde decoding is strict so a misspelled config key is rejected; model
/// replies go through [`Category::from_label`] instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    ServerOperation,
    CodeGeneration,
    Explanatory,
    Unknown,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::ServerOperation,
        Category::CodeGeneration,
        Category::Explanatory,
        Category::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::ServerOperation => "server_operation",
            Category::CodeGeneration => "code_generation",
            Category::Explanatory => "explanatory",
            Category::Unknown => "unknown",
        }
    }

    /// Lenient label parsing; anything unrecognized is `Unknown`.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "server_operation" => Category::ServerOperation,
            "code_generation" => Category::CodeGeneration,
            "explanatory" => Category::Explanatory,
            _ => Category::Unknown,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    #[serde(alias = "nature")]
    pub category: Category,
    pub rewritten_request: String,
    pub confidence: f64,
}

impl ClassificationResult {
    /// Identity fallback used whenever the classifier cannot answer.
    pub fn fallback(request: &str) -> Self {
        Self {
            category: Category::Unknown,
            rewritten_request: request.to_string(),
            confidence: 0.0,
        }
    }

    /// Build a result from whatever JSON the classifier model produced.
    ///
    /// Missing or malformed fields degrade individually: the category to
    /// `unknown`, the rewrite to the original request, the confidence to 0.0.
    pub fn from_model_value(value: &Value, request: &str) -> Self {
        if !value.is_object() {
            return Self::fallback(request);
        }

        let category = value
            .get("nature")
            .or_else(|| value.get("category"))
            .and_then(Value::as_str)
            .map(Category::from_label)
            .unwrap_or(Category::Unknown);

        let rewritten_request = value
            .get("rewritten_request")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(request)
            .to_string();

        let confidence = value
            .get("confidence")
            .and_then(|c| match c {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => s.trim().parse::<f64>().ok(),
                _ => None,
            })
            .filter(|c| c.is_finite())
            .map(|c| c.clamp(0.0, 1.0))
            .unwrap_or(0.0);

        Self {
            category,
            rewritten_request,
            confidence,
        }
    }
}

/// Commands proposed by a planner model. Empty `commands` means "do not execute".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionPlan {
    pub description: String,
    pub commands: Vec<String>,
    pub output_file: Option<PathBuf>,
}

impl ExecutionPlan {
    pub const DEFAULT_DESCRIPTION: &'static str = "No commands to execute";

    pub fn without_commands(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            commands: Vec::new(),
            output_file: None,
        }
    }

    /// Normalize a planner reply. A non-list `commands` is treated as empty;
    /// non-string and blank entries are dropped, never rewritten.
    pub fn from_value(value: &Value) -> Self {
        let description = value
            .get("description")
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(Self::DEFAULT_DESCRIPTION)
            .to_string();

        let commands = value
            .get("commands")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .filter(|c| !c.trim().is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let output_file = value
            .get("output_file")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|p| !p.is_empty() && *p != "null")
            .map(PathBuf::from);

        Self {
            description,
            commands,
            output_file,
        }
    }
}

/// Body of a REPORT outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ReportBody {
    #[serde(rename = "report")]
    Structured(Value),
    #[serde(rename = "summary")]
    Summary(String),
}

/// Terminal state of one dispatched request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "mode")]
pub enum DispatchOutcome {
    #[serde(rename = "EXECUTE")]
    Execute {
        description: String,
        results: Vec<CommandResult>,
        saved_to: Option<PathBuf>,
    },
    #[serde(rename = "NO_EXEC")]
    NoExec { description: String },
    #[serde(rename = "REPORT")]
    Report {
        #[serde(flatten)]
        body: ReportBody,
    },
}

impl DispatchOutcome {
    pub fn mode(&self) -> &'static str {
        match self {
            DispatchOutcome::Execute { .. } => "EXECUTE",
            DispatchOutcome::NoExec { .. } => "NO_EXEC",
            DispatchOutcome::Report { .. } => "REPORT",
        }
    }
}

use std::fmt;

/// Observability events emitted while a request moves through the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    Classifying { model: String },
    QueryingModel { model: String },
    ModelFailed { model: String, reason: String },
    Executing { commands: usize },
}

impl fmt::Display for ProgressEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgressEvent::Classifying { model } => write!(f, "⏳ Classifying request ({})", model),
            ProgressEvent::QueryingModel { model } => write!(f, "## Asking {}", model),
            ProgressEvent::ModelFailed { model, reason } => {
                write!(f, "@@ {} failed: {}", model, reason)
            }
            ProgressEvent::Executing { commands } => {
                write!(f, "⏳ Executing {} command(s)", commands)
            }
        }
    }
}

/// Fire-and-forget sink. Implementations must not block and must not fail.
pub trait ProgressSink: Send + Sync {
    fn notify(&self, event: ProgressEvent);
}

pub struct SilentProgress;

impl ProgressSink for SilentProgress {
    fn notify(&self, _event: ProgressEvent) {}
}

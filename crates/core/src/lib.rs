//! Request-dispatch pipeline: classification, model chains, fallback,
//! planning, reporting and the execution gate.

pub mod chains;
pub mod classifier;
pub mod config;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod fallback;
pub mod gate;
pub mod metrics;
pub mod parse;
pub mod planner;
pub mod progress;
pub mod prompts;
pub mod types;

pub use chains::ModelChains;
pub use classifier::{ClassifierCache, IntentClassifier};
pub use config::DispatchConfig;
pub use context::{ContextLoader, ContextSettings, FileContext};
pub use dispatcher::{effective_category, Dispatcher, TriggerSet};
pub use error::DispatchError;
pub use fallback::{Attempt, FallbackInvoker, Invocation, ModelFailure, Reply, ResponseFormat};
pub use gate::ExecutionGate;
pub use metrics::{Metrics, MetricsSnapshot};
pub use planner::{PlanBuilder, ReportGenerator};
pub use progress::{ProgressEvent, ProgressSink, SilentProgress};
pub use types::*;

pub use opsmcp_executor::CommandResult;

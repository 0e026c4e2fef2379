//! Per-request pipeline: context -> classify -> gate on confidence -> report
//! or plan + execute.

use crate::chains::ModelChains;
use crate::classifier::{ClassifierCache, IntentClassifier};
use crate::config::DispatchConfig;
use crate::context::{ContextLoader, FileContext};
use crate::error::DispatchError;
use crate::fallback::FallbackInvoker;
use crate::gate::ExecutionGate;
use crate::metrics::Metrics;
use crate::planner::{PlanBuilder, ReportGenerator};
use crate::progress::{ProgressSink, SilentProgress};
use crate::types::{Category, ClassificationResult, DispatchOutcome};
use opsmcp_executor::CommandRunner;
use opsmcp_providers::ChatModel;
use std::sync::Arc;
use tracing::{debug, info};

/// Case-insensitive literal phrase matcher.
#[derive(Debug, Clone, Default)]
pub struct TriggerSet {
    phrases: Vec<String>,
}

impl TriggerSet {
    pub fn new(phrases: &[String]) -> Self {
        Self {
            phrases: phrases
                .iter()
                .map(|p| p.trim().to_lowercase())
                .filter(|p| !p.is_empty())
                .collect(),
        }
    }

    pub fn matches(&self, input: &str) -> bool {
        let lowered = input.to_lowercase();
        self.phrases.iter().any(|p| lowered.contains(p.as_str()))
    }
}

/// Category used for chain resolution once the confidence gate is applied.
pub fn effective_category(result: &ClassificationResult, threshold: f64) -> Category {
    if result.confidence < threshold {
        Category::Unknown
    } else {
        result.category
    }
}

pub struct Dispatcher {
    classifier: IntentClassifier,
    chains: ModelChains,
    planner: PlanBuilder,
    reporter: ReportGenerator,
    gate: ExecutionGate,
    context_loader: ContextLoader,
    confidence_threshold: f64,
    report_triggers: TriggerSet,
    context_triggers: TriggerSet,
    metrics: Arc<Metrics>,
}

impl Dispatcher {
    pub fn new(
        chat: Arc<dyn ChatModel>,
        runner: Arc<dyn CommandRunner>,
        config: DispatchConfig,
    ) -> Result<Self, DispatchError> {
        Self::with_progress(chat, runner, config, Arc::new(SilentProgress))
    }

    pub fn with_progress(
        chat: Arc<dyn ChatModel>,
        runner: Arc<dyn CommandRunner>,
        config: DispatchConfig,
        progress: Arc<dyn ProgressSink>,
    ) -> Result<Self, DispatchError> {
        config.validate()?;

        let metrics = Metrics::new();
        let invoker = Arc::new(FallbackInvoker::new(
            chat.clone(),
            progress.clone(),
            metrics.clone(),
        ));

        Ok(Self {
            classifier: IntentClassifier::new(
                chat,
                config.classifier_model,
                ClassifierCache::with_capacity(config.classify_cache_capacity),
                progress.clone(),
                metrics.clone(),
            ),
            chains: ModelChains::new(config.model_chains),
            planner: PlanBuilder::new(invoker.clone()),
            reporter: ReportGenerator::new(invoker),
            gate: ExecutionGate::new(runner, progress, metrics.clone()),
            context_loader: ContextLoader::new(config.context)?,
            confidence_threshold: config.confidence_threshold,
            report_triggers: TriggerSet::new(&config.report_triggers),
            context_triggers: TriggerSet::new(&config.context_triggers),
            metrics,
        })
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    pub fn classifier(&self) -> &IntentClassifier {
        &self.classifier
    }

    /// Handle one request end to end.
    ///
    /// Report triggers in the raw input override any classified category.
    /// Only an exhausted model chain is returned as an error.
    pub async fn handle(&self, input: &str) -> Result<DispatchOutcome, DispatchError> {
        let result = self.handle_inner(input).await;
        if result.is_err() {
            self.metrics.inc_dispatch_errors();
        }
        result
    }

    async fn handle_inner(&self, input: &str) -> Result<DispatchOutcome, DispatchError> {
        let context = if self.context_triggers.matches(input) {
            let context = self.context_loader.load().await;
            debug!(files = context.len(), "Attached file context");
            context
        } else {
            FileContext::new()
        };

        let classification = self.classifier.classify(input, &context).await;
        let category = effective_category(&classification, self.confidence_threshold);
        let models = self.chains.resolve(category);

        info!(
            classified = %classification.category,
            effective = %category,
            confidence = classification.confidence,
            "Routing request"
        );

        if category == Category::Explanatory || self.report_triggers.matches(input) {
            return self
                .reporter
                .generate(models, &classification.rewritten_request, &context)
                .await;
        }

        let plan = self
            .planner
            .build(models, &classification.rewritten_request, &context)
            .await?;

        Ok(self.gate.execute(plan).await)
    }
}

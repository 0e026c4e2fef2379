use crate::chains::ModelChains;
use crate::context::ContextSettings;
use crate::error::DispatchError;
use crate::types::Category;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const DEFAULT_CLASSIFIER_MODEL: &str = "nemotron-3-nano:30b-cloud";
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.6;

/// Dispatch pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    pub classifier_model: String,
    pub model_chains: HashMap<Category, Vec<String>>,
    pub confidence_threshold: f64,
    pub report_triggers: Vec<String>,
    pub context_triggers: Vec<String>,
    /// `None` keeps every classification for the life of the process.
    pub classify_cache_capacity: Option<usize>,
    pub context: ContextSettings,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            classifier_model: DEFAULT_CLASSIFIER_MODEL.to_string(),
            model_chains: ModelChains::default_table(),
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            report_triggers: to_strings(&["report mode", "report_only", "--report", "[report]"]),
            context_triggers: to_strings(&[
                "이 폴더",
                "현재 폴더",
                "파일 참고",
                "코드 참고",
                "스크립트 참고",
                "project",
                "context",
            ]),
            classify_cache_capacity: None,
            context: ContextSettings::default(),
        }
    }
}

impl DispatchConfig {
    pub fn validate(&self) -> Result<(), DispatchError> {
        if self.classifier_model.trim().is_empty() {
            return Err(DispatchError::Config(
                "classifier_model cannot be empty".to_string(),
            ));
        }

        let unknown_chain_empty = self
            .model_chains
            .get(&Category::Unknown)
            .map_or(true, |models| models.is_empty());
        if unknown_chain_empty {
            return Err(DispatchError::Config(
                "model_chains must define a non-empty `unknown` chain".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(DispatchError::Config(format!(
                "confidence_threshold must be within [0, 1], got {}",
                self.confidence_threshold
            )));
        }

        Ok(())
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

//! Intent classification with a process-lifetime memo cache.

use crate::context::FileContext;
use crate::metrics::Metrics;
use crate::parse::parse_model_json;
use crate::progress::{ProgressEvent, ProgressSink};
use crate::prompts::CLASSIFIER_PROMPT;
use crate::types::ClassificationResult;
use opsmcp_providers::{ChatFormat, ChatModel};
use parking_lot::Mutex;
use serde_json::json;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    request: String,
    with_context: bool,
}

#[derive(Default)]
struct CacheInner {
    entries: HashMap<CacheKey, Arc<ClassificationResult>>,
    order: VecDeque<CacheKey>,
}

/// Memo of classification results keyed by (request text, context attached).
///
/// Unbounded unless a capacity is given, in which case the oldest insertion
/// is evicted first. Entries are never invalidated otherwise.
pub struct ClassifierCache {
    inner: Mutex<CacheInner>,
    capacity: Option<usize>,
}

impl ClassifierCache {
    pub fn unbounded() -> Self {
        Self {
            inner: Mutex::new(CacheInner::default()),
            capacity: None,
        }
    }

    pub fn with_capacity(capacity: Option<usize>) -> Self {
        Self {
            inner: Mutex::new(CacheInner::default()),
            capacity: capacity.filter(|c| *c > 0),
        }
    }

    pub fn get(&self, request: &str, with_context: bool) -> Option<Arc<ClassificationResult>> {
        let key = CacheKey {
            request: request.to_string(),
            with_context,
        };
        self.inner.lock().entries.get(&key).cloned()
    }

    pub fn insert(
        &self,
        request: &str,
        with_context: bool,
        result: ClassificationResult,
    ) -> Arc<ClassificationResult> {
        let key = CacheKey {
            request: request.to_string(),
            with_context,
        };
        let result = Arc::new(result);

        let mut inner = self.inner.lock();
        if inner.entries.insert(key.clone(), result.clone()).is_none() {
            inner.order.push_back(key);
        }

        if let Some(capacity) = self.capacity {
            while inner.entries.len() > capacity {
                let Some(oldest) = inner.order.pop_front() else {
                    break;
                };
                inner.entries.remove(&oldest);
            }
        }

        result
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ClassifierCache {
    fn default() -> Self {
        Self::unbounded()
    }
}

pub struct IntentClassifier {
    chat: Arc<dyn ChatModel>,
    model: String,
    cache: ClassifierCache,
    progress: Arc<dyn ProgressSink>,
    metrics: Arc<Metrics>,
}

impl IntentClassifier {
    pub fn new(
        chat: Arc<dyn ChatModel>,
        model: String,
        cache: ClassifierCache,
        progress: Arc<dyn ProgressSink>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            chat,
            model,
            cache,
            progress,
            metrics,
        }
    }

    pub fn cache(&self) -> &ClassifierCache {
        &self.cache
    }

    /// Classify `request`. Never fails: remote or decode errors yield the
    /// unknown / 0.0 / identity fallback.
    ///
    /// Transport failures are not cached so an identical request retries;
    /// a reply that arrived but did not parse is cached as the fallback.
    pub async fn classify(
        &self,
        request: &str,
        context: &FileContext,
    ) -> Arc<ClassificationResult> {
        let with_context = !context.is_empty();

        if let Some(hit) = self.cache.get(request, with_context) {
            debug!(with_context, "Classification cache hit");
            self.metrics.inc_classify_cache_hits();
            return hit;
        }

        self.metrics.inc_classify_requests();
        let payload = json!({
            "user_request": request,
            "project_context": context,
        })
        .to_string();

        self.progress.notify(ProgressEvent::Classifying {
            model: self.model.clone(),
        });

        let reply = match self
            .chat
            .chat(&self.model, CLASSIFIER_PROMPT, &payload, ChatFormat::Json)
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                warn!(model = %self.model, error = %e, "Classifier call failed");
                self.metrics.inc_classify_failures();
                return Arc::new(ClassificationResult::fallback(request));
            }
        };

        let result = match parse_model_json(&reply) {
            Ok(value) => ClassificationResult::from_model_value(&value, request),
            Err(e) => {
                warn!(model = %self.model, error = %e, "Classifier reply was not JSON");
                self.metrics.inc_classify_failures();
                ClassificationResult::fallback(request)
            }
        };

        debug!(
            category = %result.category,
            confidence = result.confidence,
            "Request classified"
        );
        self.cache.insert(request, with_context, result)
    }
}

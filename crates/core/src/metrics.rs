use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Default)]
pub struct Metrics {
    classify_requests: AtomicU64,
    classify_cache_hits: AtomicU64,
    classify_failures: AtomicU64,
    model_attempts: AtomicU64,
    model_failures: AtomicU64,
    commands_run: AtomicU64,
    command_failures: AtomicU64,
    dispatch_errors: AtomicU64,
}

impl Metrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn inc_classify_requests(&self) {
        self.classify_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_classify_cache_hits(&self) {
        self.classify_cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_classify_failures(&self) {
        self.classify_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_model_attempts(&self) {
        self.model_attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_model_failures(&self) {
        self.model_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_commands_run(&self) {
        self.commands_run.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_command_failures(&self) {
        self.command_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_dispatch_errors(&self) {
        self.dispatch_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            classify_requests: self.classify_requests.load(Ordering::Relaxed),
            classify_cache_hits: self.classify_cache_hits.load(Ordering::Relaxed),
            classify_failures: self.classify_failures.load(Ordering::Relaxed),
            model_attempts: self.model_attempts.load(Ordering::Relaxed),
            model_failures: self.model_failures.load(Ordering::Relaxed),
            commands_run: self.commands_run.load(Ordering::Relaxed),
            command_failures: self.command_failures.load(Ordering::Relaxed),
            dispatch_errors: self.dispatch_errors.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub classify_requests: u64,
    pub classify_cache_hits: u64,
    pub classify_failures: u64,
    pub model_attempts: u64,
    pub model_failures: u64,
    pub commands_run: u64,
    pub command_failures: u64,
    pub dispatch_errors: u64,
}

impl MetricsSnapshot {
    pub fn model_success_rate(&self) -> f64 {
        if self.model_attempts == 0 {
            return 1.0;
        }
        1.0 - (self.model_failures as f64 / self.model_attempts as f64)
    }

    pub fn command_success_rate(&self) -> f64 {
        if self.commands_run == 0 {
            return 1.0;
        }
        1.0 - (self.command_failures as f64 / self.commands_run as f64)
    }
}

use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};

use crate::errors::RetryerError;
use crate::observer::RetryerObserver;

// ============================================================================
// Metrics Module - Prometheus metrics for retryers
// ============================================================================
//
// Tracks, per operation label:
// - Failed attempts that were retried
// - Pause / continue episodes
// - Terminal outcomes (success, failed, cancelled, panicked, dropped)
//
// Wire it in by attaching `RetryerMetrics::observer(operation)` to a
// retryer config. The registry is owned here; hosts expose it however they
// like (see `render`).
// ============================================================================

pub struct RetryerMetrics {
    registry: Registry,

    pub attempt_failures: IntCounterVec,
    pub pauses: IntCounterVec,
    pub resumes: IntCounterVec,
    pub outcomes: IntCounterVec,
}

impl RetryerMetrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let attempt_failures = IntCounterVec::new(
            Opts::new(
                "retryer_attempt_failures_total",
                "Failed attempts that were followed by a retry",
            ),
            &["operation"],
        )?;
        registry.register(Box::new(attempt_failures.clone()))?;

        let pauses = IntCounterVec::new(
            Opts::new("retryer_pauses_total", "Times a retryer parked on its pause gate"),
            &["operation"],
        )?;
        registry.register(Box::new(pauses.clone()))?;

        let resumes = IntCounterVec::new(
            Opts::new("retryer_resumes_total", "Pauses that ended with the loop continuing"),
            &["operation"],
        )?;
        registry.register(Box::new(resumes.clone()))?;

        let outcomes = IntCounterVec::new(
            Opts::new("retryer_outcomes_total", "Terminal retryer outcomes"),
            &["operation", "outcome"],
        )?;
        registry.register(Box::new(outcomes.clone()))?;

        Ok(Self {
            registry,
            attempt_failures,
            pauses,
            resumes,
            outcomes,
        })
    }

    /// Get the Prometheus registry for exposing metrics
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Observer that records into this registry under `operation`
    pub fn observer(&self, operation: impl Into<String>) -> MetricsObserver {
        MetricsObserver {
            operation: operation.into(),
            attempt_failures: self.attempt_failures.clone(),
            pauses: self.pauses.clone(),
            resumes: self.resumes.clone(),
            outcomes: self.outcomes.clone(),
        }
    }

    pub fn record_outcome(&self, operation: &str, outcome: &str) {
        self.outcomes.with_label_values(&[operation, outcome]).inc();
    }

    /// Encode every registered metric in the Prometheus text format
    pub fn render(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

/// `RetryerObserver` that feeds `RetryerMetrics`. Counter handles are shared
/// with the registry, so the observer can outlive the borrow it came from.
#[derive(Clone)]
pub struct MetricsObserver {
    operation: String,
    attempt_failures: IntCounterVec,
    pauses: IntCounterVec,
    resumes: IntCounterVec,
    outcomes: IntCounterVec,
}

impl<T, E> RetryerObserver<T, E> for MetricsObserver {
    fn on_success(&self, _value: &T) {
        self.outcomes
            .with_label_values(&[self.operation.as_str(), "success"])
            .inc();
    }

    fn on_error(&self, error: &RetryerError<E>) {
        self.outcomes
            .with_label_values(&[self.operation.as_str(), error.kind()])
            .inc();
    }

    fn on_fail(&self, _failure_count: u32, _error: &E) {
        self.attempt_failures
            .with_label_values(&[self.operation.as_str()])
            .inc();
    }

    fn on_pause(&self) {
        self.pauses.with_label_values(&[self.operation.as_str()]).inc();
    }

    fn on_continue(&self) {
        self.resumes.with_label_values(&[self.operation.as_str()]).inc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::CancelOptions;

    fn counter(metrics: &RetryerMetrics, name: &str, labels: &[&str]) -> Option<f64> {
        let gathered = metrics.registry().gather();
        let family = gathered.iter().find(|m| m.name() == name)?;
        family
            .metric
            .iter()
            .find(|m| {
                let values: Vec<&str> = m.label.iter().map(|l| l.value()).collect();
                values == labels
            })
            .and_then(|m| m.counter.value)
    }

    #[test]
    fn test_metrics_creation() {
        let metrics = RetryerMetrics::new().unwrap();
        metrics.record_outcome("fetch_user", "success");
        assert!(!metrics.registry().gather().is_empty());
    }

    #[test]
    fn test_observer_records_lifecycle() {
        let metrics = RetryerMetrics::new().unwrap();
        let observer = metrics.observer("fetch_user");

        RetryerObserver::<u32, String>::on_fail(&observer, 1, &"timeout".to_string());
        RetryerObserver::<u32, String>::on_fail(&observer, 2, &"timeout".to_string());
        RetryerObserver::<u32, String>::on_pause(&observer);
        RetryerObserver::<u32, String>::on_continue(&observer);
        RetryerObserver::<u32, String>::on_success(&observer, &7);

        assert_eq!(counter(&metrics, "retryer_attempt_failures_total", &["fetch_user"]), Some(2.0));
        assert_eq!(counter(&metrics, "retryer_pauses_total", &["fetch_user"]), Some(1.0));
        assert_eq!(counter(&metrics, "retryer_resumes_total", &["fetch_user"]), Some(1.0));
        assert_eq!(
            counter(&metrics, "retryer_outcomes_total", &["fetch_user", "success"]),
            Some(1.0)
        );
    }

    #[test]
    fn test_observer_labels_error_kind() {
        let metrics = RetryerMetrics::new().unwrap();
        let observer = metrics.observer("sync");

        let cancelled: RetryerError<String> = RetryerError::Cancelled(CancelOptions::default());
        RetryerObserver::<(), String>::on_error(&observer, &cancelled);

        assert_eq!(
            counter(&metrics, "retryer_outcomes_total", &["sync", "cancelled"]),
            Some(1.0)
        );
    }

    #[test]
    fn test_render_text_format() {
        let metrics = RetryerMetrics::new().unwrap();
        metrics.record_outcome("sync", "failed");
        let text = metrics.render().unwrap();
        assert!(text.contains("retryer_outcomes_total{operation=\"sync\",outcome=\"failed\"} 1"));
    }
}

//! Observability for strategy resolution and runs
//!
//! Provides:
//! - Prometheus metrics (runs, failures, run latency, registered strategies)
//! - Structured logging with tracing

use crate::error::StrategyError;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, register_int_gauge, HistogramVec,
    IntCounterVec, IntGauge,
};
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Histogram buckets for run latency (in seconds)
const RUN_LATENCY_BUCKETS: &[f64] = &[
    0.00001, 0.00005, 0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<StrategyMetricsInner> = OnceLock::new();

struct StrategyMetricsInner {
    runs_total: IntCounterVec,
    run_failures_total: IntCounterVec,
    run_duration_seconds: HistogramVec,
    strategies_registered: IntGauge,
}

impl StrategyMetricsInner {
    fn new() -> Self {
        Self {
            runs_total: register_int_counter_vec!(
                "krr_strategy_runs_total",
                "Number of strategy runs, successful or not",
                &["strategy"]
            )
            .expect("Failed to register strategy_runs_total"),

            run_failures_total: register_int_counter_vec!(
                "krr_strategy_run_failures_total",
                "Number of strategy runs that returned an error",
                &["strategy", "kind"]
            )
            .expect("Failed to register strategy_run_failures_total"),

            run_duration_seconds: register_histogram_vec!(
                "krr_strategy_run_duration_seconds",
                "Time spent computing recommendations for one object",
                &["strategy"],
                RUN_LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register strategy_run_duration_seconds"),

            strategies_registered: register_int_gauge!(
                "krr_strategies_registered",
                "Number of strategies in the most recently updated registry"
            )
            .expect("Failed to register strategies_registered"),
        }
    }
}

/// Handle to the global strategy metrics
///
/// Clones share the same underlying Prometheus collectors.
#[derive(Clone)]
pub struct StrategyMetrics {
    _private: (),
}

impl Default for StrategyMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl StrategyMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(StrategyMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &StrategyMetricsInner {
        GLOBAL_METRICS.get_or_init(StrategyMetricsInner::new)
    }

    /// Record one run and its latency
    pub fn observe_run(&self, strategy: &str, duration_secs: f64) {
        self.inner().runs_total.with_label_values(&[strategy]).inc();
        self.inner()
            .run_duration_seconds
            .with_label_values(&[strategy])
            .observe(duration_secs);
    }

    pub fn inc_run_failures(&self, strategy: &str, kind: &str) {
        self.inner()
            .run_failures_total
            .with_label_values(&[strategy, kind])
            .inc();
    }

    pub fn set_strategies_registered(&self, count: i64) {
        self.inner().strategies_registered.set(count);
    }

    pub fn runs(&self, strategy: &str) -> u64 {
        self.inner().runs_total.with_label_values(&[strategy]).get()
    }

    pub fn run_failures(&self, strategy: &str, kind: &str) -> u64 {
        self.inner()
            .run_failures_total
            .with_label_values(&[strategy, kind])
            .get()
    }
}

/// Structured log events for the strategy layer
pub struct StrategyLogger;

impl StrategyLogger {
    pub fn log_registered(strategy: &str, settings_type: &str) {
        debug!(
            event = "strategy_registered",
            strategy = %strategy,
            settings_type = %settings_type,
            "Registered strategy"
        );
    }

    pub fn log_resolved(requested: &str, strategy: &str) {
        debug!(
            event = "strategy_resolved",
            requested = %requested,
            strategy = %strategy,
            "Resolved strategy"
        );
    }

    pub fn log_unknown(requested: &str, available: &[String]) {
        warn!(
            event = "strategy_unknown",
            requested = %requested,
            available = %available.join(", "),
            "Unknown strategy requested"
        );
    }

    pub fn log_run(strategy: &str, object: &str, recommendations: usize, elapsed: Duration) {
        info!(
            event = "strategy_run",
            strategy = %strategy,
            object = %object,
            recommendations = recommendations,
            elapsed_us = elapsed.as_micros() as u64,
            "Computed recommendations"
        );
    }

    pub fn log_run_failed(strategy: &str, object: &str, error: &StrategyError) {
        warn!(
            event = "strategy_run_failed",
            strategy = %strategy,
            object = %object,
            kind = error.kind(),
            error = %error,
            "Strategy run failed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_metrics_counters() {
        let metrics = StrategyMetrics::new();
        let before = metrics.runs("observability-test");

        metrics.observe_run("observability-test", 0.0002);
        metrics.inc_run_failures("observability-test", "recommendation_failed");
        metrics.set_strategies_registered(2);

        assert_eq!(metrics.runs("observability-test"), before + 1);
        assert!(metrics.run_failures("observability-test", "recommendation_failed") >= 1);
    }

    #[test]
    fn test_logger_accepts_errors() {
        let err = StrategyError::recommendation("simple", "default/Pod/a/b", "bad input");
        StrategyLogger::log_run_failed("simple", "default/Pod/a/b", &err);
        StrategyLogger::log_unknown("nope", &["simple".to_string()]);
    }
}

//! The strategy contract
//!
//! A strategy turns the usage history of one workload into a recommendation
//! per resource type. Implementations declare their settings type through
//! [`Strategy::Settings`] and are handed out by the registry as type-erased
//! [`DynStrategy`] handles.

pub mod registry;

use crate::error::{Result, StrategyError};
use crate::models::{HistoryData, K8sObjectData, RunResult};
use crate::observability::{StrategyLogger, StrategyMetrics};
use crate::settings::{Settings, StrategySettings};
use std::fmt;
use std::time::Instant;

/// Trait for recommendation algorithm implementations
///
/// `run` must be a pure function of its inputs and `self.settings()`: no I/O,
/// no hidden state, same output for the same input. Sparse or empty history
/// must not produce an error; `RecommendationFailed` is reserved for object
/// data the strategy cannot work with.
pub trait Strategy: Send + Sync + Sized + 'static {
    /// Name the strategy is registered and looked up under, e.g. `"simple"`
    ///
    /// Matched case-insensitively; stored lower-cased.
    const NAME: &'static str;

    /// Settings type this strategy is parameterized with
    type Settings: Settings;

    fn new(settings: Self::Settings) -> Self;

    fn settings(&self) -> &Self::Settings;

    /// Compute one recommendation per supported resource type in `history_data`
    fn run(&self, history_data: &HistoryData, object_data: &K8sObjectData) -> Result<RunResult>;

    /// Human readable name, title-cased
    fn display_name() -> String {
        title_case(Self::NAME)
    }
}

/// Upper-case the first letter of every word, lower-case the rest
pub fn title_case(name: &str) -> String {
    name.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Object-safe handle to a constructed strategy
pub trait DynStrategy: Send + Sync {
    /// Registry name (lower-case)
    fn name(&self) -> &str;

    fn display_name(&self) -> String {
        title_case(self.name())
    }

    fn base_settings(&self) -> &StrategySettings;

    /// Full settings of the concrete strategy, serialized
    fn settings_json(&self) -> Result<serde_json::Value>;

    fn run(&self, history_data: &HistoryData, object_data: &K8sObjectData) -> Result<RunResult>;
}

impl fmt::Display for dyn DynStrategy + '_ {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_name())
    }
}

impl fmt::Debug for dyn DynStrategy + '_ {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynStrategy")
            .field("name", &self.name())
            .field("settings", &self.settings_json().ok())
            .finish()
    }
}

/// Strategy bound to its registered name, instrumented on every run
pub(crate) struct Bound<S: Strategy> {
    name: String,
    inner: S,
}

impl<S: Strategy> Bound<S> {
    pub(crate) fn new(name: impl Into<String>, settings: S::Settings) -> Self {
        Self {
            name: name.into(),
            inner: S::new(settings),
        }
    }
}

impl<S: Strategy> DynStrategy for Bound<S> {
    fn name(&self) -> &str {
        &self.name
    }

    fn base_settings(&self) -> &StrategySettings {
        self.inner.settings().base()
    }

    fn settings_json(&self) -> Result<serde_json::Value> {
        serde_json::to_value(self.inner.settings())
            .map_err(|e| StrategyError::malformed(self.name.clone(), e.to_string()))
    }

    fn run(&self, history_data: &HistoryData, object_data: &K8sObjectData) -> Result<RunResult> {
        let start = Instant::now();
        let outcome = self.inner.run(history_data, object_data);
        let elapsed = start.elapsed();

        let metrics = StrategyMetrics::new();
        metrics.observe_run(&self.name, elapsed.as_secs_f64());

        let object = object_data.to_string();
        match &outcome {
            Ok(result) => {
                StrategyLogger::log_run(&self.name, &object, result.len(), elapsed);
            }
            Err(e) => {
                metrics.inc_run_failures(&self.name, e.kind());
                StrategyLogger::log_run_failed(&self.name, &object, e);
            }
        }
        outcome
    }
}

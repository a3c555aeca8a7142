//! Percentile-based CPU and peak-based memory recommendations

use super::{percentile, sorted_samples, with_margin, MAX_PERCENTAGE};
use crate::error::{Result, StrategyError};
use crate::models::{HistoryData, K8sObjectData, ResourceRecommendation, ResourceType, RunResult};
use crate::settings::{FieldSpec, Settings, StrategySettings};
use crate::strategy::Strategy;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default CPU percentile used as the request
pub const DEFAULT_CPU_PERCENTILE: f64 = 99.0;

/// Default buffer added on top of peak memory (%)
pub const DEFAULT_MEMORY_BUFFER_PERCENTAGE: f64 = 15.0;

fn default_cpu_percentile() -> f64 {
    DEFAULT_CPU_PERCENTILE
}

fn default_memory_buffer_percentage() -> f64 {
    DEFAULT_MEMORY_BUFFER_PERCENTAGE
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimpleSettings {
    #[serde(flatten)]
    base: StrategySettings,
    #[serde(default = "default_cpu_percentile")]
    cpu_percentile: f64,
    #[serde(default = "default_memory_buffer_percentage")]
    memory_buffer_percentage: f64,
}

impl SimpleSettings {
    pub fn new(
        base: StrategySettings,
        cpu_percentile: f64,
        memory_buffer_percentage: f64,
    ) -> Result<Self> {
        let settings = Self {
            base,
            cpu_percentile,
            memory_buffer_percentage,
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn cpu_percentile(&self) -> f64 {
        self.cpu_percentile
    }

    pub fn memory_buffer_percentage(&self) -> f64 {
        self.memory_buffer_percentage
    }
}

impl Default for SimpleSettings {
    fn default() -> Self {
        Self {
            base: StrategySettings::default(),
            cpu_percentile: DEFAULT_CPU_PERCENTILE,
            memory_buffer_percentage: DEFAULT_MEMORY_BUFFER_PERCENTAGE,
        }
    }
}

impl Settings for SimpleSettings {
    fn fields() -> Vec<FieldSpec> {
        let mut fields = StrategySettings::base_fields();
        fields.push(
            FieldSpec::new(
                "cpu_percentile",
                DEFAULT_CPU_PERCENTILE,
                "The percentile to use for the CPU recommendation.",
            )
            .at_least(0.0)
            .at_most(100.0),
        );
        fields.push(
            FieldSpec::new(
                "memory_buffer_percentage",
                DEFAULT_MEMORY_BUFFER_PERCENTAGE,
                "The percentage of added buffer to the peak memory usage for memory recommendation.",
            )
            .greater_than(0.0)
            .at_most(MAX_PERCENTAGE),
        );
        fields
    }

    fn base(&self) -> &StrategySettings {
        &self.base
    }
}

/// CPU request at a high percentile with no limit; memory request and
/// limit at the peak plus a buffer
pub struct SimpleStrategy {
    settings: SimpleSettings,
}

impl SimpleStrategy {
    fn recommend_cpu(&self, samples: &[Decimal]) -> ResourceRecommendation {
        match percentile(samples, self.settings.cpu_percentile) {
            Some(request) => ResourceRecommendation::new(Some(request), None),
            None => ResourceRecommendation::undefined(),
        }
    }

    fn recommend_memory(
        &self,
        samples: &[Decimal],
        object_data: &K8sObjectData,
    ) -> Result<ResourceRecommendation> {
        let Some(peak) = samples.last().copied() else {
            return Ok(ResourceRecommendation::undefined());
        };
        let target = with_margin(peak, self.settings.memory_buffer_percentage).ok_or_else(|| {
            StrategyError::recommendation(
                Self::NAME,
                object_data,
                format!("peak memory {} overflows with buffer", peak),
            )
        })?;
        Ok(ResourceRecommendation::new(Some(target), Some(target)))
    }
}

impl Strategy for SimpleStrategy {
    const NAME: &'static str = "simple";
    type Settings = SimpleSettings;

    fn new(settings: SimpleSettings) -> Self {
        Self { settings }
    }

    fn settings(&self) -> &SimpleSettings {
        &self.settings
    }

    fn run(&self, history_data: &HistoryData, object_data: &K8sObjectData) -> Result<RunResult> {
        object_data
            .ensure_identified()
            .map_err(|reason| StrategyError::recommendation(Self::NAME, object_data, reason))?;

        let mut result = RunResult::new();
        for (resource, series) in history_data {
            let samples = sorted_samples(series);
            let recommendation = match resource {
                ResourceType::Cpu => self.recommend_cpu(&samples),
                ResourceType::Memory => self.recommend_memory(&samples, object_data)?,
            };
            result.insert(*resource, recommendation);
        }
        Ok(result)
    }
}

impl fmt::Display for SimpleStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&Self::display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ResourceHistoryData;
    use serde_json::json;

    fn series(label: &str, values: &[i64]) -> ResourceHistoryData {
        let mut data = ResourceHistoryData::new();
        data.insert(label.to_string(), values.iter().map(|v| Decimal::from(*v)).collect());
        data
    }

    fn object() -> K8sObjectData {
        K8sObjectData::new("default", "Deployment", "api", "server")
    }

    #[test]
    fn test_name_and_display() {
        assert_eq!(SimpleStrategy::NAME, "simple");
        assert_eq!(SimpleStrategy::new(SimpleSettings::default()).to_string(), "Simple");
    }

    #[test]
    fn test_cpu_percentile_and_memory_buffer() {
        let strategy = SimpleStrategy::new(SimpleSettings::default());
        let mut history = HistoryData::new();
        history.insert(ResourceType::Cpu, series("pod-a", &(1..=100).collect::<Vec<i64>>()));
        history.insert(ResourceType::Memory, series("pod-a", &[100, 400, 200]));

        let result = strategy.run(&history, &object()).unwrap();

        let cpu = &result[&ResourceType::Cpu];
        assert_eq!(cpu.request, Some(Decimal::from(99)));
        assert_eq!(cpu.limit, None);

        let memory = &result[&ResourceType::Memory];
        assert_eq!(memory.request, Some(Decimal::from(460)));
        assert_eq!(memory.limit, Some(Decimal::from(460)));
    }

    #[test]
    fn test_empty_history_yields_undefined_entries() {
        let strategy = SimpleStrategy::new(SimpleSettings::default());
        let mut history = HistoryData::new();
        history.insert(ResourceType::Cpu, series("pod-a", &[]));
        history.insert(ResourceType::Memory, ResourceHistoryData::new());

        let result = strategy.run(&history, &object()).unwrap();
        assert_eq!(result.len(), 2);
        assert!(result.values().all(ResourceRecommendation::is_undefined));
    }

    #[test]
    fn test_unidentified_object_fails() {
        let strategy = SimpleStrategy::new(SimpleSettings::default());
        let object = K8sObjectData::new("default", "Deployment", "api", "");
        let err = strategy.run(&HistoryData::new(), &object).unwrap_err();
        assert!(matches!(err, StrategyError::RecommendationFailed { ref strategy, .. } if strategy == "simple"));
    }

    #[test]
    fn test_settings_bounds() {
        let raw = json!({"cpu_percentile": 101}).as_object().cloned().unwrap();
        assert!(matches!(
            SimpleSettings::from_raw(&raw),
            Err(StrategyError::SchemaViolation { ref field, .. }) if field == "cpu_percentile"
        ));
        assert!(SimpleSettings::new(StrategySettings::default(), 95.0, 0.0).is_err());

        let raw = json!({"cpu_percentile": "95", "history_duration": 24})
            .as_object()
            .cloned()
            .unwrap();
        let settings = SimpleSettings::from_raw(&raw).unwrap();
        assert_eq!(settings.cpu_percentile(), 95.0);
        assert_eq!(settings.base().history_duration(), 24.0);
        assert_eq!(settings.memory_buffer_percentage(), DEFAULT_MEMORY_BUFFER_PERCENTAGE);
    }

    #[test]
    fn test_memory_buffer_upper_bound() {
        assert!(matches!(
            SimpleSettings::new(StrategySettings::default(), 99.0, 1e30),
            Err(StrategyError::SchemaViolation { ref field, .. }) if field == "memory_buffer_percentage"
        ));

        let settings = SimpleSettings::new(StrategySettings::default(), 99.0, MAX_PERCENTAGE).unwrap();
        let mut history = HistoryData::new();
        history.insert(ResourceType::Memory, series("pod-a", &[3]));
        let result = SimpleStrategy::new(settings).run(&history, &object()).unwrap();
        assert_eq!(result[&ResourceType::Memory].request, Some(Decimal::from(30_003)));
    }
}

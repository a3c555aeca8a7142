//! Median/peak recommendations padded by a safety margin

use super::{percentile, sorted_samples, with_margin, MAX_PERCENTAGE};
use crate::error::{Result, StrategyError};
use crate::models::{HistoryData, K8sObjectData, ResourceRecommendation, ResourceType, RunResult};
use crate::settings::{FieldSpec, Settings, StrategySettings};
use crate::strategy::Strategy;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default margin added to both request and limit (%)
pub const DEFAULT_MARGIN_PERCENTAGE: f64 = 20.0;

fn default_margin_percentage() -> f64 {
    DEFAULT_MARGIN_PERCENTAGE
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarginSettings {
    #[serde(flatten)]
    base: StrategySettings,
    #[serde(default = "default_margin_percentage")]
    cpu_margin_percentage: f64,
    #[serde(default = "default_margin_percentage")]
    memory_margin_percentage: f64,
}

impl MarginSettings {
    pub fn new(
        base: StrategySettings,
        cpu_margin_percentage: f64,
        memory_margin_percentage: f64,
    ) -> Result<Self> {
        let settings = Self {
            base,
            cpu_margin_percentage,
            memory_margin_percentage,
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Margin applied to the given resource type (%)
    pub fn margin_for(&self, resource: ResourceType) -> f64 {
        match resource {
            ResourceType::Cpu => self.cpu_margin_percentage,
            ResourceType::Memory => self.memory_margin_percentage,
        }
    }
}

impl Default for MarginSettings {
    fn default() -> Self {
        Self {
            base: StrategySettings::default(),
            cpu_margin_percentage: DEFAULT_MARGIN_PERCENTAGE,
            memory_margin_percentage: DEFAULT_MARGIN_PERCENTAGE,
        }
    }
}

impl Settings for MarginSettings {
    fn fields() -> Vec<FieldSpec> {
        let mut fields = StrategySettings::base_fields();
        fields.push(
            FieldSpec::new(
                "cpu_margin_percentage",
                DEFAULT_MARGIN_PERCENTAGE,
                "Margin added to median and peak CPU usage (in percent).",
            )
            .at_least(0.0)
            .at_most(MAX_PERCENTAGE),
        );
        fields.push(
            FieldSpec::new(
                "memory_margin_percentage",
                DEFAULT_MARGIN_PERCENTAGE,
                "Margin added to median and peak memory usage (in percent).",
            )
            .at_least(0.0)
            .at_most(MAX_PERCENTAGE),
        );
        fields
    }

    fn base(&self) -> &StrategySettings {
        &self.base
    }
}

/// Request at the padded median, limit at the padded peak
pub struct MarginStrategy {
    settings: MarginSettings,
}

impl MarginStrategy {
    fn recommend(
        &self,
        resource: ResourceType,
        samples: &[Decimal],
        object_data: &K8sObjectData,
    ) -> Result<ResourceRecommendation> {
        let (Some(median), Some(peak)) = (percentile(samples, 50.0), samples.last().copied()) else {
            return Ok(ResourceRecommendation::undefined());
        };

        let margin = self.settings.margin_for(resource);
        let pad = |value: Decimal| {
            with_margin(value, margin).ok_or_else(|| {
                StrategyError::recommendation(
                    Self::NAME,
                    object_data,
                    format!("{} usage {} overflows with margin", resource, value),
                )
            })
        };

        Ok(ResourceRecommendation::new(Some(pad(median)?), Some(pad(peak)?)))
    }
}

impl Strategy for MarginStrategy {
    const NAME: &'static str = "margin";
    type Settings = MarginSettings;

    fn new(settings: MarginSettings) -> Self {
        Self { settings }
    }

    fn settings(&self) -> &MarginSettings {
        &self.settings
    }

    fn run(&self, history_data: &HistoryData, object_data: &K8sObjectData) -> Result<RunResult> {
        object_data
            .ensure_identified()
            .map_err(|reason| StrategyError::recommendation(Self::NAME, object_data, reason))?;

        history_data
            .iter()
            .map(|(resource, series)| {
                let samples = sorted_samples(series);
                Ok::<_, StrategyError>((
                    *resource,
                    self.recommend(*resource, &samples, object_data)?,
                ))
            })
            .collect()
    }
}

impl fmt::Display for MarginStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&Self::display_name())
    }
}

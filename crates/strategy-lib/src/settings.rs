//! Strategy settings schema and validation
//!
//! Every strategy is bound to a settings type. A settings type declares its
//! fields as [`FieldSpec`] records; raw caller-supplied values are coerced and
//! checked against those records before the typed value is built, and typed
//! values built in code go through the same checks.

use crate::error::{Result, StrategyError};
use chrono::Duration;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::any::TypeId;
use std::fmt::Debug;
use tracing::debug;

/// Default history window (2 weeks, in hours)
pub const DEFAULT_HISTORY_DURATION_HOURS: f64 = 24.0 * 7.0 * 2.0;

/// Default sampling step (in minutes)
pub const DEFAULT_TIMEFRAME_DURATION_MINUTES: f64 = 15.0;

/// Lower bound shared by both duration fields
pub const MIN_DURATION: f64 = 1.0;

/// Longest history window a `chrono::Duration` can hold (in hours)
pub const MAX_HISTORY_DURATION_HOURS: f64 = (i64::MAX / 3_600_000) as f64;

/// Longest sampling step a `chrono::Duration` can hold (in minutes)
pub const MAX_TIMEFRAME_DURATION_MINUTES: f64 = (i64::MAX / 60_000) as f64;

/// Untyped key/value settings as supplied by a caller
pub type RawSettings = Map<String, Value>;

/// Declared numeric field of a settings type
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub default: f64,
    /// Inclusive lower bound
    pub minimum: Option<f64>,
    /// Exclusive lower bound
    pub exclusive_minimum: Option<f64>,
    /// Inclusive upper bound
    pub maximum: Option<f64>,
}

impl FieldSpec {
    pub fn new(name: &'static str, default: f64, description: &'static str) -> Self {
        Self {
            name,
            description,
            default,
            minimum: None,
            exclusive_minimum: None,
            maximum: None,
        }
    }

    pub fn at_least(self, minimum: f64) -> Self {
        Self {
            minimum: Some(minimum),
            ..self
        }
    }

    pub fn greater_than(self, bound: f64) -> Self {
        Self {
            exclusive_minimum: Some(bound),
            ..self
        }
    }

    pub fn at_most(self, maximum: f64) -> Self {
        Self {
            maximum: Some(maximum),
            ..self
        }
    }

    /// Check a value against the declared bounds
    pub fn check(&self, value: f64) -> Result<f64> {
        if !value.is_finite() {
            return Err(StrategyError::schema(self.name, "value is not a finite number"));
        }
        if let Some(minimum) = self.minimum {
            if value < minimum {
                return Err(StrategyError::schema(
                    self.name,
                    format!("ensure this value is greater than or equal to {}", minimum),
                ));
            }
        }
        if let Some(bound) = self.exclusive_minimum {
            if value <= bound {
                return Err(StrategyError::schema(
                    self.name,
                    format!("ensure this value is greater than {}", bound),
                ));
            }
        }
        if let Some(maximum) = self.maximum {
            if value > maximum {
                return Err(StrategyError::schema(
                    self.name,
                    format!("ensure this value is less than or equal to {}", maximum),
                ));
            }
        }
        Ok(value)
    }

    /// Coerce a raw value (number or numeric string) into a float
    fn coerce(&self, raw: &Value) -> Result<f64> {
        match raw {
            Value::Number(number) => number
                .as_f64()
                .ok_or_else(|| StrategyError::schema(self.name, "value is not a valid float")),
            Value::String(text) => text
                .trim()
                .parse::<f64>()
                .map_err(|_| StrategyError::schema(self.name, "value is not a valid float")),
            Value::Null => Err(StrategyError::schema(
                self.name,
                "none is not an allowed value",
            )),
            _ => Err(StrategyError::schema(self.name, "value is not a valid float")),
        }
    }
}

/// A validated, immutable settings record bound to one strategy
pub trait Settings:
    Serialize + DeserializeOwned + Clone + Debug + PartialEq + Send + Sync + 'static
{
    /// Declared fields, including the base duration fields
    fn fields() -> Vec<FieldSpec>;

    /// Base fields every settings type carries
    fn base(&self) -> &StrategySettings;

    /// Build settings from a raw mapping, applying defaults for absent fields
    fn from_raw(raw: &RawSettings) -> Result<Self> {
        let normalized = normalize_raw(&Self::fields(), raw)?;
        let settings: Self = serde_json::from_value(Value::Object(normalized))
            .map_err(|e| StrategyError::schema(std::any::type_name::<Self>(), e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Check every declared field of an already-typed value
    fn validate(&self) -> Result<()> {
        let value = serde_json::to_value(self)
            .map_err(|e| StrategyError::schema(std::any::type_name::<Self>(), e.to_string()))?;

        for field in Self::fields() {
            match value.get(field.name) {
                Some(Value::Number(number)) => {
                    field.check(number.as_f64().unwrap_or(f64::NAN))?;
                }
                // serde_json turns NaN and infinities into null
                Some(Value::Null) => {
                    field.check(f64::NAN)?;
                }
                Some(_) => {
                    return Err(StrategyError::schema(field.name, "value is not a valid float"))
                }
                None => return Err(StrategyError::schema(field.name, "field required")),
            }
        }
        Ok(())
    }
}

fn normalize_raw(fields: &[FieldSpec], raw: &RawSettings) -> Result<RawSettings> {
    let mut normalized = RawSettings::new();

    for (key, value) in raw {
        match fields.iter().find(|field| field.name == key.as_str()) {
            Some(field) => {
                let coerced = field.check(field.coerce(value)?)?;
                normalized.insert(key.clone(), Value::from(coerced));
            }
            None => debug!(setting = %key, "Ignoring unknown strategy setting"),
        }
    }

    Ok(normalized)
}

fn default_history_duration() -> f64 {
    DEFAULT_HISTORY_DURATION_HOURS
}

fn default_timeframe_duration() -> f64 {
    DEFAULT_TIMEFRAME_DURATION_MINUTES
}

/// Base settings shared by every strategy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategySettings {
    /// Duration of the history data to use (in hours)
    #[serde(default = "default_history_duration")]
    history_duration: f64,
    /// Step for the history data (in minutes)
    #[serde(default = "default_timeframe_duration")]
    timeframe_duration: f64,
}

impl StrategySettings {
    pub fn new(history_duration: f64, timeframe_duration: f64) -> Result<Self> {
        let settings = Self {
            history_duration,
            timeframe_duration,
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn base_fields() -> Vec<FieldSpec> {
        vec![
            FieldSpec::new(
                "history_duration",
                DEFAULT_HISTORY_DURATION_HOURS,
                "The duration of the history data to use (in hours).",
            )
            .at_least(MIN_DURATION)
            .at_most(MAX_HISTORY_DURATION_HOURS),
            FieldSpec::new(
                "timeframe_duration",
                DEFAULT_TIMEFRAME_DURATION_MINUTES,
                "The step for the history data (in minutes).",
            )
            .at_least(MIN_DURATION)
            .at_most(MAX_TIMEFRAME_DURATION_MINUTES),
        ]
    }

    pub fn history_duration(&self) -> f64 {
        self.history_duration
    }

    pub fn timeframe_duration(&self) -> f64 {
        self.timeframe_duration
    }

    pub fn history_timedelta(&self) -> Duration {
        Duration::hours(self.history_duration.trunc() as i64)
            + Duration::milliseconds((self.history_duration.fract() * 3_600_000.0).round() as i64)
    }

    pub fn timeframe_timedelta(&self) -> Duration {
        Duration::minutes(self.timeframe_duration.trunc() as i64)
            + Duration::milliseconds((self.timeframe_duration.fract() * 60_000.0).round() as i64)
    }
}

impl Default for StrategySettings {
    fn default() -> Self {
        Self {
            history_duration: DEFAULT_HISTORY_DURATION_HOURS,
            timeframe_duration: DEFAULT_TIMEFRAME_DURATION_MINUTES,
        }
    }
}

impl Settings for StrategySettings {
    fn fields() -> Vec<FieldSpec> {
        Self::base_fields()
    }

    fn base(&self) -> &StrategySettings {
        self
    }
}

/// Declared settings type of a strategy, recorded at registration
#[derive(Debug, Clone)]
pub struct SettingsTypeInfo {
    type_name: &'static str,
    type_id: TypeId,
    fields: Vec<FieldSpec>,
}

impl SettingsTypeInfo {
    pub fn of<T: Settings>() -> Self {
        Self {
            type_name: std::any::type_name::<T>(),
            type_id: TypeId::of::<T>(),
            fields: T::fields(),
        }
    }

    /// Fully qualified Rust type name
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Type name without its module path
    pub fn short_name(&self) -> &'static str {
        self.type_name.rsplit("::").next().unwrap_or(self.type_name)
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn is<T: 'static>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }
}

//! Error taxonomy shared by settings, strategies and the registry

use thiserror::Error;

/// Errors raised by the strategy layer
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StrategyError {
    /// A settings field is missing its coercion, mistyped or out of bounds
    #[error("Invalid value for `{field}`: {constraint}")]
    SchemaViolation { field: String, constraint: String },

    /// No registered strategy matches the requested name
    #[error("Unknown strategy name: {name}. Available strategies: {}", .available.join(", "))]
    UnknownStrategy { name: String, available: Vec<String> },

    /// A strategy implementation is defective and cannot be registered
    #[error("Malformed strategy definition `{strategy}`: {reason}")]
    MalformedDefinition { strategy: String, reason: String },

    /// Two implementations normalize to the same lower-cased name
    #[error("Strategy name `{name}` is already registered")]
    NameCollision { name: String },

    /// A strategy rejected the workload it was asked to size
    #[error("Strategy `{strategy}` failed for {object}: {reason}")]
    RecommendationFailed {
        strategy: String,
        object: String,
        reason: String,
    },
}

impl StrategyError {
    pub fn schema(field: impl Into<String>, constraint: impl Into<String>) -> Self {
        Self::SchemaViolation {
            field: field.into(),
            constraint: constraint.into(),
        }
    }

    pub fn malformed(strategy: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedDefinition {
            strategy: strategy.into(),
            reason: reason.into(),
        }
    }

    pub fn recommendation(
        strategy: impl Into<String>,
        object: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        Self::RecommendationFailed {
            strategy: strategy.into(),
            object: object.to_string(),
            reason: reason.into(),
        }
    }

    /// Short label used for metrics and structured log fields
    pub fn kind(&self) -> &'static str {
        match self {
            StrategyError::SchemaViolation { .. } => "schema_violation",
            StrategyError::UnknownStrategy { .. } => "unknown_strategy",
            StrategyError::MalformedDefinition { .. } => "malformed_definition",
            StrategyError::NameCollision { .. } => "name_collision",
            StrategyError::RecommendationFailed { .. } => "recommendation_failed",
        }
    }
}

/// Result type for strategy operations
pub type Result<T> = std::result::Result<T, StrategyError>;

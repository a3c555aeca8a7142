//! Resource recommendation strategies
//!
//! This crate provides the extension seam for recommendation algorithms:
//! - Validated strategy settings with a declared field schema
//! - The `Strategy` contract every algorithm implements
//! - A registry resolving strategy names to implementations
//! - The built-in `simple` and `margin` strategies

pub mod config;
pub mod error;
pub mod models;
pub mod observability;
pub mod settings;
pub mod strategies;
pub mod strategy;

pub use config::SettingsLoader;
pub use error::{Result, StrategyError};
pub use models::*;
pub use observability::{StrategyLogger, StrategyMetrics};
pub use settings::{FieldSpec, RawSettings, Settings, SettingsTypeInfo, StrategySettings};
pub use strategy::registry::{StrategyDescriptor, StrategyFactory, StrategyRegistry};
pub use strategy::{DynStrategy, Strategy};

//! Built-in recommendation strategies
//!
//! The default set loaded by the global registry on first use.

mod margin;
mod simple;

pub use margin::{MarginSettings, MarginStrategy};
pub use simple::{SimpleSettings, SimpleStrategy};

use crate::error::Result;
use crate::models::ResourceHistoryData;
use crate::strategy::registry::StrategyRegistry;
use rust_decimal::Decimal;

/// Upper bound for margin and buffer percentages
///
/// Keeps `1 + percentage / 100` representable as a `Decimal`, so a padded
/// sample can only overflow when the sample itself is near `Decimal::MAX`.
pub const MAX_PERCENTAGE: f64 = 1_000_000.0;

/// Register every built-in strategy
pub fn register_builtins(registry: &StrategyRegistry) -> Result<()> {
    registry.register_strategy::<SimpleStrategy>()?;
    registry.register_strategy::<MarginStrategy>()?;
    Ok(())
}

/// All samples of every series, sorted ascending
pub(crate) fn sorted_samples(series: &ResourceHistoryData) -> Vec<Decimal> {
    let mut samples: Vec<Decimal> = series.values().flatten().copied().collect();
    samples.sort();
    samples
}

/// Nearest-rank percentile of sorted samples, `None` when empty
pub(crate) fn percentile(sorted: &[Decimal], p: f64) -> Option<Decimal> {
    if sorted.is_empty() {
        return None;
    }
    let idx = ((p / 100.0) * (sorted.len() - 1) as f64).round() as usize;
    Some(sorted[idx.min(sorted.len() - 1)])
}

/// `value * (1 + percentage / 100)`, `None` if it does not fit a decimal
pub(crate) fn with_margin(value: Decimal, percentage: f64) -> Option<Decimal> {
    let percentage: Decimal = percentage.to_string().parse().ok()?;
    let factor = Decimal::ONE.checked_add(percentage / Decimal::ONE_HUNDRED)?;
    value.checked_mul(factor).map(|v| v.normalize())
}

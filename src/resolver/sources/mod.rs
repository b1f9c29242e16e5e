//! Value source implementations (quote provider, economic series, simulation)

mod economic;
mod quote;
pub mod simulated;

pub use economic::{series_id_from_hint, EconomicSeriesSource};
pub use quote::{ticker_for, QuoteSource};
pub use simulated::SimulatedSource;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{MonitoringItem, Tier};

/// Trait for one resolution tier
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ValueSource: Send + Sync {
    /// Get the source name
    fn name(&self) -> &'static str;

    /// Tier recorded when this source produces the value
    fn tier(&self) -> Tier;

    /// Resolve one observation for the item.
    ///
    /// `Ok(None)` means the source does not cover the item. Provider-level
    /// errors (see [`crate::error::MonitorError::is_provider`]) are treated
    /// the same way by the chain; anything else sends the item straight to
    /// the simulated fallback.
    async fn resolve(&self, item: &MonitoringItem) -> Result<Option<f64>>;
}

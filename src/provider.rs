//! Source abstractions for the two polled inputs

use crate::error::FetchError;
use async_trait::async_trait;

/// Trait for the monitored supply figure
///
/// Implementations do not retry. A failed fetch returns within one request
/// timeout and the polling loop tries again next cycle.
#[async_trait]
pub trait SupplySource: Send + Sync {
    /// Fetches the current number of issued units
    async fn fetch_supply(&self) -> Result<u64, FetchError>;

    /// Returns the name of this source
    fn source_name(&self) -> &'static str;
}

/// Trait for the unit price feed
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Fetches the current unit price in the configured quote currency
    ///
    /// A response without the expected symbol is a [`FetchError`] like any
    /// transport failure.
    async fn fetch_price(&self) -> Result<f64, FetchError>;

    /// Returns the name of this source
    fn source_name(&self) -> &'static str;
}

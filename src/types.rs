//! Types for the supply monitor

use chrono::{DateTime, Utc};
use std::time::Duration;

/// One poll cycle's worth of data
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// Units issued
    pub supply: u64,

    /// Unit price in the configured quote currency
    pub price: f64,

    /// When the sample was taken
    pub timestamp: DateTime<Utc>,
}

impl Sample {
    /// Create a sample stamped with the current time
    pub fn new(supply: u64, price: f64) -> Self {
        Self {
            supply,
            price,
            timestamp: Utc::now(),
        }
    }
}

/// A reportable supply change with its derived metrics
///
/// Metrics are stored unrounded; rounding only happens when rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    pub supply: u64,
    pub previous_supply: u64,
    pub price: f64,
    /// `supply - previous_supply`, never zero
    pub delta: i64,
    /// `100 * supply / max_supply`
    pub percent_of_max: f64,
    /// `supply * price`
    pub market_cap: f64,
    /// `delta * price`
    pub cap_growth: f64,
    /// Time since the previous reportable change, absent for the first one
    pub elapsed: Option<Duration>,
}

/// Point-in-time figures for the on-demand report
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub supply: u64,
    pub price: f64,
    pub percent_of_max: f64,
    pub market_cap: f64,
}

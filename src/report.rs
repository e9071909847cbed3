//! On-demand snapshot report
//!
//! Always reads fresh values from both sources. Nothing here touches the
//! polling loop's state, so no locking is involved.

use crate::{
    config::MonitorConfig,
    constants::DATA_UNAVAILABLE_MESSAGE,
    error::FetchError,
    events::{EventSink, MonitorEvent},
    format::{build_snapshot, render_report},
    provider::{PriceSource, SupplySource},
    types::Snapshot,
};
use chrono::Utc;
use std::sync::Arc;

pub struct ReportService {
    supply: Arc<dyn SupplySource>,
    price: Arc<dyn PriceSource>,
    events: Arc<dyn EventSink>,
    max_supply: u64,
    symbol: String,
    convert: String,
}

impl ReportService {
    pub fn new(
        config: &MonitorConfig,
        supply: Arc<dyn SupplySource>,
        price: Arc<dyn PriceSource>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            supply,
            price,
            events,
            max_supply: config.max_supply,
            symbol: config.symbol.clone(),
            convert: config.convert.clone(),
        }
    }

    /// Fetches both inputs concurrently; fails if either fails
    pub async fn snapshot(&self) -> Result<Snapshot, FetchError> {
        let (supply, price) = tokio::join!(self.supply.fetch_supply(), self.price.fetch_price());
        Ok(build_snapshot(supply?, price?, self.max_supply))
    }

    /// Rendered report, or the fixed unavailable message
    pub async fn report(&self) -> String {
        match self.snapshot().await {
            Ok(snapshot) => {
                self.events.emit(MonitorEvent::ReportServed {
                    timestamp: Utc::now(),
                });
                render_report(&snapshot, &self.symbol, &self.convert)
            }
            Err(e) => {
                self.events.emit(MonitorEvent::ReportUnavailable {
                    error_message: e.to_string(),
                    timestamp: Utc::now(),
                });
                DATA_UNAVAILABLE_MESSAGE.to_string()
            }
        }
    }
}

//! # Supply Monitor
//!
//! Watches a token's issued supply and its market price, and posts a
//! rate-limited alert to a Telegram chat whenever the supply changes. A
//! `/report` chat command answers with a fresh snapshot.
//!
//! ## Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use supply_monitor::{
//!     MonitorConfig, SupplyMonitor, TracingEventSink,
//!     providers::{CoinMarketCapProvider, HttpSupplySource, TelegramClient},
//! };
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = MonitorConfig::from_env()?;
//! let supply = Arc::new(HttpSupplySource::new(config.data_url.clone())?);
//! let price = Arc::new(CoinMarketCapProvider::new(
//!     config.cmc_api_key.clone(),
//!     config.symbol.clone(),
//!     config.convert.clone(),
//! )?);
//! let telegram = Arc::new(TelegramClient::new(config.bot_token.clone(), config.chat_id.clone())?);
//!
//! let monitor = SupplyMonitor::new(&config, supply, price, telegram, Arc::new(TracingEventSink));
//! monitor.run(CancellationToken::new()).await;
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Source failures ([`FetchError`]) and channel failures ([`SendError`]) are
//! reported through the [`EventSink`] and the loop moves on to the next
//! cycle. Only [`ConfigError`] is fatal, and only at startup.

pub mod commands;
pub mod config;
pub mod constants;
pub mod detector;
pub mod error;
pub mod events;
pub mod format;
pub mod limiter;
pub mod metrics;
pub mod monitor;
pub mod notifier;
pub mod provider;
pub mod providers;
pub mod report;
pub mod types;

// Re-export commonly used types
pub use commands::{CommandChannel, CommandListener};
pub use config::MonitorConfig;
pub use detector::ChangeDetector;
pub use error::{ConfigError, FetchError, SendError};
pub use events::{EventSink, MonitorEvent, TracingEventSink};
pub use limiter::RateLimiter;
pub use monitor::{CycleOutcome, SupplyMonitor};
pub use notifier::{Dispatcher, Notifier};
pub use provider::{PriceSource, SupplySource};
pub use report::ReportService;
pub use types::{Alert, Sample, Snapshot};

//! Constants for the supply monitor
//!
//! Values that the deployment never changes live here. Everything that does
//! vary between deployments is read by [`crate::config::MonitorConfig`].

/// Fixed ceiling used to compute percent-of-maximum
pub const MAX_SUPPLY: u64 = 1_000_000_000;

/// Minimum interval between two dispatched alerts (in seconds)
pub const MIN_INTERVAL_SECS: u64 = 15;

/// Default poll interval (in seconds)
pub const DEFAULT_DELAY_SECS: u64 = 10;

/// HTTP request timeout for every outbound call (in seconds)
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Long-poll timeout passed to Telegram `getUpdates` (in seconds)
pub const COMMAND_POLL_TIMEOUT_SECS: u64 = 30;

/// Pause after a failed `getUpdates` call before polling again (in seconds)
pub const COMMAND_RETRY_DELAY_SECS: u64 = 5;

/// CoinMarketCap quotes endpoint
pub const COINMARKETCAP_QUOTES_URL: &str =
    "https://pro-api.coinmarketcap.com/v1/cryptocurrency/quotes/latest";

/// Header carrying the CoinMarketCap API key
pub const COINMARKETCAP_API_KEY_HEADER: &str = "X-CMC_PRO_API_KEY";

/// Default quote symbol
pub const DEFAULT_PRICE_SYMBOL: &str = "AMI";

/// Default quote currency
pub const DEFAULT_PRICE_CONVERT: &str = "USD";

/// Telegram Bot API base URL
pub const TELEGRAM_API_URL: &str = "https://api.telegram.org";

/// Chat command that triggers the on-demand report
pub const REPORT_COMMAND: &str = "report";

/// Placeholder substituted for secrets in log output
pub const REDACTED: &str = "[TOKEN]";

/// User agent for HTTP requests
pub const USER_AGENT: &str = concat!("supply-monitor/", env!("CARGO_PKG_VERSION"));

/// Fixed notification sent once at startup
pub const STARTED_MESSAGE: &str = "✅ Monitor started, tracking token supply.";

/// Reply used when the on-demand report cannot fetch fresh data
pub const DATA_UNAVAILABLE_MESSAGE: &str = "⚠️ Data unavailable, try again later.";

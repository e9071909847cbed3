//! Runtime configuration
//!
//! Loaded once at startup and handed to each component by value. A missing
//! credential or URL is a [`ConfigError`] and the process refuses to start.

use std::time::Duration;

use reqwest::Url;

use crate::{
    constants::{
        DEFAULT_DELAY_SECS, DEFAULT_PRICE_CONVERT, DEFAULT_PRICE_SYMBOL, MAX_SUPPLY,
        MIN_INTERVAL_SECS,
    },
    error::ConfigError,
};

#[derive(Clone)]
pub struct MonitorConfig {
    /// Telegram bot token (TELEGRAM_BOT_TOKEN)
    pub bot_token: String,
    /// Destination chat for alerts (TELEGRAM_CHAT_ID)
    pub chat_id: String,
    /// CoinMarketCap API key (CMC_API_KEY)
    pub cmc_api_key: String,
    /// Plain-text supply endpoint (DATA_URL)
    pub data_url: Url,
    /// Poll interval (DELAY, seconds)
    pub delay: Duration,
    /// Quote symbol (PRICE_SYMBOL)
    pub symbol: String,
    /// Quote currency (PRICE_CONVERT)
    pub convert: String,
    /// Tracing filter used when RUST_LOG is unset (LOG_LEVEL)
    pub log_level: String,
    pub max_supply: u64,
    pub min_interval: Duration,
}

impl MonitorConfig {
    /// Reads configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through `lookup`, which maps a variable name to
    /// its value
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| -> Result<String, ConfigError> {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| ConfigError::MissingEnv(key.to_string()))
        };
        let optional = |key: &str, default: &str| -> String {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let bot_token = required("TELEGRAM_BOT_TOKEN")?;
        let chat_id = required("TELEGRAM_CHAT_ID")?;
        let cmc_api_key = required("CMC_API_KEY")?;

        let raw_url = required("DATA_URL")?;
        let data_url = Url::parse(&raw_url)
            .map_err(|e| ConfigError::invalid("DATA_URL", e.to_string()))?;
        if !matches!(data_url.scheme(), "http" | "https") {
            return Err(ConfigError::invalid(
                "DATA_URL",
                format!("unsupported scheme '{}'", data_url.scheme()),
            ));
        }

        let delay_secs = optional("DELAY", &DEFAULT_DELAY_SECS.to_string())
            .parse::<u64>()
            .map_err(|_| ConfigError::invalid("DELAY", "must be a whole number of seconds"))?;
        if delay_secs == 0 {
            return Err(ConfigError::invalid("DELAY", "must be greater than zero"));
        }

        Ok(Self {
            bot_token,
            chat_id,
            cmc_api_key,
            data_url,
            delay: Duration::from_secs(delay_secs),
            symbol: optional("PRICE_SYMBOL", DEFAULT_PRICE_SYMBOL).to_uppercase(),
            convert: optional("PRICE_CONVERT", DEFAULT_PRICE_CONVERT).to_uppercase(),
            log_level: optional("LOG_LEVEL", "info"),
            max_supply: MAX_SUPPLY,
            min_interval: Duration::from_secs(MIN_INTERVAL_SECS),
        })
    }
}

// Hand-written so credentials never end up in a `{:?}` log line.
impl std::fmt::Debug for MonitorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MonitorConfig")
            .field("bot_token", &"<redacted>")
            .field("chat_id", &self.chat_id)
            .field("cmc_api_key", &"<redacted>")
            .field("data_url", &self.data_url.as_str())
            .field("delay", &self.delay)
            .field("symbol", &self.symbol)
            .field("convert", &self.convert)
            .field("log_level", &self.log_level)
            .field("max_supply", &self.max_supply)
            .field("min_interval", &self.min_interval)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn complete() -> HashMap<String, String> {
        env(&[
            ("TELEGRAM_BOT_TOKEN", "123:abc"),
            ("TELEGRAM_CHAT_ID", "-100200300"),
            ("CMC_API_KEY", "cmc-key"),
            ("DATA_URL", "https://example.com/supply"),
        ])
    }

    fn load(vars: &HashMap<String, String>) -> Result<MonitorConfig, ConfigError> {
        MonitorConfig::from_lookup(|k| vars.get(k).cloned())
    }

    #[test]
    fn test_defaults() {
        let cfg = load(&complete()).unwrap();
        assert_eq!(cfg.delay, Duration::from_secs(DEFAULT_DELAY_SECS));
        assert_eq!(cfg.symbol, "AMI");
        assert_eq!(cfg.convert, "USD");
        assert_eq!(cfg.max_supply, 1_000_000_000);
        assert_eq!(cfg.min_interval, Duration::from_secs(15));
        assert_eq!(cfg.log_level, "info");
    }

    #[test]
    fn test_missing_required_var() {
        for key in ["TELEGRAM_BOT_TOKEN", "TELEGRAM_CHAT_ID", "CMC_API_KEY", "DATA_URL"] {
            let mut vars = complete();
            vars.remove(key);
            assert_eq!(load(&vars).unwrap_err(), ConfigError::MissingEnv(key.to_string()));
        }
    }

    #[test]
    fn test_blank_var_counts_as_missing() {
        let mut vars = complete();
        vars.insert("CMC_API_KEY".into(), "   ".into());
        assert_eq!(
            load(&vars).unwrap_err(),
            ConfigError::MissingEnv("CMC_API_KEY".into())
        );
    }

    #[test]
    fn test_invalid_delay() {
        for bad in ["0", "ten", "-5"] {
            let mut vars = complete();
            vars.insert("DELAY".into(), bad.into());
            assert!(matches!(
                load(&vars),
                Err(ConfigError::Invalid { ref var, .. }) if var == "DELAY"
            ));
        }
    }

    #[test]
    fn test_invalid_url() {
        let mut vars = complete();
        vars.insert("DATA_URL".into(), "not a url".into());
        assert!(matches!(load(&vars), Err(ConfigError::Invalid { .. })));

        vars.insert("DATA_URL".into(), "ftp://example.com/supply".into());
        assert!(matches!(load(&vars), Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_overrides() {
        let mut vars = complete();
        vars.insert("DELAY".into(), "30".into());
        vars.insert("PRICE_SYMBOL".into(), "btc".into());
        let cfg = load(&vars).unwrap();
        assert_eq!(cfg.delay, Duration::from_secs(30));
        assert_eq!(cfg.symbol, "BTC");
    }

    #[test]
    fn test_debug_hides_credentials() {
        let cfg = load(&complete()).unwrap();
        let dbg = format!("{cfg:?}");
        assert!(!dbg.contains("123:abc"));
        assert!(!dbg.contains("cmc-key"));
    }
}

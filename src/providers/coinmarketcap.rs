//! CoinMarketCap price provider implementation

use super::source_client;
use crate::{
    constants::{COINMARKETCAP_API_KEY_HEADER, COINMARKETCAP_QUOTES_URL, REQUEST_TIMEOUT_SECS},
    error::FetchError,
    provider::PriceSource,
};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;

/// Status block CoinMarketCap attaches to every response
#[derive(Debug, Deserialize)]
struct CmcStatus {
    #[serde(default)]
    error_code: i64,
    #[serde(default)]
    error_message: Option<String>,
}

/// CoinMarketCap price provider
///
/// Queries `quotes/latest` for a single symbol and reads
/// `data.<SYMBOL>.quote.<CONVERT>.price`.
pub struct CoinMarketCapProvider {
    client: Client,
    base_url: String,
    api_key: String,
    symbol: String,
    convert: String,
}

impl CoinMarketCapProvider {
    /// Creates a new provider against the public quotes endpoint
    pub fn new(
        api_key: impl Into<String>,
        symbol: impl Into<String>,
        convert: impl Into<String>,
    ) -> Result<Self, FetchError> {
        Self::with_base_url(COINMARKETCAP_QUOTES_URL, api_key, symbol, convert)
    }

    /// Creates a new provider against a custom quotes endpoint
    pub fn with_base_url(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        symbol: impl Into<String>,
        convert: impl Into<String>,
    ) -> Result<Self, FetchError> {
        Ok(Self {
            client: source_client(Duration::from_secs(REQUEST_TIMEOUT_SECS))?,
            base_url: base_url.into(),
            api_key: api_key.into(),
            symbol: symbol.into(),
            convert: convert.into(),
        })
    }

    /// Replaces the per-request timeout
    pub fn with_timeout(self, timeout: Duration) -> Result<Self, FetchError> {
        Ok(Self {
            client: source_client(timeout)?,
            ..self
        })
    }

    /// Extracts the price for `symbol` in `convert` from a response body
    pub fn extract_price(body: &str, symbol: &str, convert: &str) -> Result<f64, FetchError> {
        let value: serde_json::Value = serde_json::from_str(body).map_err(|e| {
            FetchError::InvalidResponse(format!("Failed to parse CoinMarketCap response: {}", e))
        })?;

        if let Some(status) = value.get("status") {
            if let Ok(status) = serde_json::from_value::<CmcStatus>(status.clone()) {
                if status.error_code != 0 {
                    return Err(FetchError::ApiError(format!(
                        "CoinMarketCap error {}: {}",
                        status.error_code,
                        status.error_message.unwrap_or_default()
                    )));
                }
            }
        }

        // v1 keys the data map by symbol; some plans return a one-element list
        let entry = value
            .get("data")
            .and_then(|data| data.get(symbol))
            .map(|entry| match entry {
                serde_json::Value::Array(items) => items.first().unwrap_or(entry),
                _ => entry,
            })
            .ok_or_else(|| FetchError::MissingSymbol(symbol.to_string()))?;

        let price = entry
            .get("quote")
            .and_then(|quote| quote.get(convert))
            .and_then(|quote| quote.get("price"))
            .ok_or_else(|| FetchError::MissingSymbol(format!("{}/{}", symbol, convert)))?;

        let price = price.as_f64().ok_or_else(|| {
            FetchError::InvalidResponse(format!("{}/{} price is not a number", symbol, convert))
        })?;

        if !price.is_finite() || price < 0.0 {
            return Err(FetchError::InvalidResponse(format!(
                "{}/{} price out of range: {}",
                symbol, convert, price
            )));
        }

        Ok(price)
    }
}

#[async_trait]
impl PriceSource for CoinMarketCapProvider {
    async fn fetch_price(&self) -> Result<f64, FetchError> {
        tracing::debug!(symbol = %self.symbol, convert = %self.convert, "Fetching price from CoinMarketCap");

        let response = self
            .client
            .get(&self.base_url)
            .header(COINMARKETCAP_API_KEY_HEADER, &self.api_key)
            .query(&[("symbol", &self.symbol), ("convert", &self.convert)])
            .send()
            .await
            .map_err(FetchError::from_request)?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(FetchError::Unauthorized(format!("HTTP {}", status)));
        }
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(FetchError::RateLimitExceeded);
        }
        if !status.is_success() {
            return Err(FetchError::ApiError(format!(
                "HTTP {}: {}",
                status,
                response.text().await.unwrap_or_default()
            )));
        }

        let body = response.text().await.map_err(FetchError::from_request)?;
        let price = Self::extract_price(&body, &self.symbol, &self.convert)?;

        tracing::debug!(price, symbol = %self.symbol, "Fetched price from CoinMarketCap");
        Ok(price)
    }

    fn source_name(&self) -> &'static str {
        "coinmarketcap"
    }
}

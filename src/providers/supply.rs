//! Plain-text supply endpoint

use super::source_client;
use crate::{constants::REQUEST_TIMEOUT_SECS, error::FetchError, provider::SupplySource};
use async_trait::async_trait;
use reqwest::{Client, Url};
use std::time::Duration;

/// Reads the issued supply from an endpoint whose body is a bare number
pub struct HttpSupplySource {
    client: Client,
    url: Url,
}

impl HttpSupplySource {
    /// Creates a new supply source for `url`
    pub fn new(url: Url) -> Result<Self, FetchError> {
        let client = source_client(Duration::from_secs(REQUEST_TIMEOUT_SECS))?;
        Ok(Self { client, url })
    }

    /// Replaces the per-request timeout
    pub fn with_timeout(self, timeout: Duration) -> Result<Self, FetchError> {
        Ok(Self {
            client: source_client(timeout)?,
            ..self
        })
    }
}

/// Parses a numeric body, possibly fractional, truncating toward zero
pub fn parse_supply(body: &str) -> Result<u64, FetchError> {
    let trimmed = body.trim();
    let value: f64 = trimmed.parse().map_err(|_| {
        FetchError::InvalidResponse(format!("supply body is not a number: {:?}", trimmed))
    })?;

    if !value.is_finite() || value < 0.0 {
        return Err(FetchError::InvalidResponse(format!(
            "supply out of range: {}",
            value
        )));
    }
    // deltas between samples are signed 64-bit
    if value >= i64::MAX as f64 {
        return Err(FetchError::InvalidResponse(format!(
            "supply too large: {}",
            value
        )));
    }

    Ok(value.trunc() as u64)
}

#[async_trait]
impl SupplySource for HttpSupplySource {
    async fn fetch_supply(&self) -> Result<u64, FetchError> {
        tracing::debug!(url = %self.url, "Fetching supply");

        let response = self
            .client
            .get(self.url.clone())
            .send()
            .await
            .map_err(FetchError::from_request)?;

        if !response.status().is_success() {
            return Err(FetchError::ApiError(format!("HTTP {}", response.status())));
        }

        let body = response.text().await.map_err(FetchError::from_request)?;
        let supply = parse_supply(&body)?;

        tracing::debug!(supply, "Fetched supply");
        Ok(supply)
    }

    fn source_name(&self) -> &'static str {
        "supply-endpoint"
    }
}

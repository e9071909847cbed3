//! Error types for the supply monitor

use thiserror::Error;

use crate::constants::REDACTED;

/// Errors that can occur when fetching supply or price data
///
/// Callers never branch on the variant: any `FetchError` means "skip this
/// cycle". The variants exist for the log line.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network request failed
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// Response body could not be interpreted
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The API rejected our credentials
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// Quote response did not contain the expected symbol/currency
    #[error("Symbol not found in response: {0}")]
    MissingSymbol(String),

    /// Provider API error
    #[error("Provider API error: {0}")]
    ApiError(String),

    /// Timeout waiting for response
    #[error("Request timeout")]
    Timeout,
}

impl FetchError {
    /// Maps a reqwest error, keeping timeouts distinguishable in logs
    pub fn from_request(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::NetworkError(err)
        }
    }
}

/// Errors that can occur when delivering a notification
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SendError {
    /// Transport failure talking to the channel
    #[error("Network error: {0}")]
    Network(String),

    /// The channel answered with an error
    #[error("API error: {0}")]
    Api(String),

    /// The channel answered with something we could not parse
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl SendError {
    /// Builds a network error with the request URL stripped and `secret`
    /// masked, since Telegram URLs embed the bot token
    pub fn network(err: reqwest::Error, secret: &str) -> Self {
        Self::Network(redact_secret(&err.without_url().to_string(), secret))
    }

    /// Builds an API error with `secret` masked
    pub fn api(msg: impl AsRef<str>, secret: &str) -> Self {
        Self::Api(redact_secret(msg.as_ref(), secret))
    }
}

/// Fatal startup errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required environment variable is missing or empty
    #[error("missing required env var: {0}")]
    MissingEnv(String),

    /// An environment variable is present but unusable
    #[error("invalid value for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

impl ConfigError {
    /// Creates an Invalid error
    pub fn invalid(var: &str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            var: var.to_string(),
            reason: reason.into(),
        }
    }
}

/// Replaces every occurrence of `secret` in `text` with a placeholder
pub fn redact_secret(text: &str, secret: &str) -> String {
    if secret.is_empty() {
        return text.to_string();
    }
    text.replace(secret, REDACTED)
}

//! Concrete sources and channels

pub mod coinmarketcap;
pub mod supply;
pub mod telegram;

use crate::{constants::USER_AGENT, error::FetchError};
use reqwest::Client;
use std::time::Duration;

/// Client shared by the fetch sources; every request is bounded by `timeout`
fn source_client(timeout: Duration) -> Result<Client, FetchError> {
    Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .map_err(FetchError::NetworkError)
}

pub use coinmarketcap::CoinMarketCapProvider;
pub use supply::HttpSupplySource;
pub use telegram::TelegramClient;

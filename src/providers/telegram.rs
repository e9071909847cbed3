//! Telegram Bot API channel
//!
//! `sendMessage` backs [`Notifier`], `getUpdates` long polling backs
//! [`CommandChannel`]. Request URLs embed the bot token, so every error
//! leaving this module is passed through [`crate::error::redact_secret`].

use crate::{
    commands::{parse_command, CommandChannel, IncomingUpdate},
    constants::{COMMAND_POLL_TIMEOUT_SECS, REQUEST_TIMEOUT_SECS, TELEGRAM_API_URL, USER_AGENT},
    error::SendError,
    notifier::Notifier,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::time::Duration;

/// Envelope around every Bot API response
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    error_code: Option<i64>,
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct Update {
    update_id: i64,
    #[serde(default)]
    message: Option<Message>,
}

#[derive(Debug, Deserialize)]
struct Message {
    chat: Chat,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Chat {
    id: i64,
}

pub struct TelegramClient {
    client: Client,
    api_base: String,
    token: String,
    chat_id: String,
    poll_timeout: Duration,
}

impl TelegramClient {
    /// Creates a client for the public Bot API that notifies `chat_id`
    pub fn new(token: impl Into<String>, chat_id: impl Into<String>) -> Result<Self, SendError> {
        Self::with_api_base(TELEGRAM_API_URL, token, chat_id)
    }

    /// Creates a client against a custom Bot API base URL
    pub fn with_api_base(
        api_base: impl Into<String>,
        token: impl Into<String>,
        chat_id: impl Into<String>,
    ) -> Result<Self, SendError> {
        let token = token.into();
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| SendError::network(e, &token))?;

        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token,
            chat_id: chat_id.into(),
            poll_timeout: Duration::from_secs(COMMAND_POLL_TIMEOUT_SECS),
        })
    }

    /// Overrides the long-poll timeout used by `getUpdates`
    pub fn with_poll_timeout(mut self, poll_timeout: Duration) -> Self {
        self.poll_timeout = poll_timeout;
        self
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.token, method)
    }

    /// Sends `text` to an arbitrary chat
    pub async fn send_message(&self, chat_id: &str, text: &str) -> Result<(), SendError> {
        let response = self
            .client
            .post(self.method_url("sendMessage"))
            .json(&SendMessageRequest { chat_id, text })
            .send()
            .await
            .map_err(|e| SendError::network(e, &self.token))?;

        let _: serde_json::Value = self.read_result(response).await?;
        Ok(())
    }

    /// Fetches updates newer than `offset`, waiting up to the poll timeout
    pub async fn get_updates(&self, offset: Option<i64>) -> Result<Vec<IncomingUpdate>, SendError> {
        let mut query = vec![("timeout", self.poll_timeout.as_secs().to_string())];
        if let Some(offset) = offset {
            query.push(("offset", offset.to_string()));
        }

        let response = self
            .client
            .get(self.method_url("getUpdates"))
            .query(&query)
            .timeout(self.poll_timeout + Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .send()
            .await
            .map_err(|e| SendError::network(e, &self.token))?;

        let updates: Vec<Update> = self.read_result(response).await?;
        Ok(updates
            .into_iter()
            .map(|update| {
                let chat_id = update.message.as_ref().map(|m| m.chat.id);
                let command = update
                    .message
                    .and_then(|m| m.text)
                    .and_then(|text| parse_command(&text));
                IncomingUpdate {
                    update_id: update.update_id,
                    chat_id,
                    command,
                }
            })
            .collect())
    }

    async fn read_result<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, SendError> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SendError::network(e, &self.token))?;

        let parsed: ApiResponse<T> = serde_json::from_str(&body).map_err(|e| {
            if status.is_success() {
                SendError::InvalidResponse(e.to_string())
            } else {
                SendError::api(format!("HTTP {}", status), &self.token)
            }
        })?;

        if !parsed.ok {
            return Err(SendError::api(
                format!(
                    "{} ({})",
                    parsed.description.unwrap_or_else(|| "request rejected".to_string()),
                    parsed.error_code.unwrap_or(i64::from(status.as_u16())),
                ),
                &self.token,
            ));
        }

        parsed
            .result
            .ok_or_else(|| SendError::InvalidResponse("missing result".to_string()))
    }
}

#[async_trait]
impl Notifier for TelegramClient {
    async fn send_text(&self, text: &str) -> Result<(), SendError> {
        self.send_message(&self.chat_id, text).await
    }

    fn channel_name(&self) -> &'static str {
        "telegram"
    }
}

#[async_trait]
impl CommandChannel for TelegramClient {
    async fn poll_updates(&self, offset: Option<i64>) -> Result<Vec<IncomingUpdate>, SendError> {
        self.get_updates(offset).await
    }

    async fn reply(&self, chat_id: i64, text: &str) -> Result<(), SendError> {
        self.send_message(&chat_id.to_string(), text).await
    }
}

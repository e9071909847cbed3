//! Inbound chat commands
//!
//! The listener long-polls a [`CommandChannel`] and answers `/report` with a
//! fresh [`ReportService`] snapshot. It runs as its own task beside the
//! polling loop and stops on the shared cancellation token.

use crate::{
    constants::{COMMAND_RETRY_DELAY_SECS, REPORT_COMMAND},
    error::SendError,
    report::ReportService,
};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// One update pulled from the channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingUpdate {
    /// Monotonic id used to acknowledge the update
    pub update_id: i64,
    /// Chat the update came from, if it was a message
    pub chat_id: Option<i64>,
    /// Command name without the slash or bot suffix, if the message was one
    pub command: Option<String>,
}

/// Command-subscription primitive of the notification channel
#[async_trait]
pub trait CommandChannel: Send + Sync {
    /// Waits for updates newer than `offset`
    async fn poll_updates(&self, offset: Option<i64>) -> Result<Vec<IncomingUpdate>, SendError>;

    /// Replies to `chat_id`
    async fn reply(&self, chat_id: i64, text: &str) -> Result<(), SendError>;
}

/// Extracts the command name from a message: `/report@my_bot now` -> `report`
pub fn parse_command(text: &str) -> Option<String> {
    let first = text.split_whitespace().next()?;
    let name = first.strip_prefix('/')?;
    let name = name.split('@').next().unwrap_or(name);
    if name.is_empty() {
        return None;
    }
    Some(name.to_ascii_lowercase())
}

pub struct CommandListener {
    channel: Arc<dyn CommandChannel>,
    report: Arc<ReportService>,
    retry_delay: Duration,
}

impl CommandListener {
    pub fn new(channel: Arc<dyn CommandChannel>, report: Arc<ReportService>) -> Self {
        Self {
            channel,
            report,
            retry_delay: Duration::from_secs(COMMAND_RETRY_DELAY_SECS),
        }
    }

    /// Overrides the pause after a failed poll
    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    /// Polls until `shutdown` is cancelled
    pub async fn run(self, shutdown: CancellationToken) {
        tracing::info!(command = REPORT_COMMAND, "Command listener started");
        let mut offset = None;

        loop {
            let polled = tokio::select! {
                _ = shutdown.cancelled() => break,
                polled = self.channel.poll_updates(offset) => polled,
            };

            match polled {
                Ok(updates) => {
                    if let Some(last) = updates.iter().map(|u| u.update_id).max() {
                        offset = Some(last + 1);
                    }
                    for update in updates {
                        tokio::select! {
                            _ = shutdown.cancelled() => return,
                            _ = self.handle(update) => {}
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Polling for commands failed");
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        _ = tokio::time::sleep(self.retry_delay) => {}
                    }
                }
            }
        }

        tracing::info!("Command listener stopped");
    }

    /// Answers a single update; returns whether a reply was sent
    pub async fn handle(&self, update: IncomingUpdate) -> bool {
        let (Some(chat_id), Some(command)) = (update.chat_id, update.command) else {
            return false;
        };
        if command != REPORT_COMMAND {
            tracing::debug!(command = %command, "Ignoring unknown command");
            return false;
        }

        let text = self.report.report().await;
        match self.channel.reply(chat_id, &text).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(error = %e, chat_id, "Failed to reply to report command");
                false
            }
        }
    }
}

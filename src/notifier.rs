//! Outbound notifications

use crate::{
    error::SendError,
    events::{EventSink, MonitorEvent},
};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

/// Send-text primitive of the notification channel
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Sends `text` to the configured destination
    async fn send_text(&self, text: &str) -> Result<(), SendError>;

    /// Returns the name of this channel
    fn channel_name(&self) -> &'static str;
}

/// Best-effort sender used by the polling loop
///
/// Failures are reported as [`MonitorEvent::DispatchFailed`] and swallowed.
pub struct Dispatcher {
    notifier: Arc<dyn Notifier>,
    events: Arc<dyn EventSink>,
}

impl Dispatcher {
    pub fn new(notifier: Arc<dyn Notifier>, events: Arc<dyn EventSink>) -> Self {
        Self { notifier, events }
    }

    /// Sends `text`, returning whether the channel accepted it
    pub async fn dispatch(&self, text: &str) -> bool {
        match self.notifier.send_text(text).await {
            Ok(()) => true,
            Err(e) => {
                self.events.emit(MonitorEvent::DispatchFailed {
                    error_message: format!("{}: {}", self.notifier.channel_name(), e),
                    timestamp: Utc::now(),
                });
                false
            }
        }
    }
}

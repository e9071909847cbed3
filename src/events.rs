//! Monitor events and the sink they are emitted through
//!
//! Components never log directly; they emit a [`MonitorEvent`] into an
//! injected [`EventSink`]. Production wires [`TracingEventSink`]; tests wire
//! a recording sink and assert on what was emitted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Something observable happened in the monitor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MonitorEvent {
    /// Polling loop started
    Started {
        delay_secs: u64,
        min_interval_secs: u64,
        timestamp: DateTime<Utc>,
    },

    /// A source failed; the cycle was skipped
    FetchFailed {
        source: String,
        error_message: String,
        timestamp: DateTime<Utc>,
    },

    /// First sample seen, stored as the comparison baseline
    BaselineSet {
        supply: u64,
        timestamp: DateTime<Utc>,
    },

    /// A supply change was detected
    ChangeDetected {
        previous_supply: u64,
        supply: u64,
        delta: i64,
        message: String,
        timestamp: DateTime<Utc>,
    },

    /// Alert delivered to the channel
    AlertDispatched {
        supply: u64,
        timestamp: DateTime<Utc>,
    },

    /// Alert dropped by the rate limiter
    AlertSuppressed {
        supply: u64,
        timestamp: DateTime<Utc>,
    },

    /// Channel refused or failed a send
    DispatchFailed {
        error_message: String,
        timestamp: DateTime<Utc>,
    },

    /// On-demand report answered with fresh data
    ReportServed { timestamp: DateTime<Utc> },

    /// On-demand report could not fetch fresh data
    ReportUnavailable {
        error_message: String,
        timestamp: DateTime<Utc>,
    },

    /// Shutdown signal received
    ShuttingDown { timestamp: DateTime<Utc> },
}

impl MonitorEvent {
    /// Get the event type as string
    pub fn event_type(&self) -> &'static str {
        match self {
            MonitorEvent::Started { .. } => "STARTED",
            MonitorEvent::FetchFailed { .. } => "FETCH_FAILED",
            MonitorEvent::BaselineSet { .. } => "BASELINE_SET",
            MonitorEvent::ChangeDetected { .. } => "CHANGE_DETECTED",
            MonitorEvent::AlertDispatched { .. } => "ALERT_DISPATCHED",
            MonitorEvent::AlertSuppressed { .. } => "ALERT_SUPPRESSED",
            MonitorEvent::DispatchFailed { .. } => "DISPATCH_FAILED",
            MonitorEvent::ReportServed { .. } => "REPORT_SERVED",
            MonitorEvent::ReportUnavailable { .. } => "REPORT_UNAVAILABLE",
            MonitorEvent::ShuttingDown { .. } => "SHUTTING_DOWN",
        }
    }
}

impl std::fmt::Display for MonitorEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MonitorEvent::Started {
                delay_secs,
                min_interval_secs,
                ..
            } => write!(
                f,
                "Monitor started (delay {}s, min interval {}s)",
                delay_secs, min_interval_secs
            ),
            MonitorEvent::FetchFailed {
                source,
                error_message,
                ..
            } => write!(f, "Fetch from {} failed: {}", source, error_message),
            MonitorEvent::BaselineSet { supply, .. } => {
                write!(f, "Baseline supply set to {}", supply)
            }
            MonitorEvent::ChangeDetected {
                previous_supply,
                supply,
                delta,
                ..
            } => write!(
                f,
                "Supply changed {} -> {} ({:+})",
                previous_supply, supply, delta
            ),
            MonitorEvent::AlertDispatched { supply, .. } => {
                write!(f, "Alert dispatched for supply {}", supply)
            }
            MonitorEvent::AlertSuppressed { supply, .. } => {
                write!(f, "Alert for supply {} suppressed, sending too often", supply)
            }
            MonitorEvent::DispatchFailed { error_message, .. } => {
                write!(f, "Dispatch failed: {}", error_message)
            }
            MonitorEvent::ReportServed { .. } => write!(f, "Report served"),
            MonitorEvent::ReportUnavailable { error_message, .. } => {
                write!(f, "Report unavailable: {}", error_message)
            }
            MonitorEvent::ShuttingDown { .. } => write!(f, "Shutting down"),
        }
    }
}

/// Receives monitor events
pub trait EventSink: Send + Sync {
    fn emit(&self, event: MonitorEvent);
}

/// Forwards events to `tracing` with structured fields
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&self, event: MonitorEvent) {
        let kind = event.event_type();
        match &event {
            MonitorEvent::FetchFailed { source, error_message, .. } => {
                tracing::error!(event = kind, source = %source, error = %error_message, "{}", event)
            }
            MonitorEvent::DispatchFailed { error_message, .. } => {
                tracing::error!(event = kind, error = %error_message, "{}", event)
            }
            MonitorEvent::AlertSuppressed { supply, .. } => {
                tracing::warn!(event = kind, supply, "{}", event)
            }
            MonitorEvent::ReportUnavailable { error_message, .. } => {
                tracing::warn!(event = kind, error = %error_message, "{}", event)
            }
            MonitorEvent::ChangeDetected { message, .. } => {
                tracing::info!(event = kind, "{}\n{}", event, message)
            }
            MonitorEvent::BaselineSet { supply, .. } => {
                tracing::info!(event = kind, supply, "{}", event)
            }
            MonitorEvent::ReportServed { .. } => tracing::debug!(event = kind, "{}", event),
            _ => tracing::info!(event = kind, "{}", event),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_and_type() {
        let event = MonitorEvent::ChangeDetected {
            previous_supply: 1_000,
            supply: 1_500,
            delta: 500,
            message: String::new(),
            timestamp: Utc::now(),
        };
        assert_eq!(event.event_type(), "CHANGE_DETECTED");
        assert_eq!(event.to_string(), "Supply changed 1000 -> 1500 (+500)");
    }

    #[test]
    fn test_serializes_with_tag() {
        let event = MonitorEvent::AlertSuppressed {
            supply: 7,
            timestamp: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "ALERT_SUPPRESSED");
        assert_eq!(json["supply"], 7);
    }
}

//! Minimum-interval throttle for outgoing alerts

use std::time::{Duration, Instant};

/// Allows at most one dispatch per `min_interval`
///
/// A rejected candidate is not queued. Callers drop it and evaluate the next
/// change on its own.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    min_interval: Duration,
    last_dispatch: Option<Instant>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_dispatch: None,
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    pub fn last_dispatch_time(&self) -> Option<Instant> {
        self.last_dispatch
    }

    /// Returns true and records `now` when a dispatch is allowed
    pub fn permit(&mut self, now: Instant) -> bool {
        let allowed = match self.last_dispatch {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.min_interval,
        };
        if allowed {
            self.last_dispatch = Some(now);
        }
        allowed
    }
}

//! Per-source fetch statistics
//!
//! The polling loop owns one [`SourceStats`] per source and logs a summary
//! when it stops. On-demand report fetches are not counted; they say nothing
//! about the loop's own cadence.

use std::collections::VecDeque;
use std::time::Duration;

use crate::error::FetchError;

/// Successful-fetch latencies kept for percentiles
const LATENCY_WINDOW: usize = 100;

/// Fetch counters for one source
#[derive(Debug, Clone)]
pub struct SourceStats {
    source: &'static str,
    fetches: u64,
    failures: u64,
    consecutive_failures: u32,
    last_error: Option<String>,
    /// oldest first
    latencies: VecDeque<Duration>,
}

/// Snapshot of a [`SourceStats`] for logging
#[derive(Debug, Clone, PartialEq)]
pub struct StatsSummary {
    pub source: &'static str,
    pub fetches: u64,
    pub failures: u64,
    /// 1.0 when nothing was fetched yet
    pub success_rate: f64,
    pub p50: Option<Duration>,
    pub p99: Option<Duration>,
}

impl SourceStats {
    pub fn new(source: &'static str) -> Self {
        Self {
            source,
            fetches: 0,
            failures: 0,
            consecutive_failures: 0,
            last_error: None,
            latencies: VecDeque::with_capacity(LATENCY_WINDOW),
        }
    }

    pub fn source(&self) -> &'static str {
        self.source
    }

    /// Counts one fetch that took `elapsed`
    pub fn record<T>(&mut self, elapsed: Duration, result: &Result<T, FetchError>) {
        self.fetches += 1;
        match result {
            Ok(_) => {
                self.consecutive_failures = 0;
                if self.latencies.len() == LATENCY_WINDOW {
                    self.latencies.pop_front();
                }
                self.latencies.push_back(elapsed);
            }
            Err(e) => {
                self.failures += 1;
                self.consecutive_failures += 1;
                self.last_error = Some(e.to_string());
            }
        }
    }

    /// Failures since the last successful fetch
    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn summary(&self) -> StatsSummary {
        let mut sorted: Vec<Duration> = self.latencies.iter().copied().collect();
        sorted.sort_unstable();

        let success_rate = if self.fetches == 0 {
            1.0
        } else {
            (self.fetches - self.failures) as f64 / self.fetches as f64
        };

        StatsSummary {
            source: self.source,
            fetches: self.fetches,
            failures: self.failures,
            success_rate,
            p50: nearest_rank(&sorted, 50.0),
            p99: nearest_rank(&sorted, 99.0),
        }
    }

    pub fn log_summary(&self) {
        let s = self.summary();
        let ms = |d: Option<Duration>| d.map_or(0, |d| d.as_millis() as u64);
        tracing::info!(
            source = s.source,
            fetches = s.fetches,
            failures = s.failures,
            success_rate = s.success_rate,
            p50_ms = ms(s.p50),
            p99_ms = ms(s.p99),
            last_error = self.last_error.as_deref().unwrap_or("none"),
            "Source stats"
        );
    }
}

/// Nearest-rank percentile of an ascending slice
fn nearest_rank(sorted: &[Duration], p: f64) -> Option<Duration> {
    let rank = (p / 100.0 * sorted.len() as f64).ceil() as usize;
    sorted.get(rank.clamp(1, sorted.len().max(1)) - 1).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn failure() -> Result<(), FetchError> {
        Err(FetchError::ApiError("HTTP 503".into()))
    }

    #[test]
    fn test_counts_and_streaks() {
        let mut stats = SourceStats::new("supply-endpoint");
        stats.record(ms(100), &Ok(1u64));
        stats.record(ms(900), &failure());
        stats.record(ms(900), &failure());

        assert_eq!(stats.consecutive_failures(), 2);
        assert_eq!(stats.last_error(), Some("Provider API error: HTTP 503"));

        stats.record(ms(120), &Ok(2u64));
        assert_eq!(stats.consecutive_failures(), 0);
        // last error is kept for the shutdown summary
        assert!(stats.last_error().is_some());

        let summary = stats.summary();
        assert_eq!(summary.fetches, 4);
        assert_eq!(summary.failures, 2);
        assert_eq!(summary.success_rate, 0.5);
        // failed fetches do not count toward latency
        assert_eq!(summary.p99, Some(ms(120)));
    }

    #[test]
    fn test_empty_summary() {
        let summary = SourceStats::new("cmc").summary();
        assert_eq!(summary.success_rate, 1.0);
        assert_eq!(summary.p50, None);
        assert_eq!(summary.p99, None);
    }

    #[test]
    fn test_latency_window_is_bounded() {
        let mut stats = SourceStats::new("cmc");
        for i in 0..(LATENCY_WINDOW as u64 + 20) {
            stats.record(ms(i), &Ok(()));
        }
        assert_eq!(stats.latencies.len(), LATENCY_WINDOW);
        assert_eq!(stats.latencies.front(), Some(&ms(20)));
        assert_eq!(stats.summary().fetches, LATENCY_WINDOW as u64 + 20);
    }

    #[test]
    fn test_nearest_rank() {
        let values: Vec<Duration> = (1..=10).map(ms).collect();
        assert_eq!(nearest_rank(&values, 50.0), Some(ms(5)));
        assert_eq!(nearest_rank(&values, 99.0), Some(ms(10)));
        assert_eq!(nearest_rank(&values, 0.0), Some(ms(1)));
        assert_eq!(nearest_rank(&[ms(7)], 50.0), Some(ms(7)));
        assert_eq!(nearest_rank(&[], 50.0), None);
    }
}

//! Supply polling loop
//!
//! Each cycle fetches supply and price, feeds the supply into the
//! [`ChangeDetector`], throttles candidates through the [`RateLimiter`] and
//! dispatches the rendered alert. Source and channel failures are reported
//! and the loop carries on with the next cycle.
//!
//! ```text
//! SupplyMonitor::run()
//!     ↓
//! SupplySource + PriceSource (joined)
//!     ↓
//! ChangeDetector → RateLimiter
//!     ↓
//! format::render_alert → Dispatcher
//!     ↓
//! sleep(delay) or shutdown
//! ```

use crate::{
    config::MonitorConfig,
    constants::STARTED_MESSAGE,
    detector::{ChangeDetector, DetectorState},
    error::FetchError,
    events::{EventSink, MonitorEvent},
    format::{build_alert, render_alert},
    limiter::RateLimiter,
    metrics::SourceStats,
    notifier::{Dispatcher, Notifier},
    provider::{PriceSource, SupplySource},
    types::Sample,
};
use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

/// What a single cycle ended up doing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// A source failed; state untouched
    FetchFailed,
    /// First sample stored as baseline
    Baseline,
    /// Supply equal to the previous sample
    Unchanged,
    /// Change detected and sent
    Dispatched,
    /// Change detected but dropped by the rate limiter
    Suppressed,
    /// Change detected, permitted, but the channel failed
    DispatchFailed,
}

pub struct SupplyMonitor {
    supply: Arc<dyn SupplySource>,
    price: Arc<dyn PriceSource>,
    dispatcher: Dispatcher,
    events: Arc<dyn EventSink>,
    detector: ChangeDetector,
    limiter: RateLimiter,
    supply_stats: SourceStats,
    price_stats: SourceStats,
    delay: Duration,
    max_supply: u64,
    symbol: String,
    convert: String,
}

impl SupplyMonitor {
    pub fn new(
        config: &MonitorConfig,
        supply: Arc<dyn SupplySource>,
        price: Arc<dyn PriceSource>,
        notifier: Arc<dyn Notifier>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        let supply_stats = SourceStats::new(supply.source_name());
        let price_stats = SourceStats::new(price.source_name());

        Self {
            supply,
            price,
            dispatcher: Dispatcher::new(notifier, events.clone()),
            events,
            detector: ChangeDetector::new(),
            limiter: RateLimiter::new(config.min_interval),
            supply_stats,
            price_stats,
            delay: config.delay,
            max_supply: config.max_supply,
            symbol: config.symbol.clone(),
            convert: config.convert.clone(),
        }
    }

    pub fn detector(&self) -> &ChangeDetector {
        &self.detector
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub fn supply_stats(&self) -> &SourceStats {
        &self.supply_stats
    }

    pub fn price_stats(&self) -> &SourceStats {
        &self.price_stats
    }

    /// Sends the startup notification, best effort
    pub async fn announce_start(&self) -> bool {
        self.dispatcher.dispatch(STARTED_MESSAGE).await
    }

    /// Runs cycles every `delay` until `shutdown` is cancelled
    ///
    /// Cancellation interrupts the startup announcement, an in-flight fetch
    /// or the sleep; a dispatch that was already under way is dropped with it.
    pub async fn run(mut self, shutdown: CancellationToken) {
        let announced = tokio::select! {
            biased;
            _ = shutdown.cancelled() => false,
            _ = self.announce_start() => true,
        };

        if announced {
            self.events.emit(MonitorEvent::Started {
                delay_secs: self.delay.as_secs(),
                min_interval_secs: self.limiter.min_interval().as_secs(),
                timestamp: Utc::now(),
            });
            self.poll_until(&shutdown).await;
        }

        self.events.emit(MonitorEvent::ShuttingDown {
            timestamp: Utc::now(),
        });
        self.supply_stats.log_summary();
        self.price_stats.log_summary();
    }

    async fn poll_until(&mut self, shutdown: &CancellationToken) {
        loop {
            let outcome = tokio::select! {
                biased;
                _ = shutdown.cancelled() => return,
                outcome = self.run_cycle(Instant::now()) => outcome,
            };
            tracing::debug!(?outcome, "Cycle complete");

            tokio::select! {
                biased;
                _ = shutdown.cancelled() => return,
                _ = sleep(self.delay) => {}
            }
        }
    }

    /// Runs one fetch → detect → dispatch cycle as of `now`
    pub async fn run_cycle(&mut self, now: Instant) -> CycleOutcome {
        let (supply, price) = tokio::join!(
            timed(self.supply.fetch_supply()),
            timed(self.price.fetch_price()),
        );
        let supply = settle(&mut self.supply_stats, self.events.as_ref(), supply);
        let price = settle(&mut self.price_stats, self.events.as_ref(), price);
        let (Some(supply), Some(price)) = (supply, price) else {
            return CycleOutcome::FetchFailed;
        };
        let sample = Sample::new(supply, price);
        tracing::debug!(
            supply = sample.supply,
            price = sample.price,
            at = %sample.timestamp,
            "Sample fetched"
        );

        let had_baseline = self.detector.state() != DetectorState::NoBaseline;
        let Some(candidate) = self.detector.observe(sample.supply, now) else {
            if had_baseline {
                return CycleOutcome::Unchanged;
            }
            self.events.emit(MonitorEvent::BaselineSet {
                supply: sample.supply,
                timestamp: sample.timestamp,
            });
            return CycleOutcome::Baseline;
        };

        let alert = build_alert(
            candidate.supply,
            candidate.previous_supply,
            sample.price,
            self.max_supply,
            candidate.since_last_change,
        );
        let text = render_alert(&alert, &self.symbol, &self.convert);
        self.events.emit(MonitorEvent::ChangeDetected {
            previous_supply: alert.previous_supply,
            supply: alert.supply,
            delta: alert.delta,
            message: text.clone(),
            timestamp: sample.timestamp,
        });

        if !self.limiter.permit(now) {
            self.events.emit(MonitorEvent::AlertSuppressed {
                supply: alert.supply,
                timestamp: Utc::now(),
            });
            return CycleOutcome::Suppressed;
        }

        if self.dispatcher.dispatch(&text).await {
            self.events.emit(MonitorEvent::AlertDispatched {
                supply: alert.supply,
                timestamp: Utc::now(),
            });
            CycleOutcome::Dispatched
        } else {
            CycleOutcome::DispatchFailed
        }
    }
}

async fn timed<T>(
    fetch: impl Future<Output = Result<T, FetchError>>,
) -> (Duration, Result<T, FetchError>) {
    let start = Instant::now();
    let result = fetch.await;
    (start.elapsed(), result)
}

/// Records a fetch and reports its failure, if any
fn settle<T>(
    stats: &mut SourceStats,
    events: &dyn EventSink,
    (elapsed, result): (Duration, Result<T, FetchError>),
) -> Option<T> {
    stats.record(elapsed, &result);
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            events.emit(MonitorEvent::FetchFailed {
                source: stats.source().to_string(),
                error_message: e.to_string(),
                timestamp: Utc::now(),
            });
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::DATA_UNAVAILABLE_MESSAGE;
    use crate::error::SendError;
    use crate::events::recording::RecordingSink;
    use crate::notifier::mock::MockNotifier;
    use crate::provider::mock::{MockPrice, MockSupply};
    use crate::report::{tests::test_config, ReportService};

    struct Harness {
        monitor: SupplyMonitor,
        supply: Arc<MockSupply>,
        price: Arc<MockPrice>,
        notifier: Arc<MockNotifier>,
        events: Arc<RecordingSink>,
    }

    fn harness(config: &MonitorConfig, supply: u64, price: f64) -> Harness {
        let supply = Arc::new(MockSupply::new(supply));
        let price = Arc::new(MockPrice::new(price));
        let notifier = Arc::new(MockNotifier::new());
        let events = Arc::new(RecordingSink::new());
        let monitor = SupplyMonitor::new(
            config,
            supply.clone(),
            price.clone(),
            notifier.clone(),
            events.clone(),
        );
        Harness {
            monitor,
            supply,
            price,
            notifier,
            events,
        }
    }

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    #[tokio::test]
    async fn test_scenario_a_single_alert_after_change() {
        let mut h = harness(&test_config(), 1_000, 0.01);
        let t0 = Instant::now();

        assert_eq!(h.monitor.run_cycle(t0).await, CycleOutcome::Baseline);
        assert_eq!(h.monitor.run_cycle(t0 + secs(10)).await, CycleOutcome::Unchanged);
        assert!(h.notifier.sent().is_empty());

        h.supply.set_value(1_500);
        assert_eq!(h.monitor.run_cycle(t0 + secs(20)).await, CycleOutcome::Dispatched);

        let sent = h.notifier.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains("(+500)"));
        assert!(sent[0].contains("Cap growth: $5.00"));
        assert!(sent[0].contains("Market cap: $15.00"));
        assert_eq!(
            h.events.types(),
            vec!["BASELINE_SET", "CHANGE_DETECTED", "ALERT_DISPATCHED"]
        );
    }

    #[tokio::test]
    async fn test_scenario_b_second_change_suppressed() {
        let mut h = harness(&test_config(), 1_000, 0.01);
        let t0 = Instant::now();

        h.monitor.run_cycle(t0).await;
        h.supply.set_value(2_000);
        assert_eq!(h.monitor.run_cycle(t0 + secs(10)).await, CycleOutcome::Dispatched);
        h.supply.set_value(3_000);
        assert_eq!(h.monitor.run_cycle(t0 + secs(15)).await, CycleOutcome::Suppressed);

        assert_eq!(h.notifier.sent().len(), 1);
        assert_eq!(h.events.count("ALERT_SUPPRESSED"), 1);
        assert_eq!(h.monitor.detector().last_supply(), Some(3_000));
        assert_eq!(h.monitor.limiter().last_dispatch_time(), Some(t0 + secs(10)));

        // the dropped alert is never replayed
        assert_eq!(h.monitor.run_cycle(t0 + secs(40)).await, CycleOutcome::Unchanged);
        assert_eq!(h.notifier.sent().len(), 1);

        // the next change is judged on its own
        h.supply.set_value(3_001);
        assert_eq!(h.monitor.run_cycle(t0 + secs(50)).await, CycleOutcome::Dispatched);
        let sent = h.notifier.sent();
        assert!(sent[1].contains("(+1)"));
        // elapsed counts from the suppressed change, not the last send
        assert!(sent[1].contains("Since last change: 35s"));
    }

    #[tokio::test]
    async fn test_scenario_c_invalid_supply_keeps_state() {
        let mut h = harness(&test_config(), 1_000, 0.01);
        let t0 = Instant::now();
        h.monitor.run_cycle(t0).await;

        h.supply.push_error("supply body is not a number: \"<html>\"");
        assert_eq!(h.monitor.run_cycle(t0 + secs(10)).await, CycleOutcome::FetchFailed);
        assert_eq!(h.monitor.detector().last_supply(), Some(1_000));
        assert_eq!(h.monitor.detector().last_change_time(), None);
        assert_eq!(h.events.count("FETCH_FAILED"), 1);

        // recovers on the next cycle
        h.supply.set_value(1_200);
        assert_eq!(h.monitor.run_cycle(t0 + secs(20)).await, CycleOutcome::Dispatched);
    }

    #[tokio::test]
    async fn test_price_failure_skips_cycle() {
        let mut h = harness(&test_config(), 1_000, 0.01);
        let t0 = Instant::now();
        h.price.push_error("symbol not found");

        assert_eq!(h.monitor.run_cycle(t0).await, CycleOutcome::FetchFailed);
        assert_eq!(h.monitor.detector().state(), DetectorState::NoBaseline);
        assert_eq!(h.monitor.run_cycle(t0 + secs(10)).await, CycleOutcome::Baseline);
    }

    #[tokio::test]
    async fn test_scenario_d_report_does_not_touch_loop_state() {
        let config = test_config();
        let mut h = harness(&config, 1_000, 0.01);
        let report = ReportService::new(
            &config,
            h.supply.clone(),
            h.price.clone(),
            h.events.clone(),
        );
        let t0 = Instant::now();
        h.monitor.run_cycle(t0).await;

        h.supply.set_error("connection refused");
        assert_eq!(report.report().await, DATA_UNAVAILABLE_MESSAGE);
        assert_eq!(h.monitor.detector().last_supply(), Some(1_000));
        assert_eq!(h.monitor.limiter().last_dispatch_time(), None);

        h.supply.set_value(1_000);
        assert_eq!(h.monitor.run_cycle(t0 + secs(10)).await, CycleOutcome::Unchanged);
    }

    #[tokio::test]
    async fn test_dispatch_failure_still_advances_state() {
        let mut h = harness(&test_config(), 10, 1.0);
        let t0 = Instant::now();
        h.monitor.run_cycle(t0).await;

        h.notifier.fail_with(SendError::Network("connection reset".into()));
        h.supply.set_value(20);
        assert_eq!(h.monitor.run_cycle(t0 + secs(5)).await, CycleOutcome::DispatchFailed);
        assert_eq!(h.monitor.detector().last_supply(), Some(20));
        assert_eq!(h.events.count("DISPATCH_FAILED"), 1);

        h.notifier.recover();
        assert_eq!(h.monitor.run_cycle(t0 + secs(10)).await, CycleOutcome::Unchanged);
    }

    #[tokio::test]
    async fn test_alert_metrics_match_raw_values() {
        let mut h = harness(&test_config(), 123_456, 0.0375);
        let t0 = Instant::now();
        h.monitor.run_cycle(t0).await;
        h.supply.set_value(100_000);
        h.monitor.run_cycle(t0 + secs(60)).await;

        let sent = h.notifier.sent();
        assert!(sent[0].contains("(-23,456)"));
        // 100_000 * 0.0375 and -23_456 * 0.0375
        assert!(sent[0].contains("Market cap: $3,750.00"));
        assert!(sent[0].contains("Cap growth: -$879.60"));
    }

    #[tokio::test]
    async fn test_run_announces_and_stops_on_cancel() {
        let mut config = test_config();
        config.delay = Duration::from_millis(5);
        let h = harness(&config, 1_000, 0.01);
        let notifier = h.notifier.clone();
        let events = h.events.clone();
        let supply = h.supply.clone();

        let shutdown = CancellationToken::new();
        let task = tokio::spawn(h.monitor.run(shutdown.clone()));

        while supply.call_count() < 3 {
            sleep(Duration::from_millis(5)).await;
        }
        shutdown.cancel();
        task.await.unwrap();

        assert_eq!(notifier.sent().first().map(String::as_str), Some(STARTED_MESSAGE));
        let types = events.types();
        assert_eq!(types.first(), Some(&"STARTED"));
        assert_eq!(types.last(), Some(&"SHUTTING_DOWN"));
        assert_eq!(events.count("BASELINE_SET"), 1);
    }

    #[tokio::test]
    async fn test_run_survives_failed_announcement() {
        let mut config = test_config();
        config.delay = Duration::from_millis(5);
        let h = harness(&config, 1_000, 0.01);
        h.notifier.fail_with(SendError::Api("bot was blocked".into()));
        let supply = h.supply.clone();
        let events = h.events.clone();

        let shutdown = CancellationToken::new();
        let task = tokio::spawn(h.monitor.run(shutdown.clone()));
        while supply.call_count() < 2 {
            sleep(Duration::from_millis(5)).await;
        }
        shutdown.cancel();
        task.await.unwrap();

        assert_eq!(events.count("DISPATCH_FAILED"), 1);
        assert_eq!(events.count("BASELINE_SET"), 1);
    }

    #[tokio::test]
    async fn test_shutdown_interrupts_stalled_announcement() {
        let h = harness(&test_config(), 1_000, 0.01);
        h.notifier.stall();
        let supply = h.supply.clone();
        let events = h.events.clone();

        let shutdown = CancellationToken::new();
        let task = tokio::spawn(h.monitor.run(shutdown.clone()));
        sleep(Duration::from_millis(20)).await;
        shutdown.cancel();

        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("monitor did not stop")
            .unwrap();
        assert_eq!(supply.call_count(), 0);
        assert_eq!(events.types(), vec!["SHUTTING_DOWN"]);
    }

    #[tokio::test]
    async fn test_source_stats_track_each_fetch() {
        let mut h = harness(&test_config(), 1_000, 0.01);
        let t0 = Instant::now();
        h.supply.push_value(1_000);
        h.supply.push_error("HTTP 502");
        h.supply.push_error("HTTP 502");
        h.supply.push_value(1_000);

        let outcomes = [
            h.monitor.run_cycle(t0).await,
            h.monitor.run_cycle(t0 + secs(10)).await,
            h.monitor.run_cycle(t0 + secs(20)).await,
        ];
        assert_eq!(
            outcomes,
            [CycleOutcome::Baseline, CycleOutcome::FetchFailed, CycleOutcome::FetchFailed]
        );
        assert_eq!(h.monitor.supply_stats().consecutive_failures(), 2);

        assert_eq!(h.monitor.run_cycle(t0 + secs(30)).await, CycleOutcome::Unchanged);
        let supply = h.monitor.supply_stats().summary();
        assert_eq!((supply.fetches, supply.failures), (4, 2));
        assert_eq!(h.monitor.supply_stats().consecutive_failures(), 0);
        assert_eq!(h.monitor.price_stats().summary().failures, 0);
        assert_eq!(h.events.count("FETCH_FAILED"), 2);
    }
}

//! Acquisition loop
//!
//! Drives a [`Driver`] on a fixed cadence, filters implausible readings, publishes
//! the rest, and re-initializes the device after any measurement failure. Nothing
//! that happens on the bus or the network ends the loop.

use std::fmt;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::recovery::{RecoveryPolicy, RecoveryTracker};
use crate::bus::BusConnector;
use crate::device::{DeviceState, Driver, SensorDevice};
use crate::error::{DecodeError, MeasureError};
use crate::reading::Reading;
use crate::telemetry::{TelemetryEmitter, TelemetrySink};

/// Ticks between periodic statistics summaries
const SUMMARY_INTERVAL_TICKS: u64 = 60;

/// Plausible temperature window, both bounds exclusive
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlausibilityFilter {
    pub min_temperature_c: f64,
    pub max_temperature_c: f64,
}

impl Default for PlausibilityFilter {
    fn default() -> Self {
        Self {
            min_temperature_c: -40.0,
            max_temperature_c: 85.0,
        }
    }
}

impl PlausibilityFilter {
    /// Reject readings outside the window; NaN never passes
    pub fn check(&self, reading: &Reading) -> Result<(), DecodeError> {
        let Some(temperature_c) = reading.measurement().temperature_c() else {
            return Ok(());
        };
        if temperature_c > self.min_temperature_c && temperature_c < self.max_temperature_c {
            Ok(())
        } else {
            Err(DecodeError::OutOfRange {
                quantity: "temperature_c",
                value: temperature_c,
                min: self.min_temperature_c,
                max: self.max_temperature_c,
            })
        }
    }
}

/// Acquisition counters
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AcquisitionStats {
    pub ticks: u64,
    pub published: u64,
    pub discarded: u64,
    pub send_failures: u64,
    pub measure_failures: u64,
}

impl fmt::Display for AcquisitionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ticks={} published={} discarded={} send_failures={} measure_failures={}",
            self.ticks, self.published, self.discarded, self.send_failures, self.measure_failures
        )
    }
}

/// What a single tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Reading published
    Published,
    /// Reading produced but the send failed; dropped
    SendFailed,
    /// Reading outside the plausible window; dropped
    Discarded,
    /// Device was re-initialized (no measurement this tick)
    Reinitialized,
    /// Re-init failed; retried next tick
    ReinitFailed,
}

/// Per-process acquisition loop for one sensor
pub struct Collector<D: SensorDevice, C: BusConnector, S: TelemetrySink> {
    driver: Driver<D, C>,
    emitter: TelemetryEmitter<S>,
    filter: PlausibilityFilter,
    recovery: RecoveryTracker,
    sample_interval: Duration,
    stats: AcquisitionStats,
}

impl<D: SensorDevice, C: BusConnector, S: TelemetrySink> Collector<D, C, S> {
    pub fn new(
        driver: Driver<D, C>,
        emitter: TelemetryEmitter<S>,
        recovery: RecoveryPolicy,
        sample_interval: Duration,
    ) -> Self {
        Self {
            driver,
            emitter,
            filter: PlausibilityFilter::default(),
            recovery: RecoveryTracker::new(recovery),
            sample_interval,
            stats: AcquisitionStats::default(),
        }
    }

    pub fn with_filter(mut self, filter: PlausibilityFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn driver(&self) -> &Driver<D, C> {
        &self.driver
    }

    pub fn stats(&self) -> &AcquisitionStats {
        &self.stats
    }

    pub fn recovery(&self) -> &RecoveryTracker {
        &self.recovery
    }

    /// Initial init without cooldown; a failure is left to the loop
    pub async fn start(&mut self) {
        let sensor = self.driver.device().name();
        match self.driver.init().await {
            Ok(()) => self.recovery.mark_ready(),
            Err(e) => warn!(
                "{} init failed, will retry in loop: {} (kind: {})",
                sensor,
                e,
                e.kind()
            ),
        }
    }

    /// Run one acquisition cycle
    pub async fn tick(&mut self) -> TickOutcome {
        self.stats.ticks += 1;
        let sensor = self.driver.device().name();

        if self.driver.state() != DeviceState::Ready {
            debug!("{} is {}, re-initializing", sensor, self.driver.state());
            return self.recover().await;
        }

        let checked = match self.driver.measure().await {
            Ok(reading) => self
                .filter
                .check(&reading)
                .map(|()| reading)
                .map_err(MeasureError::from),
            Err(e) => Err(e),
        };

        let reading = match checked {
            Ok(reading) => reading,
            Err(e) if !e.requires_reinit() => {
                self.stats.discarded += 1;
                warn!("{} reading discarded: {}", sensor, e);
                return TickOutcome::Discarded;
            },
            Err(e) => {
                self.stats.measure_failures += 1;
                warn!(
                    "{} measurement failed: {} (kind: {}), re-initializing",
                    sensor,
                    e,
                    e.kind()
                );
                return self.recover().await;
            },
        };

        info!("Read {}: {}", sensor, reading.measurement());
        match self.emitter.emit(&reading).await {
            Ok(()) => {
                self.stats.published += 1;
                TickOutcome::Published
            },
            Err(e) => {
                self.stats.send_failures += 1;
                warn!("Telemetry send failed, reading dropped: {}", e);
                TickOutcome::SendFailed
            },
        }
    }

    /// Release the bus, cool down, then try one init
    async fn recover(&mut self) -> TickOutcome {
        let sensor = self.driver.device().name();
        self.driver.release();

        let cooldown = self.recovery.next_cooldown();
        debug!("{} cooling down {:?} before re-init", sensor, cooldown);
        tokio::time::sleep(cooldown).await;

        self.recovery.record_attempt();
        match self.driver.init().await {
            Ok(()) => {
                self.recovery.mark_reinit_succeeded();
                info!("{} re-initialized", sensor);
                TickOutcome::Reinitialized
            },
            Err(e) => {
                self.recovery.mark_failed();
                warn!(
                    "{} re-init failed: {} (kind: {}), retrying in {:?}",
                    sensor,
                    e,
                    e.kind(),
                    self.recovery.next_cooldown()
                );
                TickOutcome::ReinitFailed
            },
        }
    }

    /// Tick forever at the sample interval; overrunning ticks delay the schedule
    pub async fn run(&mut self) {
        let mut interval = tokio::time::interval(self.sample_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            self.tick().await;

            if self.stats.ticks % SUMMARY_INTERVAL_TICKS == 0 {
                info!(
                    "{} stats: {} {}",
                    self.driver.device().name(),
                    self.stats,
                    self.recovery.stats()
                );
            }
        }
    }

    /// Release the bus and log final statistics
    pub fn shutdown(&mut self) {
        let sensor = self.driver.device().name();
        if self.driver.release() {
            info!("{} bus released", sensor);
        }
        info!(
            "{} collector stopped: {} {}",
            sensor,
            self.stats,
            self.recovery.stats()
        );
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use tokio::time::Instant;
    use tracing_test::traced_test;

    use super::*;
    use crate::bus::mock::MockConnector;
    use crate::device::{Aht10, Bh1750};
    use crate::reading::Measurement;
    use crate::telemetry::CaptureSink;

    fn light_collector(
        mock: &MockConnector,
        sink: &CaptureSink,
    ) -> Collector<Bh1750, MockConnector, CaptureSink> {
        Collector::new(
            Driver::new(Bh1750, mock.clone(), "/dev/i2c-7"),
            TelemetryEmitter::new("bh1750-i2c-7", sink.clone()),
            RecoveryPolicy::default(),
            Duration::from_secs(1),
        )
    }

    /// Paused time advances to timer deadlines, allow for millisecond rounding
    fn assert_elapsed(start: Instant, expected_ms: u64) {
        let elapsed = start.elapsed();
        assert!(
            elapsed >= Duration::from_millis(expected_ms)
                && elapsed < Duration::from_millis(expected_ms + 5),
            "elapsed {:?}, expected {} ms",
            elapsed,
            expected_ms
        );
    }

    fn climate(temperature_c: f64) -> Reading {
        Reading::new(
            Measurement::Climate {
                temperature_c,
                humidity_pct: 50.0,
            },
            0,
        )
    }

    #[test]
    fn test_filter_bounds_are_exclusive() {
        let filter = PlausibilityFilter::default();
        assert!(filter.check(&climate(21.0)).is_ok());
        assert!(filter.check(&climate(-39.99)).is_ok());
        assert!(filter.check(&climate(84.99)).is_ok());
        assert!(filter.check(&climate(-40.0)).is_err());
        assert!(filter.check(&climate(85.0)).is_err());
        assert!(filter.check(&climate(f64::NAN)).is_err());
        assert!(filter
            .check(&Reading::new(Measurement::Light { lux: 1e6 }, 0))
            .is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_publishes_reading() {
        let mock = MockConnector::new();
        mock.set_default_frame([0x00, 0x78]);
        let sink = CaptureSink::new();
        let mut collector = light_collector(&mock, &sink);

        collector.start().await;
        assert_eq!(collector.tick().await, TickOutcome::Published);

        let sent = sink.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].starts_with(r#"{"device_id": "bh1750-i2c-7", "timestamp_ms": "#));
        assert!(sent[0].ends_with(r#""light": 100.00}"#));
        assert_eq!(collector.stats().published, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_measure_recovers_with_cooldown() {
        let mock = MockConnector::new();
        mock.push_read_error("remote I/O error");
        mock.set_default_frame([0x00, 0x78]);
        let sink = CaptureSink::new();
        let mut collector = light_collector(&mock, &sink);
        collector.start().await;

        let start = Instant::now();
        assert_eq!(collector.tick().await, TickOutcome::Reinitialized);
        // 500 ms cooldown + 180 ms settle
        assert_elapsed(start, 680);
        assert_eq!(collector.driver().state(), DeviceState::Ready);

        assert_eq!(collector.tick().await, TickOutcome::Published);
        assert_eq!(collector.stats().measure_failures, 1);
        let recovery = collector.recovery().stats();
        assert_eq!(recovery.total_attempts, 1);
        assert_eq!(recovery.successful_reinits, 1);
        assert_eq!(recovery.failed_reinits, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_out_of_range_discarded_without_reinit() {
        let mock = MockConnector::new();
        // raw temperature 0xF0000 -> 137.5 C
        mock.set_default_frame([0x08, 0x80, 0x00, 0x0F, 0x00, 0x00]);
        let sink = CaptureSink::new();
        let mut collector = Collector::new(
            Driver::new(Aht10, mock.clone(), "/dev/i2c-7"),
            TelemetryEmitter::new("aht10-i2c-7", sink.clone()),
            RecoveryPolicy::default(),
            Duration::from_secs(1),
        );
        collector.start().await;

        assert_eq!(collector.tick().await, TickOutcome::Discarded);
        assert_eq!(collector.tick().await, TickOutcome::Discarded);
        assert!(sink.sent().is_empty());
        assert_eq!(collector.stats().discarded, 2);
        assert_eq!(collector.stats().measure_failures, 0);
        assert_eq!(collector.recovery().stats().total_attempts, 0);
        assert_eq!(collector.driver().state(), DeviceState::Ready);
    }

    #[tokio::test(start_paused = true)]
    #[traced_test]
    async fn test_send_failure_is_logged_and_dropped() {
        let mock = MockConnector::new();
        mock.set_default_frame([0x00, 0x78]);
        let sink = CaptureSink::new();
        sink.fail_next_sends(1);
        let mut collector = light_collector(&mock, &sink);
        collector.start().await;

        assert_eq!(collector.tick().await, TickOutcome::SendFailed);
        assert!(logs_contain("reading dropped"));
        assert_eq!(collector.tick().await, TickOutcome::Published);
        assert_eq!(sink.sent().len(), 1);
        assert_eq!(collector.stats().send_failures, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reinit_failure_grows_cooldown() {
        let mock = MockConnector::new();
        mock.fail_next_opens(3);
        mock.set_default_frame([0x00, 0x78]);
        let sink = CaptureSink::new();
        let mut collector = Collector::new(
            Driver::new(Bh1750, mock.clone(), "/dev/i2c-7"),
            TelemetryEmitter::new("bh1750-i2c-7", sink.clone()),
            RecoveryPolicy::from_config(100, 1_000, 2.0),
            Duration::from_secs(1),
        );

        // Startup failure consumes one scripted open failure
        collector.start().await;
        assert_eq!(collector.driver().state(), DeviceState::Uninitialized);

        let start = Instant::now();
        assert_eq!(collector.tick().await, TickOutcome::ReinitFailed);
        assert_elapsed(start, 100);

        let start = Instant::now();
        assert_eq!(collector.tick().await, TickOutcome::ReinitFailed);
        assert_elapsed(start, 200);

        let start = Instant::now();
        assert_eq!(collector.tick().await, TickOutcome::Reinitialized);
        assert_elapsed(start, 400 + 180);
        assert_eq!(collector.recovery().consecutive_failures(), 0);
        assert_eq!(
            collector.recovery().stats().to_string(),
            "reinit_attempts=3 reinit_succeeded=1 reinit_failed=2"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_releases_bus() {
        let mock = MockConnector::new();
        let sink = CaptureSink::new();
        let mut collector = light_collector(&mock, &sink);
        collector.start().await;
        assert_eq!(mock.open_channels(), 1);

        collector.shutdown();
        assert_eq!(mock.open_channels(), 0);
        assert_eq!(collector.driver().state(), DeviceState::Uninitialized);
    }

    #[test]
    fn test_stats_summary_format() {
        let stats = AcquisitionStats {
            ticks: 3,
            published: 2,
            measure_failures: 1,
            ..Default::default()
        };
        assert_eq!(
            stats.to_string(),
            "ticks=3 published=2 discarded=0 send_failures=0 measure_failures=1"
        );
    }

    #[tokio::test(start_paused = true)]
    #[traced_test]
    async fn test_shutdown_summary_includes_recovery_counts() {
        let mock = MockConnector::new();
        mock.push_read_error("remote I/O error");
        mock.set_default_frame([0x00, 0x78]);
        let sink = CaptureSink::new();
        let mut collector = light_collector(&mock, &sink);
        collector.start().await;

        assert_eq!(collector.tick().await, TickOutcome::Reinitialized);
        collector.shutdown();
        assert!(logs_contain(
            "collector stopped: ticks=1 published=0 discarded=0 send_failures=0 measure_failures=1 reinit_attempts=1 reinit_succeeded=1 reinit_failed=0"
        ));
    }
}

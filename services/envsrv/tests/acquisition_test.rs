//! Acquisition loop behaviour against the scripted bus
//!
//! Time is paused, so cooldowns, settle delays and the sampling cadence run on
//! tokio's virtual clock.

#![allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable

use std::time::Duration;

use envsrv::bus::mock::{BusEvent, MockConnector};
use envsrv::device::{Aht10, Bh1750, DeviceState, Driver, SensorDevice};
use envsrv::runtime::{Collector, RecoveryPolicy, TickOutcome};
use envsrv::telemetry::{CaptureSink, TelemetryEmitter};

const LIGHT_FRAME: [u8; 2] = [0x00, 0x78];
const CLIMATE_FRAME: [u8; 6] = [0x08, 0x19, 0x99, 0x9A, 0x33, 0x33];

fn collector<D: SensorDevice>(
    device: D,
    device_id: &str,
    mock: &MockConnector,
    sink: &CaptureSink,
) -> Collector<D, MockConnector, CaptureSink> {
    Collector::new(
        Driver::new(device, mock.clone(), "/dev/i2c-7"),
        TelemetryEmitter::new(device_id, sink.clone()),
        RecoveryPolicy::default(),
        Duration::from_secs(1),
    )
}

/// Number of bus opens between each pair of consecutive reads
fn opens_between_reads(events: &[BusEvent]) -> Vec<usize> {
    let mut counts = Vec::new();
    let mut opens = None;
    for event in events {
        match event {
            BusEvent::Read(_) => {
                if let Some(count) = opens {
                    counts.push(count);
                }
                opens = Some(0);
            },
            BusEvent::Open(_) => {
                if let Some(count) = opens.as_mut() {
                    *count += 1;
                }
            },
            _ => {},
        }
    }
    counts
}

fn published_temperatures(sink: &CaptureSink) -> Vec<f64> {
    sink.sent()
        .iter()
        .map(|line| {
            let value: serde_json::Value = serde_json::from_str(line).unwrap();
            value["temperature_c"].as_f64().unwrap()
        })
        .collect()
}

#[tokio::test(start_paused = true)]
async fn read_error_causes_exactly_one_reinit_before_next_measurement() {
    let mock = MockConnector::new();
    mock.push_read_error("remote I/O error");
    mock.set_default_frame(LIGHT_FRAME);
    let sink = CaptureSink::new();
    let mut collector = collector(Bh1750, "bh1750-i2c-7", &mock, &sink);

    collector.start().await;
    mock.clear_events();

    assert_eq!(collector.tick().await, TickOutcome::Reinitialized);
    assert_eq!(collector.tick().await, TickOutcome::Published);

    assert_eq!(
        mock.events(),
        vec![
            BusEvent::Read(2),
            BusEvent::Close,
            BusEvent::Open("/dev/i2c-7".to_string()),
            BusEvent::Bind(0x23),
            BusEvent::Write(vec![0x01]),
            BusEvent::Write(vec![0x10]),
            BusEvent::Read(2),
        ]
    );
    assert_eq!(sink.sent().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn persistent_read_failures_never_stop_the_loop() {
    // No scripted frames: every read fails
    let mock = MockConnector::new();
    let sink = CaptureSink::new();
    let mut collector = collector(Aht10, "aht10-i2c-7", &mock, &sink);
    collector.start().await;

    let result = tokio::time::timeout(Duration::from_secs(30), collector.run()).await;
    assert!(result.is_err(), "run() returned");

    let stats = collector.stats();
    assert!(stats.ticks >= 10);
    assert!(stats.measure_failures >= 10);
    assert_eq!(collector.recovery().stats().failed_reinits, 0);
    assert!(sink.sent().is_empty());

    let counts = opens_between_reads(&mock.events());
    assert!(!counts.is_empty());
    assert!(counts.iter().all(|&opens| opens == 1), "{:?}", counts);
    assert!(mock.open_channels() <= 1);
}

#[tokio::test(start_paused = true)]
async fn out_of_range_temperatures_are_never_published() {
    let mock = MockConnector::new();
    // 77.50 C
    mock.push_frame(CLIMATE_FRAME);
    // raw 0xF0000 -> 137.50 C
    mock.push_frame([0x08, 0x80, 0x00, 0x0F, 0x00, 0x00]);
    // raw 0 -> -50.00 C
    mock.push_frame([0x08, 0x80, 0x00, 0x00, 0x00, 0x00]);
    // raw 0x6CCCD -> 35.00 C
    mock.push_frame([0x08, 0x80, 0x00, 0x06, 0xCC, 0xCD]);
    let sink = CaptureSink::new();
    let mut collector = collector(Aht10, "aht10-i2c-7", &mock, &sink);
    collector.start().await;

    let outcomes = [
        collector.tick().await,
        collector.tick().await,
        collector.tick().await,
        collector.tick().await,
    ];
    assert_eq!(
        outcomes,
        [
            TickOutcome::Published,
            TickOutcome::Discarded,
            TickOutcome::Discarded,
            TickOutcome::Published,
        ]
    );

    let temperatures = published_temperatures(&sink);
    assert_eq!(temperatures.len(), 2);
    assert!(temperatures.iter().all(|t| *t > -40.0 && *t < 85.0));
    assert_eq!(collector.stats().discarded, 2);
    assert_eq!(collector.recovery().stats().total_attempts, 0);
}

#[tokio::test(start_paused = true)]
async fn uncalibrated_frame_forces_reinit() {
    let mock = MockConnector::new();
    mock.push_frame([0x10, 0x19, 0x99, 0x9A, 0x33, 0x33]);
    mock.set_default_frame(CLIMATE_FRAME);
    let sink = CaptureSink::new();
    let mut collector = collector(Aht10, "aht10-i2c-7", &mock, &sink);
    collector.start().await;
    mock.clear_events();

    assert_eq!(collector.tick().await, TickOutcome::Reinitialized);
    assert!(sink.sent().is_empty());
    assert!(mock
        .events()
        .contains(&BusEvent::Write(vec![0xE1, 0x08, 0x00])));

    assert_eq!(collector.tick().await, TickOutcome::Published);
    assert_eq!(
        sink.sent()[0]
            .split(", ")
            .skip(2)
            .collect::<Vec<_>>()
            .join(", "),
        r#""temperature_c": 77.50, "humidity": 10.00}"#
    );
}

#[tokio::test(start_paused = true)]
async fn startup_failure_is_recovered_by_the_loop() {
    let mock = MockConnector::new();
    mock.fail_next_opens(1);
    mock.set_default_frame(LIGHT_FRAME);
    let sink = CaptureSink::new();
    let mut collector = collector(Bh1750, "bh1750-i2c-7", &mock, &sink);

    collector.start().await;
    assert_eq!(collector.driver().state(), DeviceState::Uninitialized);

    assert_eq!(collector.tick().await, TickOutcome::Reinitialized);
    assert_eq!(collector.tick().await, TickOutcome::Published);
}

#[tokio::test(start_paused = true)]
async fn send_failure_drops_reading_and_continues() {
    let mock = MockConnector::new();
    mock.set_default_frame(LIGHT_FRAME);
    let sink = CaptureSink::new();
    sink.fail_next_sends(2);
    let mut collector = collector(Bh1750, "bh1750-i2c-7", &mock, &sink);
    collector.start().await;

    let result = tokio::time::timeout(Duration::from_millis(4_500), collector.run()).await;
    assert!(result.is_err());

    // Ticks at 0, 1, 2, 3 and 4 s; the first two sends fail
    assert_eq!(sink.attempts(), 5);
    assert_eq!(sink.sent().len(), 3);
    assert_eq!(collector.stats().send_failures, 2);
    assert_eq!(collector.recovery().stats().total_attempts, 0);
}

#[tokio::test(start_paused = true)]
async fn sampling_cadence_is_one_second() {
    let mock = MockConnector::new();
    mock.set_default_frame(LIGHT_FRAME);
    let sink = CaptureSink::new();
    let mut collector = collector(Bh1750, "bh1750-i2c-7", &mock, &sink);
    collector.start().await;

    let _ = tokio::time::timeout(Duration::from_millis(5_500), collector.run()).await;

    let sent_at = sink.sent_at();
    assert_eq!(sent_at.len(), 6);
    for pair in sent_at.windows(2) {
        let gap = pair[1] - pair[0];
        assert!(
            gap >= Duration::from_millis(995) && gap <= Duration::from_millis(1_005),
            "publish gap {:?}",
            gap
        );
    }

    let timestamps: Vec<i64> = sink
        .sent()
        .iter()
        .map(|line| {
            let value: serde_json::Value = serde_json::from_str(line).unwrap();
            value["timestamp_ms"].as_i64().unwrap()
        })
        .collect();
    assert!(timestamps.windows(2).all(|pair| pair[0] <= pair[1]));
}

#[tokio::test(start_paused = true)]
async fn overrunning_tick_delays_the_schedule() {
    let mock = MockConnector::new();
    mock.set_default_frame(LIGHT_FRAME);
    let sink = CaptureSink::new();
    let mut collector = Collector::new(
        Driver::new(Bh1750, mock.clone(), "/dev/i2c-7"),
        TelemetryEmitter::new("bh1750-i2c-7", sink.clone()),
        RecoveryPolicy::from_config(1_500, 1_500, 1.0),
        Duration::from_secs(1),
    );
    mock.push_read_error("remote I/O error");
    collector.start().await;

    // The first read fails and recovery (1.5 s cooldown + 180 ms settle) overruns
    // the period; the late tick fires at once and later ticks keep a full period
    // after it, so publishes land at 1.68, 2.68 and 3.68 s
    let _ = tokio::time::timeout(Duration::from_millis(3_800), collector.run()).await;

    let sent_at = sink.sent_at();
    assert_eq!(sent_at.len(), 3);
    for pair in sent_at.windows(2) {
        let gap = pair[1] - pair[0];
        assert!(
            gap >= Duration::from_millis(995) && gap <= Duration::from_millis(1_005),
            "publish gap {:?}",
            gap
        );
    }
}

#[tokio::test(start_paused = true)]
async fn shutdown_releases_the_bus() {
    let mock = MockConnector::new();
    mock.set_default_frame(LIGHT_FRAME);
    let sink = CaptureSink::new();
    let mut collector = collector(Bh1750, "bh1750-i2c-7", &mock, &sink);
    collector.start().await;

    let _ = tokio::time::timeout(Duration::from_millis(1_500), collector.run()).await;
    assert_eq!(mock.open_channels(), 1);

    collector.shutdown();
    assert_eq!(mock.open_channels(), 0);
    assert_eq!(mock.events().last(), Some(&BusEvent::Close));
}

//! Service entry points
//!
//! Wires configuration, bus backend, driver and telemetry sink together and runs
//! either the collector loop or the diagnostic probe.

use tracing::info;

use crate::bus::{BusConnector, I2cConnector};
use crate::config::{CollectorConfig, SensorModel};
use crate::device::{Aht10, Bh1750, Driver, SensorDevice};
use crate::error::Result;
use crate::probe::{self, PROBE_INTERVAL};
use crate::runtime::Collector;
use crate::telemetry::{TelemetryEmitter, TelemetrySink, UdpSink};

/// Run the collector until a shutdown signal arrives
///
/// Only configuration errors and failure to create the telemetry socket are
/// returned; sensor trouble is handled inside the loop.
pub async fn run_collector(config: &CollectorConfig) -> Result<()> {
    config.validate()?;

    let sink = UdpSink::connect(&config.relay_host, config.relay_port).await?;
    info!(
        "Telemetry relay {} resolved to {}",
        config.relay_endpoint(),
        sink.target()
    );

    match config.sensor {
        SensorModel::Bh1750 => collect(Bh1750, I2cConnector::new(), sink, config).await,
        SensorModel::Aht10 => collect(Aht10, I2cConnector::new(), sink, config).await,
    }
}

/// Drive one collector over any bus backend and sink
pub async fn collect<D, C, S>(device: D, connector: C, sink: S, config: &CollectorConfig) -> Result<()>
where
    D: SensorDevice,
    C: BusConnector,
    S: TelemetrySink,
{
    let driver = Driver::new(device, connector, config.bus_path.clone()).with_timing(config.timing());
    let emitter = TelemetryEmitter::new(config.device_id(), sink);
    let mut collector = Collector::new(
        driver,
        emitter,
        config.recovery_policy(),
        config.sample_interval(),
    );

    info!(
        "Collector started: device_id={}, interval={:?}",
        config.device_id(),
        config.sample_interval()
    );
    collector.start().await;

    tokio::select! {
        _ = collector.run() => {},
        signal = common::shutdown::wait_for_shutdown() => {
            info!("Shutdown signal received: {:?}", signal);
        }
    }

    collector.shutdown();
    Ok(())
}

/// Dump `count` raw frames from the configured sensor
pub async fn run_probe(config: &CollectorConfig, count: u32) -> Result<()> {
    config.validate()?;

    let summary = match config.sensor {
        SensorModel::Bh1750 => {
            let mut driver = Driver::new(Bh1750, I2cConnector::new(), config.bus_path.clone())
                .with_timing(config.timing());
            probe::run(&mut driver, count, PROBE_INTERVAL).await?
        },
        SensorModel::Aht10 => {
            let mut driver = Driver::new(Aht10, I2cConnector::new(), config.bus_path.clone())
                .with_timing(config.timing());
            probe::run(&mut driver, count, PROBE_INTERVAL).await?
        },
    };

    info!(
        "Probe summary: attempts={} frames={} failures={}",
        summary.attempts, summary.frames, summary.failures
    );
    Ok(())
}

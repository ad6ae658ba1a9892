//! Diagnostic probe
//!
//! Initializes the device, then dumps a fixed number of raw frames with their
//! interpretation for manual inspection. Nothing is gated or published.

use std::time::Duration;

use common::hex;
use tracing::{info, warn};

use crate::bus::BusConnector;
use crate::device::{Driver, SensorDevice};
use crate::error::InitError;

/// Pause between probe acquisitions
pub const PROBE_INTERVAL: Duration = Duration::from_secs(1);

/// Outcome counts of a probe run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ProbeSummary {
    pub attempts: u32,
    pub frames: u32,
    pub failures: u32,
}

/// Run `count` raw acquisitions; fails only if the device cannot be initialized
pub async fn run<D: SensorDevice, C: BusConnector>(
    driver: &mut Driver<D, C>,
    count: u32,
    interval: Duration,
) -> Result<ProbeSummary, InitError> {
    let device = driver.device();
    info!("Starting {} probe", device.name());
    info!("Target bus: {}", driver.bus_path());
    info!("Device address: 0x{:02X}", device.address());

    driver.init().await?;

    let mut summary = ProbeSummary::default();
    for attempt in 1..=count {
        info!("--- Reading #{} ---", attempt);
        summary.attempts += 1;

        match driver.sample_raw().await {
            Ok(frame) => {
                summary.frames += 1;
                info!("Raw data: {}", hex::encode_spaced(&frame));
                info!("{}", driver.device().describe_frame(&frame));
            },
            Err(e) => {
                summary.failures += 1;
                warn!("Acquisition failed: {} (kind: {})", e, e.kind());
            },
        }

        if attempt < count {
            tokio::time::sleep(interval).await;
        }
    }

    driver.release();
    info!(
        "Probe completed: {} frame(s), {} failure(s)",
        summary.frames, summary.failures
    );
    Ok(summary)
}

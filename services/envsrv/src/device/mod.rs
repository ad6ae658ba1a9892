//! Device drivers
//!
//! Both sensors run the same acquisition state machine. A [`SensorDevice`] supplies the
//! register map (command tables, frame size, decoding, default timing) and [`Driver`]
//! sequences it over an exclusively owned [`BusHandle`].
//!
//! ```text
//! Uninitialized --init ok--> Ready --measure ok--> Ready
//!       ^                      |  \
//!       |                release   measure error
//!       +----------------------+    \
//!                                   Faulted --init ok--> Ready
//! ```

pub mod aht10;
pub mod bh1750;

pub use aht10::Aht10;
pub use bh1750::Bh1750;

use std::fmt;
use std::time::Duration;

use common::hex;
use tracing::{debug, info};

use crate::bus::{BusConnector, BusHandle};
use crate::error::{DecodeError, InitError, MeasureError};
use crate::reading::{Measurement, Reading};

/// A named byte sequence sent to the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command {
    pub name: &'static str,
    pub bytes: &'static [u8],
}

/// Waits the device needs between commands and data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    /// After the init sequence, before the first measurement
    pub settle: Duration,
    /// After a trigger command, before the frame is read
    pub conversion: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceState {
    #[default]
    Uninitialized,
    Ready,
    /// A measurement failed; cleared by the next successful init
    Faulted,
}

impl fmt::Display for DeviceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uninitialized => f.write_str("uninitialized"),
            Self::Ready => f.write_str("ready"),
            Self::Faulted => f.write_str("faulted"),
        }
    }
}

/// Register map of one sensor variant
pub trait SensorDevice {
    /// Short model name used in logs and device ids
    fn name(&self) -> &'static str;

    /// 7-bit bus address
    fn address(&self) -> u16;

    /// Commands sent in order by `init()`
    fn init_sequence(&self) -> &'static [Command];

    /// Command that starts a conversion; `None` for continuous-mode devices
    fn trigger(&self) -> Option<&'static Command> {
        None
    }

    fn frame_len(&self) -> usize;

    fn default_timing(&self) -> Timing;

    fn decode(&self, frame: &[u8]) -> Result<Measurement, DecodeError>;

    /// Interpret a raw frame for diagnostics, without rejecting anything
    fn describe_frame(&self, frame: &[u8]) -> String {
        match self.decode(frame) {
            Ok(measurement) => measurement.to_string(),
            Err(e) => format!("decode failed: {}", e),
        }
    }
}

/// Generic driver for a [`SensorDevice`]
pub struct Driver<D: SensorDevice, C: BusConnector> {
    device: D,
    bus: BusHandle<C>,
    timing: Timing,
    state: DeviceState,
}

impl<D: SensorDevice, C: BusConnector> Driver<D, C> {
    /// Create a driver with the device's default timing; the bus stays closed
    pub fn new(device: D, connector: C, bus_path: impl Into<String>) -> Self {
        let timing = device.default_timing();
        let bus = BusHandle::new(connector, bus_path, device.address());
        Self {
            device,
            bus,
            timing,
            state: DeviceState::Uninitialized,
        }
    }

    pub fn with_timing(mut self, timing: Timing) -> Self {
        self.timing = timing;
        self
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn state(&self) -> DeviceState {
        self.state
    }

    pub fn timing(&self) -> Timing {
        self.timing
    }

    pub fn bus_path(&self) -> &str {
        self.bus.path()
    }

    /// Open the bus if needed, send the init sequence and wait the settle delay
    ///
    /// On failure the bus is closed so the next attempt reopens it.
    pub async fn init(&mut self) -> Result<(), InitError> {
        let sensor = self.device.name();

        if let Err(source) = self.bus.open() {
            self.state = DeviceState::Uninitialized;
            return Err(InitError::Open { sensor, source });
        }

        for command in self.device.init_sequence() {
            if let Err(source) = self.bus.write(command.bytes) {
                self.bus.close();
                self.state = DeviceState::Uninitialized;
                return Err(InitError::Command {
                    sensor,
                    command: command.name,
                    source,
                });
            }
            debug!(
                "{}: sent {} [{}]",
                sensor,
                command.name,
                hex::encode_spaced(command.bytes)
            );
        }

        tokio::time::sleep(self.timing.settle).await;
        self.state = DeviceState::Ready;
        info!(
            "{} ready on {} (address 0x{:02X})",
            sensor,
            self.bus.path(),
            self.device.address()
        );
        Ok(())
    }

    /// Start a conversion and wait for it; no-op for continuous-mode devices
    pub async fn trigger_measure(&mut self) -> Result<(), MeasureError> {
        if let Some(command) = self.device.trigger() {
            self.bus.write(command.bytes)?;
            tokio::time::sleep(self.timing.conversion).await;
        }
        Ok(())
    }

    /// Read exactly one frame
    pub fn read_frame(&mut self) -> Result<Vec<u8>, MeasureError> {
        Ok(self.bus.read(self.device.frame_len())?)
    }

    /// Acquire, decode and timestamp one reading
    ///
    /// Any failure moves the driver to `Faulted`.
    pub async fn measure(&mut self) -> Result<Reading, MeasureError> {
        if self.state != DeviceState::Ready {
            return Err(MeasureError::NotReady(self.state));
        }

        match self.acquire().await {
            Ok(measurement) => Ok(Reading::now(measurement)),
            Err(e) => {
                self.state = DeviceState::Faulted;
                Err(e)
            },
        }
    }

    async fn acquire(&mut self) -> Result<Measurement, MeasureError> {
        self.trigger_measure().await?;
        let frame = self.read_frame()?;
        Ok(self.device.decode(&frame)?)
    }

    /// Trigger and read one raw frame without decoding or state changes
    pub async fn sample_raw(&mut self) -> Result<Vec<u8>, MeasureError> {
        self.trigger_measure().await?;
        self.read_frame()
    }

    /// Close the bus; returns whether a channel was open
    pub fn release(&mut self) -> bool {
        if self.state == DeviceState::Ready {
            self.state = DeviceState::Uninitialized;
        }
        self.bus.close()
    }
}

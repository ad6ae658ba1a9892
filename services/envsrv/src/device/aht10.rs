//! AHT10 temperature/humidity sensor

use std::time::Duration;

use tracing::warn;

use super::{Command, SensorDevice, Timing};
use crate::codec::climate;
use crate::error::DecodeError;
use crate::reading::Measurement;

pub const ADDRESS: u16 = 0x38;

/// Load calibration coefficients
pub const CALIBRATE: Command = Command {
    name: "calibrate",
    bytes: &[0xE1, 0x08, 0x00],
};

pub const TRIGGER_MEASURE: Command = Command {
    name: "trigger_measure",
    bytes: &[0xAC, 0x33, 0x00],
};

pub const SETTLE: Duration = Duration::from_millis(50);

/// Datasheet minimum is 75 ms
pub const CONVERSION: Duration = Duration::from_millis(80);

const INIT_SEQUENCE: &[Command] = &[CALIBRATE];

#[derive(Debug, Default, Clone, Copy)]
pub struct Aht10;

impl SensorDevice for Aht10 {
    fn name(&self) -> &'static str {
        "AHT10"
    }

    fn address(&self) -> u16 {
        ADDRESS
    }

    fn init_sequence(&self) -> &'static [Command] {
        INIT_SEQUENCE
    }

    fn trigger(&self) -> Option<&'static Command> {
        Some(&TRIGGER_MEASURE)
    }

    fn frame_len(&self) -> usize {
        climate::FRAME_LEN
    }

    fn default_timing(&self) -> Timing {
        Timing {
            settle: SETTLE,
            conversion: CONVERSION,
        }
    }

    fn decode(&self, frame: &[u8]) -> Result<Measurement, DecodeError> {
        let sample = climate::decode(frame)?;
        if sample.status.busy() {
            warn!("AHT10 reported busy, using frame anyway (status {})", sample.status);
        }
        Ok(Measurement::Climate {
            temperature_c: sample.temperature_c,
            humidity_pct: sample.humidity_pct,
        })
    }

    fn describe_frame(&self, frame: &[u8]) -> String {
        match climate::decode_unchecked(frame) {
            Ok(sample) => format!(
                "status {}, Temp={:.2} C, Hum={:.2} %",
                sample.status, sample.temperature_c, sample.humidity_pct
            ),
            Err(e) => format!("decode failed: {}", e),
        }
    }
}

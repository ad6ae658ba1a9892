//! BH1750 ambient light sensor
//!
//! Runs in continuous high-resolution mode, so every read returns the latest
//! conversion and no trigger command is needed.

use std::time::Duration;

use super::{Command, SensorDevice, Timing};
use crate::codec::light;
use crate::error::DecodeError;
use crate::reading::Measurement;

/// Address with the ADDR pin tied low
pub const ADDRESS: u16 = 0x23;

pub const POWER_ON: Command = Command {
    name: "power_on",
    bytes: &[0x01],
};

/// Continuous high-resolution mode (1 lx resolution)
pub const CONTINUOUS_HIGH_RES: Command = Command {
    name: "continuous_high_res",
    bytes: &[0x10],
};

/// First high-resolution conversion takes up to 180 ms
pub const SETTLE: Duration = Duration::from_millis(180);

const INIT_SEQUENCE: &[Command] = &[POWER_ON, CONTINUOUS_HIGH_RES];

#[derive(Debug, Default, Clone, Copy)]
pub struct Bh1750;

impl SensorDevice for Bh1750 {
    fn name(&self) -> &'static str {
        "BH1750"
    }

    fn address(&self) -> u16 {
        ADDRESS
    }

    fn init_sequence(&self) -> &'static [Command] {
        INIT_SEQUENCE
    }

    fn frame_len(&self) -> usize {
        light::FRAME_LEN
    }

    fn default_timing(&self) -> Timing {
        Timing {
            settle: SETTLE,
            conversion: Duration::ZERO,
        }
    }

    fn decode(&self, frame: &[u8]) -> Result<Measurement, DecodeError> {
        Ok(Measurement::Light {
            lux: light::decode_lux(frame)?,
        })
    }
}

//! AHT10 temperature/humidity register format
//!
//! Frame layout: `[status, h1, h2, h3, t1, t2]`. Humidity and temperature are
//! 20-bit fields that split byte `h3`:
//!
//! ```text
//! humidity    = h1[7:0] h2[7:0] h3[7:4]
//! temperature = h3[3:0] t1[7:0] t2[7:0]
//! ```

use std::fmt;

use super::fixed_frame;
use crate::error::DecodeError;

/// Bytes per measurement frame
pub const FRAME_LEN: usize = 6;

/// 2^20, the span of both 20-bit fields
pub const FULL_SCALE: f64 = 1_048_576.0;

const STATUS_BUSY: u8 = 0x80;
const STATUS_CALIBRATED: u8 = 0x08;

/// Decoded status byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusFlags(u8);

impl StatusFlags {
    pub fn from_byte(status: u8) -> Self {
        Self(status)
    }

    pub fn raw(self) -> u8 {
        self.0
    }

    /// Bit 7: conversion still in progress
    pub fn busy(self) -> bool {
        self.0 & STATUS_BUSY != 0
    }

    /// Bit 3: calibration coefficients loaded
    pub fn calibrated(self) -> bool {
        self.0 & STATUS_CALIBRATED != 0
    }
}

impl fmt::Display for StatusFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "0x{:02X} (busy: {}, calibrated: {})",
            self.0,
            self.busy(),
            self.calibrated()
        )
    }
}

/// One decoded frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClimateSample {
    pub status: StatusFlags,
    pub temperature_c: f64,
    pub humidity_pct: f64,
}

/// Split the frame into `(raw_humidity, raw_temperature)`
pub fn raw_fields(frame: &[u8; FRAME_LEN]) -> (u32, u32) {
    let [_, h1, h2, h3, t1, t2] = (*frame).map(u32::from);
    let humidity = (h1 << 12) | (h2 << 4) | (h3 >> 4);
    let temperature = ((h3 & 0x0F) << 16) | (t1 << 8) | t2;
    (humidity, temperature)
}

/// Decode without looking at the status byte
///
/// Used by the diagnostic probe, which reports uncalibrated frames instead of
/// rejecting them.
pub fn decode_unchecked(frame: &[u8]) -> Result<ClimateSample, DecodeError> {
    let bytes = fixed_frame::<FRAME_LEN>(frame)?;
    let (raw_humidity, raw_temperature) = raw_fields(&bytes);

    Ok(ClimateSample {
        status: StatusFlags::from_byte(bytes[0]),
        temperature_c: f64::from(raw_temperature) / FULL_SCALE * 200.0 - 50.0,
        humidity_pct: f64::from(raw_humidity) / FULL_SCALE * 100.0,
    })
}

/// Decode a frame, rejecting it when the calibration flag is clear
pub fn decode(frame: &[u8]) -> Result<ClimateSample, DecodeError> {
    let sample = decode_unchecked(frame)?;
    if !sample.status.calibrated() {
        return Err(DecodeError::Uncalibrated {
            status: sample.status.raw(),
        });
    }
    Ok(sample)
}

//! BH1750 ambient light register format
//!
//! In continuous high-resolution mode the sensor returns the illuminance as a
//! 16-bit big-endian count with a fixed 1.2 counts/lux scale.

use super::fixed_frame;
use crate::error::DecodeError;

/// Bytes per measurement frame
pub const FRAME_LEN: usize = 2;

/// Counts per lux in high-resolution mode
pub const LUX_SCALE: f64 = 1.2;

/// Decode a 2-byte frame into lux
pub fn decode_lux(frame: &[u8]) -> Result<f64, DecodeError> {
    let bytes = fixed_frame::<FRAME_LEN>(frame)?;
    let raw = u16::from_be_bytes(bytes);
    Ok(f64::from(raw) / LUX_SCALE)
}

//! Register codecs
//!
//! Pure translation from raw register frames to engineering units. Nothing here
//! touches the bus or the clock.

pub mod climate;
pub mod light;

pub use climate::{ClimateSample, StatusFlags};
pub use light::decode_lux;

use crate::error::DecodeError;

/// Check that a frame has exactly `N` bytes
pub(crate) fn fixed_frame<const N: usize>(frame: &[u8]) -> Result<[u8; N], DecodeError> {
    frame.try_into().map_err(|_| DecodeError::FrameLength {
        expected: N,
        actual: frame.len(),
    })
}

//! Hex encoding utility
//! Used to put raw bus frames and commands into log lines

use std::fmt::Write;

/// Encode bytes to uppercase hex pairs separated by spaces
/// Example: [0x1C, 0x66, 0x3A] -> "1C 66 3A"
pub fn encode_spaced(data: &[u8]) -> String {
    let mut result = String::with_capacity(data.len() * 3);
    for (i, byte) in data.iter().enumerate() {
        if i > 0 {
            result.push(' ');
        }
        let _ = write!(&mut result, "{:02X}", byte);
    }
    result
}

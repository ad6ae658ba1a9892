//! Telemetry record encoding
//!
//! One line of JSON per reading, in the relay's historical layout:
//! `{"device_id": "bh1750-i2c-7", "timestamp_ms": 1000, "light": 123.45}`.
//! Keys are separated from values by `": "` and entries by `", "`; floats carry
//! two decimals and non-finite values become `null`.

use std::io;

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::ser::Formatter;

use crate::error::TransportError;
use crate::reading::{Measurement, Reading};

/// Compact JSON with spaced separators and fixed-precision floats
#[derive(Debug, Default, Clone, Copy)]
struct RecordFormatter;

impl Formatter for RecordFormatter {
    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }

    fn write_f64<W>(&mut self, writer: &mut W, value: f64) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        write!(writer, "{:.2}", value)
    }
}

struct TelemetryRecord<'a> {
    device_id: &'a str,
    reading: &'a Reading,
}

impl Serialize for TelemetryRecord<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("device_id", self.device_id)?;
        map.serialize_entry("timestamp_ms", &self.reading.timestamp_ms())?;
        match *self.reading.measurement() {
            Measurement::Light { lux } => {
                map.serialize_entry("light", &lux)?;
            },
            Measurement::Climate {
                temperature_c,
                humidity_pct,
            } => {
                map.serialize_entry("temperature_c", &temperature_c)?;
                map.serialize_entry("humidity", &humidity_pct)?;
            },
        }
        map.end()
    }
}

/// Encode a reading as a single-line telemetry record
pub fn encode_record(device_id: &str, reading: &Reading) -> Result<String, TransportError> {
    let mut buf = Vec::with_capacity(128);
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, RecordFormatter);
    TelemetryRecord { device_id, reading }
        .serialize(&mut serializer)
        .map_err(|e| TransportError::Encode(e.to_string()))?;
    String::from_utf8(buf).map_err(|e| TransportError::Encode(e.to_string()))
}

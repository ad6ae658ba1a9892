//! Decoded measurements

use std::fmt;

use chrono::Utc;

/// Sensor family a reading came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorKind {
    Light,
    TempHumidity,
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Light => f.write_str("light"),
            Self::TempHumidity => f.write_str("temp_humidity"),
        }
    }
}

/// Physical values carried by a reading
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Measurement {
    Light { lux: f64 },
    Climate { temperature_c: f64, humidity_pct: f64 },
}

impl Measurement {
    pub fn kind(&self) -> SensorKind {
        match self {
            Self::Light { .. } => SensorKind::Light,
            Self::Climate { .. } => SensorKind::TempHumidity,
        }
    }

    pub fn temperature_c(&self) -> Option<f64> {
        match self {
            Self::Climate { temperature_c, .. } => Some(*temperature_c),
            Self::Light { .. } => None,
        }
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Light { lux } => write!(f, "Light={:.2} Lux", lux),
            Self::Climate {
                temperature_c,
                humidity_pct,
            } => write!(f, "Temp={:.2} C, Hum={:.2} %", temperature_c, humidity_pct),
        }
    }
}

/// A validated measurement stamped with its acquisition time
///
/// Immutable once created; consumed by the telemetry emitter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    measurement: Measurement,
    timestamp_ms: i64,
}

impl Reading {
    pub fn new(measurement: Measurement, timestamp_ms: i64) -> Self {
        Self {
            measurement,
            timestamp_ms,
        }
    }

    /// Stamp a measurement with the current wall-clock time
    pub fn now(measurement: Measurement) -> Self {
        Self::new(measurement, Utc::now().timestamp_millis())
    }

    pub fn measurement(&self) -> &Measurement {
        &self.measurement
    }

    /// Milliseconds since the Unix epoch
    pub fn timestamp_ms(&self) -> i64 {
        self.timestamp_ms
    }

    pub fn kind(&self) -> SensorKind {
        self.measurement.kind()
    }
}

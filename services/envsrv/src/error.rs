//! Error handling for the sensor collector
//!
//! Each layer has its own error type (bus, codec, driver, telemetry). They all map onto
//! a small [`ErrorKind`] taxonomy used in logs. Only startup errors (configuration,
//! probe init, telemetry socket construction) ever reach `main`.

use std::fmt;

use thiserror::Error;

use crate::device::DeviceState;

/// Coarse error taxonomy used for logging and recovery decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bus cannot be opened or the device cannot be addressed (retried next cycle)
    ResourceUnavailable,
    /// Transfer failure or count mismatch (forces reinitialization)
    Io,
    /// Uncalibrated status, malformed frame or implausible value
    DecodeInvalid,
    /// Telemetry could not be sent (reading dropped)
    Transport,
    /// Invalid startup configuration
    Configuration,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ResourceUnavailable => "resource_unavailable",
            Self::Io => "io",
            Self::DecodeInvalid => "decode_invalid",
            Self::Transport => "transport",
            Self::Configuration => "configuration",
        };
        f.write_str(name)
    }
}

/// Direction of a bus transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferOp {
    Write,
    Read,
}

impl fmt::Display for TransferOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Write => f.write_str("write"),
            Self::Read => f.write_str("read"),
        }
    }
}

/// Bus handle errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BusError {
    /// The bus channel could not be created (permissions, missing device, bad path)
    #[error("Bus unavailable: {path}: {reason}")]
    Unavailable { path: String, reason: String },

    /// The target address was not accepted
    #[error("Address 0x{address:02X} not acknowledged: {reason}")]
    AddressNak { address: u16, reason: String },

    /// Fewer bytes moved than requested; never treated as partial success
    #[error("Short {op}: expected {expected} bytes, transferred {actual}")]
    ShortTransfer {
        op: TransferOp,
        expected: usize,
        actual: usize,
    },

    /// The transfer itself failed
    #[error("Bus {op} failed: {reason}")]
    Io { op: TransferOp, reason: String },

    /// Write or read attempted on a closed handle
    #[error("Bus channel is not open")]
    NotOpen,
}

impl BusError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Unavailable { .. } | Self::AddressNak { .. } => ErrorKind::ResourceUnavailable,
            Self::ShortTransfer { .. } | Self::Io { .. } | Self::NotOpen => ErrorKind::Io,
        }
    }
}

/// Register codec and plausibility errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    #[error("Frame length mismatch: expected {expected} bytes, got {actual}")]
    FrameLength { expected: usize, actual: usize },

    /// Calibration flag (status bit 3) clear
    #[error("Device not calibrated (status 0x{status:02X})")]
    Uncalibrated { status: u8 },

    #[error("{quantity} out of range: {value:.2} not in ({min}, {max})")]
    OutOfRange {
        quantity: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
}

impl DecodeError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::DecodeInvalid
    }

    /// Whether the device must be re-initialized after this error
    ///
    /// Out-of-range values are dropped without touching the device.
    pub fn requires_reinit(&self) -> bool {
        !matches!(self, Self::OutOfRange { .. })
    }
}

/// Device initialization errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InitError {
    #[error("{sensor}: bus open failed: {source}")]
    Open {
        sensor: &'static str,
        #[source]
        source: BusError,
    },

    #[error("{sensor}: command '{command}' failed: {source}")]
    Command {
        sensor: &'static str,
        command: &'static str,
        #[source]
        source: BusError,
    },
}

impl InitError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Open { source, .. } | Self::Command { source, .. } => source.kind(),
        }
    }
}

/// Measurement errors
///
/// Everything except an implausible value sends the acquisition loop through
/// release, cooldown and re-init.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MeasureError {
    #[error("I/O failure: {0}")]
    Io(#[from] BusError),

    #[error("Invalid frame: {0}")]
    Invalid(#[from] DecodeError),

    #[error("Device not ready (state: {0})")]
    NotReady(DeviceState),
}

impl MeasureError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io(e) => e.kind(),
            Self::Invalid(e) => e.kind(),
            Self::NotReady(_) => ErrorKind::ResourceUnavailable,
        }
    }

    /// Whether the device must be released and re-initialized
    pub fn requires_reinit(&self) -> bool {
        match self {
            Self::Invalid(e) => e.requires_reinit(),
            Self::Io(_) | Self::NotReady(_) => true,
        }
    }
}

/// Telemetry transport errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    #[error("Failed to resolve relay {target}: {reason}")]
    Resolve { target: String, reason: String },

    #[error("Failed to bind telemetry socket: {0}")]
    Bind(String),

    #[error("Failed to encode telemetry record: {0}")]
    Encode(String),

    #[error("Send to {destination} failed: {reason}")]
    Send { destination: String, reason: String },

    #[error("Short send to {destination}: {sent} of {expected} bytes")]
    ShortSend {
        destination: String,
        sent: usize,
        expected: usize,
    },
}

impl TransportError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Transport
    }
}

/// Service-level error type
#[derive(Error, Debug)]
pub enum EnvSrvError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Init(#[from] InitError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl EnvSrvError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) => ErrorKind::Configuration,
            Self::Init(e) => e.kind(),
            Self::Transport(e) => e.kind(),
        }
    }
}

/// Result type alias for the collector service
pub type Result<T> = std::result::Result<T, EnvSrvError>;

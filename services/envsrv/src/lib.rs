//! Environmental sensor collector
//!
//! Polls one I2C sensor (BH1750 light or AHT10 temperature/humidity), decodes its
//! registers into engineering units and forwards each reading to a relay as a
//! single UDP datagram. The device is re-initialized after any failure; nothing on
//! the bus or the network stops the process.

pub mod bus;
pub mod codec;
pub mod config;
pub mod device;
pub mod error;
pub mod probe;
pub mod reading;
pub mod runtime;
pub mod service;
pub mod telemetry;

pub use config::{CollectorArgs, CollectorConfig, SensorModel};
pub use error::{EnvSrvError, ErrorKind, Result};
pub use service::{run_collector, run_probe};

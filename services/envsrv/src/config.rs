//! Collector configuration
//!
//! Command-line arguments (with environment fallbacks) are collected into
//! [`CollectorArgs`] and converted into a validated [`CollectorConfig`].

use std::fmt;
use std::time::Duration;

use clap::{Args, ValueEnum};

use crate::bus::{parse_bus_index, I2C_DEVICE_PREFIX};
use crate::device::{Aht10, Bh1750, SensorDevice, Timing};
use crate::error::{EnvSrvError, Result};
use crate::runtime::RecoveryPolicy;

pub const DEFAULT_BUS_PATH: &str = "/dev/i2c-7";
pub const DEFAULT_RELAY_HOST: &str = "127.0.0.1";
pub const DEFAULT_RELAY_PORT: u16 = 9999;
pub const DEFAULT_SAMPLE_INTERVAL_MS: u64 = 1000;
pub const DEFAULT_COOLDOWN_MS: u64 = 500;
pub const DEFAULT_MAX_COOLDOWN_MS: u64 = 30_000;
pub const DEFAULT_BACKOFF_MULTIPLIER: f64 = 1.0;

/// Supported sensor models
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SensorModel {
    /// BH1750 ambient light sensor
    Bh1750,
    /// AHT10 temperature/humidity sensor
    Aht10,
}

impl SensorModel {
    /// Lowercase model name
    pub fn slug(self) -> &'static str {
        match self {
            Self::Bh1750 => "bh1750",
            Self::Aht10 => "aht10",
        }
    }

    /// Device id the relay knows this model by
    ///
    /// Fixed per model so that moving the sensor to another bus does not change
    /// its identity downstream.
    pub fn default_device_id(self) -> &'static str {
        match self {
            Self::Bh1750 => "bh1750-i2c-7",
            Self::Aht10 => "aht10-i2c-7",
        }
    }

    pub fn default_timing(self) -> Timing {
        match self {
            Self::Bh1750 => Bh1750.default_timing(),
            Self::Aht10 => Aht10.default_timing(),
        }
    }
}

impl fmt::Display for SensorModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

/// Collector command-line arguments
#[derive(Debug, Clone, Args)]
pub struct CollectorArgs {
    /// Sensor model attached to the bus
    #[arg(long, value_enum, env = "SENSOR_MODEL")]
    pub sensor: SensorModel,

    /// I2C character device
    #[arg(long = "bus", env = "I2C_DEVICE", default_value = DEFAULT_BUS_PATH)]
    pub bus_path: String,

    /// Telemetry relay host (name or address, resolved once at startup)
    #[arg(long, env = "RELAY_HOST", default_value = DEFAULT_RELAY_HOST)]
    pub relay_host: String,

    /// Telemetry relay UDP port
    #[arg(long, env = "RELAY_PORT", default_value_t = DEFAULT_RELAY_PORT)]
    pub relay_port: u16,

    /// Device id in telemetry records (default: <model>-i2c-7)
    #[arg(long, env = "DEVICE_ID")]
    pub device_id: Option<String>,

    /// Sampling period in milliseconds
    #[arg(long, env = "SAMPLE_INTERVAL_MS", default_value_t = DEFAULT_SAMPLE_INTERVAL_MS)]
    pub sample_interval_ms: u64,

    /// Cooldown before re-initializing a failed device, in milliseconds
    #[arg(long, env = "COOLDOWN_MS", default_value_t = DEFAULT_COOLDOWN_MS)]
    pub cooldown_ms: u64,

    /// Upper bound for the re-init cooldown, in milliseconds
    #[arg(long, env = "MAX_COOLDOWN_MS", default_value_t = DEFAULT_MAX_COOLDOWN_MS)]
    pub max_cooldown_ms: u64,

    /// Cooldown growth per consecutive failed init (1.0 = fixed)
    #[arg(long, env = "BACKOFF_MULTIPLIER", default_value_t = DEFAULT_BACKOFF_MULTIPLIER)]
    pub backoff_multiplier: f64,

    /// Override the post-init settle delay, in milliseconds
    #[arg(long, env = "SETTLE_MS")]
    pub settle_ms: Option<u64>,

    /// Override the post-trigger conversion delay, in milliseconds
    #[arg(long, env = "CONVERSION_MS")]
    pub conversion_ms: Option<u64>,
}

/// Runtime configuration of one collector process
#[derive(Debug, Clone, PartialEq)]
pub struct CollectorConfig {
    pub sensor: SensorModel,
    pub bus_path: String,
    pub relay_host: String,
    pub relay_port: u16,
    pub device_id: Option<String>,
    pub sample_interval_ms: u64,
    pub cooldown_ms: u64,
    pub max_cooldown_ms: u64,
    pub backoff_multiplier: f64,
    pub settle_ms: Option<u64>,
    pub conversion_ms: Option<u64>,
}

impl CollectorConfig {
    /// Defaults for a sensor model
    pub fn new(sensor: SensorModel) -> Self {
        Self {
            sensor,
            bus_path: DEFAULT_BUS_PATH.to_string(),
            relay_host: DEFAULT_RELAY_HOST.to_string(),
            relay_port: DEFAULT_RELAY_PORT,
            device_id: None,
            sample_interval_ms: DEFAULT_SAMPLE_INTERVAL_MS,
            cooldown_ms: DEFAULT_COOLDOWN_MS,
            max_cooldown_ms: DEFAULT_MAX_COOLDOWN_MS,
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
            settle_ms: None,
            conversion_ms: None,
        }
    }

    /// Reject configurations the collector cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.bus_index().is_none() {
            return Err(EnvSrvError::Config(format!(
                "bus path '{}' is not of the form {}N",
                self.bus_path, I2C_DEVICE_PREFIX
            )));
        }
        if self.relay_host.trim().is_empty() {
            return Err(EnvSrvError::Config("relay host is empty".to_string()));
        }
        if self.relay_port == 0 {
            return Err(EnvSrvError::Config("relay port must be non-zero".to_string()));
        }
        if self.sample_interval_ms == 0 {
            return Err(EnvSrvError::Config(
                "sample interval must be non-zero".to_string(),
            ));
        }
        if self.cooldown_ms == 0 {
            return Err(EnvSrvError::Config("cooldown must be non-zero".to_string()));
        }
        if self.max_cooldown_ms < self.cooldown_ms {
            return Err(EnvSrvError::Config(format!(
                "max cooldown ({} ms) is below the cooldown ({} ms)",
                self.max_cooldown_ms, self.cooldown_ms
            )));
        }
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            return Err(EnvSrvError::Config(format!(
                "backoff multiplier must be >= 1.0, got {}",
                self.backoff_multiplier
            )));
        }
        if matches!(&self.device_id, Some(id) if id.trim().is_empty()) {
            return Err(EnvSrvError::Config("device id is empty".to_string()));
        }
        Ok(())
    }

    /// Bus number parsed from the bus path
    pub fn bus_index(&self) -> Option<u8> {
        parse_bus_index(&self.bus_path)
    }

    /// Device id carried in telemetry records
    pub fn device_id(&self) -> String {
        self.device_id
            .clone()
            .unwrap_or_else(|| self.sensor.default_device_id().to_string())
    }

    /// Sensor timing with any overrides applied
    pub fn timing(&self) -> Timing {
        let defaults = self.sensor.default_timing();
        Timing {
            settle: self
                .settle_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.settle),
            conversion: self
                .conversion_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.conversion),
        }
    }

    pub fn recovery_policy(&self) -> RecoveryPolicy {
        RecoveryPolicy::from_config(
            self.cooldown_ms,
            self.max_cooldown_ms,
            self.backoff_multiplier,
        )
    }

    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms)
    }

    /// Relay endpoint as configured (before resolution)
    pub fn relay_endpoint(&self) -> String {
        format!("{}:{}", self.relay_host, self.relay_port)
    }
}

impl From<CollectorArgs> for CollectorConfig {
    fn from(args: CollectorArgs) -> Self {
        Self {
            sensor: args.sensor,
            bus_path: args.bus_path,
            relay_host: args.relay_host,
            relay_port: args.relay_port,
            device_id: args.device_id,
            sample_interval_ms: args.sample_interval_ms,
            cooldown_ms: args.cooldown_ms,
            max_cooldown_ms: args.max_cooldown_ms,
            backoff_multiplier: args.backoff_multiplier,
            settle_ms: args.settle_ms,
            conversion_ms: args.conversion_ms,
        }
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use clap::Parser;

    use super::*;
    use crate::error::ErrorKind;

    #[derive(Parser, Debug)]
    struct TestCli {
        #[command(flatten)]
        collector: CollectorArgs,
    }

    fn parse(args: &[&str]) -> CollectorConfig {
        let argv = std::iter::once("envsrv").chain(args.iter().copied());
        TestCli::try_parse_from(argv).unwrap().collector.into()
    }

    #[test]
    fn test_defaults() {
        let config = CollectorConfig::new(SensorModel::Bh1750);
        assert_eq!(config.bus_path, "/dev/i2c-7");
        assert_eq!(config.relay_endpoint(), "127.0.0.1:9999");
        assert_eq!(config.sample_interval(), Duration::from_secs(1));
        assert_eq!(config.device_id(), "bh1750-i2c-7");
        assert!(config.validate().is_ok());

        let policy = config.recovery_policy();
        assert_eq!(policy.initial_delay, Duration::from_millis(500));
        assert_eq!(policy.max_delay, Duration::from_secs(30));
        assert_eq!(policy.backoff_multiplier, 1.0);
    }

    #[test]
    fn test_cli_overrides() {
        let config = parse(&[
            "--sensor",
            "aht10",
            "--bus",
            "/dev/i2c-1",
            "--relay-host",
            "10.0.0.5",
            "--relay-port",
            "9000",
            "--settle-ms",
            "10",
        ]);
        assert_eq!(config.sensor, SensorModel::Aht10);
        assert_eq!(config.bus_index(), Some(1));
        assert_eq!(config.device_id(), "aht10-i2c-7");
        assert_eq!(config.relay_endpoint(), "10.0.0.5:9000");
        assert_eq!(config.timing().settle, Duration::from_millis(10));
        assert_eq!(config.timing().conversion, Duration::from_millis(80));
    }

    #[test]
    fn test_device_id_override() {
        let config = parse(&["--sensor", "bh1750", "--device-id", "greenhouse-light"]);
        assert_eq!(config.device_id(), "greenhouse-light");
    }

    #[test]
    fn test_unknown_sensor_rejected_by_parser() {
        let result = TestCli::try_parse_from(["envsrv", "--sensor", "dht22"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_validation_errors() {
        let base = CollectorConfig::new(SensorModel::Aht10);

        let cases = [
            CollectorConfig {
                bus_path: "/dev/ttyS0".to_string(),
                ..base.clone()
            },
            CollectorConfig {
                relay_port: 0,
                ..base.clone()
            },
            CollectorConfig {
                sample_interval_ms: 0,
                ..base.clone()
            },
            CollectorConfig {
                cooldown_ms: 0,
                ..base.clone()
            },
            CollectorConfig {
                max_cooldown_ms: 100,
                ..base.clone()
            },
            CollectorConfig {
                backoff_multiplier: 0.5,
                ..base.clone()
            },
            CollectorConfig {
                device_id: Some("  ".to_string()),
                ..base.clone()
            },
        ];

        for config in cases {
            let err = config.validate().unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Configuration, "{:?}", config);
        }
    }

    #[test]
    fn test_device_id_does_not_follow_bus_override() {
        for (model, expected) in [
            (SensorModel::Bh1750, "bh1750-i2c-7"),
            (SensorModel::Aht10, "aht10-i2c-7"),
        ] {
            let config = CollectorConfig {
                bus_path: "/dev/i2c-1".to_string(),
                ..CollectorConfig::new(model)
            };
            assert!(config.validate().is_ok());
            assert_eq!(config.device_id(), expected);
        }
    }
}

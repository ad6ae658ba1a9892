//! Linux `/dev/i2c-N` backend
//!
//! Built on rppal's `I2c`, which reports the byte count of every transfer.
//! On other platforms the connector always reports the bus as unavailable.

use super::{parse_bus_index, BusChannel, BusConnector, I2C_DEVICE_PREFIX};
use crate::error::BusError;

/// Opens `/dev/i2c-N` character devices
#[derive(Debug, Default, Clone, Copy)]
pub struct I2cConnector;

impl I2cConnector {
    pub fn new() -> Self {
        Self
    }
}

fn bus_index(path: &str) -> Result<u8, BusError> {
    parse_bus_index(path).ok_or_else(|| BusError::Unavailable {
        path: path.to_string(),
        reason: format!("expected a path of the form {}N", I2C_DEVICE_PREFIX),
    })
}

#[cfg(target_os = "linux")]
pub use self::imp::I2cChannel;

#[cfg(target_os = "linux")]
mod imp {
    use rppal::i2c::I2c;

    use super::*;
    use crate::error::TransferOp;

    /// Open I2C character device
    pub struct I2cChannel {
        i2c: I2c,
    }

    impl BusConnector for I2cConnector {
        type Channel = I2cChannel;

        fn open(&mut self, path: &str) -> Result<I2cChannel, BusError> {
            let bus = bus_index(path)?;
            let i2c = I2c::with_bus(bus).map_err(|e| BusError::Unavailable {
                path: path.to_string(),
                reason: e.to_string(),
            })?;
            Ok(I2cChannel { i2c })
        }
    }

    impl BusChannel for I2cChannel {
        fn bind(&mut self, address: u16) -> Result<(), BusError> {
            self.i2c
                .set_slave_address(address)
                .map_err(|e| BusError::AddressNak {
                    address,
                    reason: e.to_string(),
                })
        }

        fn write(&mut self, bytes: &[u8]) -> Result<usize, BusError> {
            self.i2c.write(bytes).map_err(|e| BusError::Io {
                op: TransferOp::Write,
                reason: e.to_string(),
            })
        }

        fn read(&mut self, buf: &mut [u8]) -> Result<usize, BusError> {
            self.i2c.read(buf).map_err(|e| BusError::Io {
                op: TransferOp::Read,
                reason: e.to_string(),
            })
        }
    }
}

#[cfg(not(target_os = "linux"))]
pub use self::stub::I2cChannel;

#[cfg(not(target_os = "linux"))]
mod stub {
    use super::*;

    /// No I2C channels exist off Linux
    pub enum I2cChannel {}

    impl BusConnector for I2cConnector {
        type Channel = I2cChannel;

        fn open(&mut self, path: &str) -> Result<I2cChannel, BusError> {
            bus_index(path)?;
            Err(BusError::Unavailable {
                path: path.to_string(),
                reason: "I2C character devices are only available on Linux".to_string(),
            })
        }
    }

    impl BusChannel for I2cChannel {
        fn bind(&mut self, _address: u16) -> Result<(), BusError> {
            match *self {}
        }

        fn write(&mut self, _bytes: &[u8]) -> Result<usize, BusError> {
            match *self {}
        }

        fn read(&mut self, _buf: &mut [u8]) -> Result<usize, BusError> {
            match *self {}
        }
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;

    #[test]
    fn test_malformed_path_is_unavailable() {
        let mut connector = I2cConnector::new();
        let err = connector.open("/dev/ttyUSB0").err().unwrap();
        match err {
            BusError::Unavailable { path, reason } => {
                assert_eq!(path, "/dev/ttyUSB0");
                assert!(reason.contains("/dev/i2c-N"));
            },
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_bus_is_unavailable() {
        // Bus 250 does not exist on any test host
        let mut connector = I2cConnector::new();
        let err = connector.open("/dev/i2c-250").err().unwrap();
        assert!(matches!(err, BusError::Unavailable { .. }));
    }
}

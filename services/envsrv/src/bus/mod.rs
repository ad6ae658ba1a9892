//! Bus handle
//!
//! A [`BusHandle`] owns the channel to a single device address. The channel is opened
//! lazily, bound to the target address, and released exactly once. Backends plug in
//! through [`BusConnector`] and [`BusChannel`]:
//! - [`linux::I2cConnector`]: `/dev/i2c-N` character devices
//! - [`mock::MockConnector`]: scripted in-memory bus used by tests

pub mod linux;
pub mod mock;

pub use linux::I2cConnector;

use tracing::debug;

use crate::error::{BusError, TransferOp};

/// Prefix of Linux I2C character devices
pub const I2C_DEVICE_PREFIX: &str = "/dev/i2c-";

/// An open OS-level channel to the bus
///
/// `write` and `read` return the number of bytes actually transferred; the
/// handle decides what a short count means.
pub trait BusChannel {
    /// Address all following transfers to `address`
    fn bind(&mut self, address: u16) -> Result<(), BusError>;

    fn write(&mut self, bytes: &[u8]) -> Result<usize, BusError>;

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, BusError>;
}

/// Creates channels for a bus path
pub trait BusConnector {
    type Channel: BusChannel;

    fn open(&mut self, path: &str) -> Result<Self::Channel, BusError>;
}

/// Extract the bus number from a `/dev/i2c-N` path
pub fn parse_bus_index(path: &str) -> Option<u8> {
    path.strip_prefix(I2C_DEVICE_PREFIX)?.parse().ok()
}

/// Exclusive owner of the channel to one device
pub struct BusHandle<C: BusConnector> {
    connector: C,
    path: String,
    address: u16,
    channel: Option<C::Channel>,
}

impl<C: BusConnector> BusHandle<C> {
    /// Create a closed handle; nothing touches the bus until [`open`](Self::open)
    pub fn new(connector: C, path: impl Into<String>, address: u16) -> Self {
        Self {
            connector,
            path: path.into(),
            address,
            channel: None,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn address(&self) -> u16 {
        self.address
    }

    pub fn is_open(&self) -> bool {
        self.channel.is_some()
    }

    /// Open and bind the channel if it is not open yet
    ///
    /// A channel whose bind fails is dropped before returning, so a failed open
    /// never leaves a resource behind.
    pub fn open(&mut self) -> Result<(), BusError> {
        if self.channel.is_some() {
            return Ok(());
        }

        let mut channel = self.connector.open(&self.path)?;
        channel.bind(self.address)?;

        debug!("Bus {} opened, bound to 0x{:02X}", self.path, self.address);
        self.channel = Some(channel);
        Ok(())
    }

    /// Write all of `bytes`; a short count is an error
    pub fn write(&mut self, bytes: &[u8]) -> Result<usize, BusError> {
        let channel = self.channel.as_mut().ok_or(BusError::NotOpen)?;
        let written = channel.write(bytes)?;
        if written != bytes.len() {
            return Err(BusError::ShortTransfer {
                op: TransferOp::Write,
                expected: bytes.len(),
                actual: written,
            });
        }
        Ok(written)
    }

    /// Read exactly `len` bytes
    pub fn read(&mut self, len: usize) -> Result<Vec<u8>, BusError> {
        let channel = self.channel.as_mut().ok_or(BusError::NotOpen)?;
        let mut buf = vec![0u8; len];
        let received = channel.read(&mut buf)?;
        if received != len {
            return Err(BusError::ShortTransfer {
                op: TransferOp::Read,
                expected: len,
                actual: received,
            });
        }
        Ok(buf)
    }

    /// Release the channel; returns whether anything was open
    pub fn close(&mut self) -> bool {
        match self.channel.take() {
            Some(channel) => {
                drop(channel);
                debug!("Bus {} closed", self.path);
                true
            },
            None => false,
        }
    }
}

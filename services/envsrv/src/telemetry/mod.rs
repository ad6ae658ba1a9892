//! Telemetry emitter
//!
//! Serializes readings into single-line records and publishes each one as a
//! best-effort message. Nothing is buffered or retried: a failed send drops the
//! reading.

pub mod capture;
pub mod record;
pub mod udp;

pub use capture::CaptureSink;
pub use record::encode_record;
pub use udp::UdpSink;

use async_trait::async_trait;
use tracing::debug;

use crate::error::TransportError;
use crate::reading::Reading;

/// Destination for encoded telemetry records
#[async_trait]
pub trait TelemetrySink: Send {
    /// Publish one record; returns the bytes handed to the transport
    async fn publish(&mut self, payload: &str) -> Result<usize, TransportError>;

    /// Human-readable destination for logs
    fn destination(&self) -> String;
}

/// Encodes readings for one device and hands them to a sink
pub struct TelemetryEmitter<S: TelemetrySink> {
    device_id: String,
    sink: S,
}

impl<S: TelemetrySink> TelemetryEmitter<S> {
    pub fn new(device_id: impl Into<String>, sink: S) -> Self {
        Self {
            device_id: device_id.into(),
            sink,
        }
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn destination(&self) -> String {
        self.sink.destination()
    }

    /// Encode and publish one reading
    pub async fn emit(&mut self, reading: &Reading) -> Result<(), TransportError> {
        let payload = encode_record(&self.device_id, reading)?;
        self.sink.publish(&payload).await?;
        debug!("Sent {}", payload);
        Ok(())
    }
}

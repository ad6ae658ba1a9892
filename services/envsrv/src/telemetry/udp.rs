//! UDP datagram sink

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};

use async_trait::async_trait;
use tokio::net::{lookup_host, UdpSocket};
use tracing::debug;

use super::TelemetrySink;
use crate::error::TransportError;

/// Fire-and-forget sink sending one datagram per record
///
/// The relay address is resolved once, when the sink is created.
#[derive(Debug)]
pub struct UdpSink {
    socket: UdpSocket,
    target: SocketAddr,
}

impl UdpSink {
    /// Resolve `host:port` and bind an ephemeral local socket of the same family
    pub async fn connect(host: &str, port: u16) -> Result<Self, TransportError> {
        let resolve_error = |reason: String| TransportError::Resolve {
            target: format!("{}:{}", host, port),
            reason,
        };

        let target = lookup_host((host, port))
            .await
            .map_err(|e| resolve_error(e.to_string()))?
            .next()
            .ok_or_else(|| resolve_error("no addresses found".to_string()))?;

        let local: SocketAddr = if target.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let socket = UdpSocket::bind(local)
            .await
            .map_err(|e| TransportError::Bind(e.to_string()))?;

        debug!("Telemetry socket bound, relay {}", target);
        Ok(Self { socket, target })
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }
}

#[async_trait]
impl TelemetrySink for UdpSink {
    async fn publish(&mut self, payload: &str) -> Result<usize, TransportError> {
        let bytes = payload.as_bytes();
        let sent = self
            .socket
            .send_to(bytes, self.target)
            .await
            .map_err(|e| TransportError::Send {
                destination: self.target.to_string(),
                reason: e.to_string(),
            })?;

        if sent != bytes.len() {
            return Err(TransportError::ShortSend {
                destination: self.target.to_string(),
                sent,
                expected: bytes.len(),
            });
        }
        Ok(sent)
    }

    fn destination(&self) -> String {
        self.target.to_string()
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_datagram_reaches_relay() {
        let relay = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let port = relay.local_addr().unwrap().port();

        let mut sink = UdpSink::connect("127.0.0.1", port).await.unwrap();
        assert_eq!(sink.target().port(), port);
        assert_eq!(sink.destination(), format!("127.0.0.1:{}", port));

        let payload = r#"{"device_id": "bh1750-i2c-7", "timestamp_ms": 1000, "light": 123.45}"#;
        let sent = sink.publish(payload).await.unwrap();
        assert_eq!(sent, payload.len());

        let mut buf = [0u8; 256];
        let (len, _) = relay.recv_from(&mut buf).await.unwrap();
        assert_eq!(std::str::from_utf8(&buf[..len]).unwrap(), payload);
    }

    #[tokio::test]
    async fn test_unresolvable_host_fails() {
        let err = UdpSink::connect("relay.invalid", 9999).await.unwrap_err();
        assert!(matches!(err, TransportError::Resolve { .. }));
    }
}

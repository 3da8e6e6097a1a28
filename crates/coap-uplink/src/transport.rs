// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

// Datagram transport abstraction and the one-shot UDP implementation.

use std::net::{IpAddr, SocketAddr, ToSocketAddrs};
use std::time::Duration;

use crate::config::UplinkConfig;
use crate::error::{AddressError, TransmitError, TransportError};

// ---------------------------------------------------------------------------
// Send report
// ---------------------------------------------------------------------------

/// Result of a datagram fully accepted by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendReport {
    pub destination: SocketAddr,
    pub bytes_sent: usize,
}

// ---------------------------------------------------------------------------
// Transport trait
// ---------------------------------------------------------------------------

/// Sends exactly one datagram per call. No retransmission, no
/// acknowledgement wait.
pub trait DatagramTransport: Send + Sync {
    fn send(&self, host: &str, port: u16, data: &[u8]) -> Result<SendReport, TransportError>;
}

impl<T: DatagramTransport + ?Sized> DatagramTransport for std::sync::Arc<T> {
    fn send(&self, host: &str, port: u16, data: &[u8]) -> Result<SendReport, TransportError> {
        (**self).send(host, port, data)
    }
}

// ---------------------------------------------------------------------------
// UDP transport
// ---------------------------------------------------------------------------

/// UDP transport using `socket2`.
///
/// Each call opens an ephemeral socket and drops it before returning, so
/// concurrent sends never share a handle.
#[derive(Debug, Clone)]
pub struct UdpTransport {
    resolve_hostnames: bool,
    send_timeout: Option<Duration>,
}

impl Default for UdpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl UdpTransport {
    /// Literal addresses only, no write timeout.
    pub fn new() -> Self {
        Self {
            resolve_hostnames: false,
            send_timeout: None,
        }
    }

    pub fn from_config(config: &UplinkConfig) -> Self {
        Self {
            resolve_hostnames: config.resolve_hostnames,
            send_timeout: Some(config.send_timeout()),
        }
    }

    pub fn with_hostname_resolution(mut self, enabled: bool) -> Self {
        self.resolve_hostnames = enabled;
        self
    }

    pub fn with_send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = Some(timeout);
        self
    }

    /// Turn `host` into a socket address.
    pub fn resolve(&self, host: &str, port: u16) -> Result<SocketAddr, AddressError> {
        if let Ok(ip) = host.parse::<IpAddr>() {
            return Ok(SocketAddr::new(ip, port));
        }
        if !self.resolve_hostnames {
            return Err(AddressError::InvalidLiteral(host.to_string()));
        }
        let mut addrs = (host, port)
            .to_socket_addrs()
            .map_err(|e| AddressError::Resolution {
                host: host.to_string(),
                reason: e.to_string(),
            })?;
        addrs.next().ok_or_else(|| AddressError::Resolution {
            host: host.to_string(),
            reason: "no addresses".into(),
        })
    }
}

impl DatagramTransport for UdpTransport {
    fn send(&self, host: &str, port: u16, data: &[u8]) -> Result<SendReport, TransportError> {
        let destination = self.resolve(host, port).map_err(|e| {
            log::error!("Invalid destination address: {}", host);
            e
        })?;

        let socket = socket2::Socket::new(
            socket2::Domain::for_address(destination),
            socket2::Type::DGRAM,
            Some(socket2::Protocol::UDP),
        )
        .map_err(|e| TransmitError::Socket(e.to_string()))?;
        if let Some(timeout) = self.send_timeout {
            socket
                .set_write_timeout(Some(timeout))
                .map_err(|e| TransmitError::Socket(e.to_string()))?;
        }

        let result = socket.send_to(data, &destination.into());
        // Released before the outcome is reported
        drop(socket);

        let sent = result.map_err(|e| TransmitError::Send(e.to_string()))?;
        if sent != data.len() {
            return Err(TransmitError::ShortWrite {
                sent,
                expected: data.len(),
            }
            .into());
        }

        log::debug!("UDP datagram sent to {} ({} bytes)", destination, sent);
        Ok(SendReport {
            destination,
            bytes_sent: sent,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_literals() {
        let udp = UdpTransport::new();
        assert_eq!(
            udp.resolve("192.168.1.52", 5683).unwrap(),
            "192.168.1.52:5683".parse::<SocketAddr>().unwrap()
        );
        assert_eq!(
            udp.resolve("::1", 5683).unwrap(),
            "[::1]:5683".parse::<SocketAddr>().unwrap()
        );
    }

    #[test]
    fn test_hostname_rejected_without_resolution() {
        let udp = UdpTransport::new();
        assert_eq!(
            udp.resolve("localhost", 5683),
            Err(AddressError::InvalidLiteral("localhost".into()))
        );
        assert_eq!(
            udp.resolve("300.1.1.1", 5683),
            Err(AddressError::InvalidLiteral("300.1.1.1".into()))
        );
    }

    #[test]
    fn test_hostname_resolution_enabled() {
        let udp = UdpTransport::new().with_hostname_resolution(true);
        let addr = udp.resolve("localhost", 5683).unwrap();
        assert!(addr.ip().is_loopback());
        assert_eq!(addr.port(), 5683);
    }

    #[test]
    fn test_send_loopback() {
        let receiver = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
        receiver
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        let port = receiver.local_addr().unwrap().port();

        let udp = UdpTransport::new().with_send_timeout(Duration::from_secs(1));
        let report = udp.send("127.0.0.1", port, b"hello uplink").unwrap();
        assert_eq!(report.bytes_sent, 12);
        assert_eq!(report.destination.port(), port);

        let mut buf = [0u8; 64];
        let (n, _) = receiver.recv_from(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"hello uplink");
    }

    #[test]
    fn test_send_invalid_address_sends_nothing() {
        let udp = UdpTransport::new();
        let err = udp.send("not-an-ip", 5683, b"x").unwrap_err();
        assert_eq!(
            err,
            TransportError::Address(AddressError::InvalidLiteral("not-an-ip".into()))
        );
    }

    #[test]
    fn test_oversized_datagram_is_transmit_error() {
        let udp = UdpTransport::new();
        let data = vec![0u8; 70_000];
        let err = udp.send("127.0.0.1", 9, &data).unwrap_err();
        assert!(matches!(
            err,
            TransportError::Transmit(TransmitError::Send(_))
        ));
    }
}

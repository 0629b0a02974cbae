//! UDP Network Transport
//!
//! Datagram transport over a tokio `UdpSocket`. Every datagram carries a
//! six-byte transport frame ahead of the Orbitlink message:
//!
//! ```text
//! ┌──────────┬──────────────┬────────────────────┬─────────────┐
//! │ kind (1) │ category (1) │ sequence (u32, BE) │ message ... │
//! └──────────┴──────────────┴────────────────────┴─────────────┘
//! ```
//!
//! `Sequenced` datagrams older than the newest seen are dropped on receive.
//! Reliable categories are sent once; retransmission is left to a transport
//! that implements it.

use super::{
    SequenceCounters, SequenceFilter, TrafficCounters, Transport, TransportEvent, TransportInfo,
    TransportType,
};
use crate::{NetworkError, Result};
use async_trait::async_trait;
use bytes::{BufMut, Bytes, BytesMut};
use orbitlink_config::NetworkSettings;
use orbitlink_types::DeliveryCategory;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::net::SocketAddr;
use tokio::net::UdpSocket;
use tracing::{debug, info, trace};

/// Transport frame length
pub const FRAME_SIZE: usize = 6;

/// Largest UDP payload over IPv4
pub const MAX_UDP_PAYLOAD: usize = 65_507;

const KIND_CONNECTED: u8 = 0;
const KIND_UNCONNECTED: u8 = 1;

/// UDP transport configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UdpConfig {
    /// Local address to bind to
    pub bind_address: SocketAddr,
    /// Connected peer; required for [`Transport::send`]
    pub remote_address: Option<SocketAddr>,
    /// Largest datagram including the transport frame
    pub max_message_size: usize,
}

impl Default for UdpConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([0, 0, 0, 0], 0)),
            remote_address: None,
            max_message_size: MAX_UDP_PAYLOAD,
        }
    }
}

impl From<&NetworkSettings> for UdpConfig {
    fn from(settings: &NetworkSettings) -> Self {
        Self {
            bind_address: settings.bind_address,
            remote_address: settings.remote_address,
            max_message_size: settings.max_datagram_size,
        }
    }
}

/// UDP transport for datagram communication
#[derive(Debug)]
pub struct UdpTransport {
    config: UdpConfig,
    socket: UdpSocket,
    sequences: SequenceCounters,
    filter: Mutex<SequenceFilter>,
    recv_buffer: Mutex<Vec<u8>>,
    counters: TrafficCounters,
}

impl UdpTransport {
    /// Bind (and connect, when a remote address is configured)
    pub async fn new(config: UdpConfig) -> Result<Self> {
        if config.max_message_size > MAX_UDP_PAYLOAD || config.max_message_size <= FRAME_SIZE {
            return Err(NetworkError::configuration(
                format!(
                    "UDP max message size must be between {} and {MAX_UDP_PAYLOAD} bytes",
                    FRAME_SIZE + 1
                ),
                Some("max_message_size"),
            ));
        }

        let socket = UdpSocket::bind(config.bind_address).await.map_err(|e| {
            NetworkError::network_with_source(
                format!("Failed to bind UDP socket on {}", config.bind_address),
                e,
            )
        })?;

        if let Some(remote) = config.remote_address {
            socket.connect(remote).await.map_err(|e| {
                NetworkError::network_with_source(
                    format!("Failed to connect UDP socket to {}", remote),
                    e,
                )
            })?;
            info!("UDP socket connected to: {}", remote);
        }

        info!("UDP transport listening on: {}", config.bind_address);

        Ok(Self {
            recv_buffer: Mutex::new(vec![0; config.max_message_size]),
            config,
            socket,
            sequences: SequenceCounters::new(),
            filter: Mutex::new(SequenceFilter::new()),
            counters: TrafficCounters::default(),
        })
    }

    pub async fn from_settings(settings: &NetworkSettings) -> Result<Self> {
        Self::new(UdpConfig::from(settings)).await
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.socket
            .local_addr()
            .map_err(|e| NetworkError::network_with_source("Failed to get local address", e))
    }

    fn frame(&self, kind: u8, category: DeliveryCategory, payload: &[u8]) -> Result<BytesMut> {
        let total = FRAME_SIZE + payload.len();
        if total > self.config.max_message_size {
            return Err(NetworkError::configuration(
                format!(
                    "Message size {} exceeds maximum {}",
                    total, self.config.max_message_size
                ),
                Some("max_message_size"),
            ));
        }

        let sequence = if kind == KIND_CONNECTED {
            self.sequences.next(category)
        } else {
            0
        };

        let mut frame = BytesMut::with_capacity(total);
        frame.put_u8(kind);
        frame.put_u8(category.into());
        frame.put_u32(sequence);
        frame.put_slice(payload);
        Ok(frame)
    }

    /// Strip and interpret the transport frame of one received datagram
    fn unframe(&self, from: SocketAddr, datagram: &[u8]) -> Option<TransportEvent> {
        if datagram.len() < FRAME_SIZE {
            return Some(TransportEvent::Warning(format!(
                "Datagram from {from} too short for transport frame: {} bytes",
                datagram.len()
            )));
        }

        let kind = datagram[0];
        let sequence = u32::from_be_bytes([datagram[2], datagram[3], datagram[4], datagram[5]]);
        let payload = Bytes::copy_from_slice(&datagram[FRAME_SIZE..]);

        match kind {
            KIND_CONNECTED => {
                let Ok(category) = DeliveryCategory::try_from(datagram[1]) else {
                    return Some(TransportEvent::Warning(format!(
                        "Datagram from {from} has unknown delivery category {}",
                        datagram[1]
                    )));
                };
                if !self.filter.lock().accept(from, category, sequence) {
                    self.counters.record_stale();
                    trace!(peer = %from, sequence, "Dropping stale sequenced datagram");
                    return None;
                }
                Some(TransportEvent::Data {
                    peer: from,
                    payload,
                    category,
                })
            }
            KIND_UNCONNECTED => Some(TransportEvent::UnconnectedData { from, payload }),
            other => Some(TransportEvent::Warning(format!(
                "Datagram from {from} has unknown frame kind {other}"
            ))),
        }
    }
}

#[async_trait]
impl Transport for UdpTransport {
    async fn send(&self, payload: &[u8], category: DeliveryCategory) -> Result<()> {
        if self.config.remote_address.is_none() {
            return Err(NetworkError::configuration(
                "UDP transport has no connected peer",
                Some("remote_address"),
            ));
        }

        let frame = self.frame(KIND_CONNECTED, category, payload)?;
        let bytes_sent = self
            .socket
            .send(&frame)
            .await
            .map_err(|e| NetworkError::network_with_source("Failed to send UDP packet", e))?;

        self.counters.record_send(bytes_sent);
        debug!(
            "Sent UDP packet: {} bytes (payload: {} bytes, {:?})",
            bytes_sent,
            payload.len(),
            category
        );
        Ok(())
    }

    async fn send_unconnected(&self, addr: SocketAddr, payload: &[u8]) -> Result<()> {
        let frame = self.frame(KIND_UNCONNECTED, DeliveryCategory::Unreliable, payload)?;
        let bytes_sent = self
            .socket
            .send_to(&frame, addr)
            .await
            .map_err(|e| NetworkError::network_with_source("Failed to send UDP packet", e))?;

        self.counters.record_send(bytes_sent);
        debug!("Sent UDP packet to {}: {} bytes", addr, bytes_sent);
        Ok(())
    }

    async fn try_receive(&self) -> Result<Option<TransportEvent>> {
        loop {
            let mut buffer = self.recv_buffer.lock();
            let (received, from) = match self.socket.try_recv_from(&mut buffer) {
                Ok(result) => result,
                Err(e) if e.kind() == ErrorKind::WouldBlock => return Ok(None),
                Err(e) => {
                    return Err(NetworkError::network_with_source(
                        "Failed to receive UDP packet",
                        e,
                    ))
                }
            };
            self.counters.record_receive(received);

            if let Some(event) = self.unframe(from, &buffer[..received]) {
                return Ok(Some(event));
            }
        }
    }

    fn is_healthy(&self) -> bool {
        self.socket.local_addr().is_ok()
    }

    fn transport_info(&self) -> TransportInfo {
        self.counters.info(
            TransportType::Udp,
            self.socket.local_addr().ok(),
            self.config.remote_address,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    async fn receive(transport: &UdpTransport) -> TransportEvent {
        for _ in 0..200 {
            if let Some(event) = transport.try_receive().await.unwrap() {
                return event;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("no datagram within timeout");
    }

    async fn connected_pair() -> (UdpTransport, UdpTransport) {
        let server = UdpTransport::new(UdpConfig {
            bind_address: "127.0.0.1:0".parse().unwrap(),
            ..Default::default()
        })
        .await
        .unwrap();
        let client = UdpTransport::new(UdpConfig {
            bind_address: "127.0.0.1:0".parse().unwrap(),
            remote_address: Some(server.local_addr().unwrap()),
            ..Default::default()
        })
        .await
        .unwrap();
        (server, client)
    }

    #[tokio::test]
    async fn test_udp_framing_round_trip() {
        let (server, client) = connected_pair().await;
        client
            .send(b"position", DeliveryCategory::Sequenced)
            .await
            .unwrap();

        match receive(&server).await {
            TransportEvent::Data {
                peer,
                payload,
                category,
            } => {
                assert_eq!(peer, client.local_addr().unwrap());
                assert_eq!(&payload[..], b"position");
                assert_eq!(category, DeliveryCategory::Sequenced);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(server.try_receive().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unconnected_send_to() {
        let (server, client) = connected_pair().await;
        server
            .send_unconnected(client.local_addr().unwrap(), b"server list")
            .await
            .unwrap();

        match receive(&client).await {
            TransportEvent::UnconnectedData { payload, .. } => {
                assert_eq!(&payload[..], b"server list")
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_short_datagram_reported_as_warning() {
        let (server, _client) = connected_pair().await;
        let raw = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        raw.send_to(&[1, 2, 3], server.local_addr().unwrap())
            .await
            .unwrap();

        assert!(matches!(receive(&server).await, TransportEvent::Warning(_)));
    }

    #[tokio::test]
    async fn test_send_without_peer_rejected() {
        let (server, _client) = connected_pair().await;
        let err = server
            .send(b"x", DeliveryCategory::ReliableOrdered)
            .await
            .unwrap_err();
        assert!(matches!(err, NetworkError::Configuration { .. }));
    }

    #[tokio::test]
    async fn test_oversized_config_rejected() {
        let result = UdpTransport::new(UdpConfig {
            bind_address: "127.0.0.1:0".parse().unwrap(),
            remote_address: None,
            max_message_size: 70_000,
        })
        .await;
        assert!(matches!(result, Err(NetworkError::Configuration { .. })));
    }
}

//! Transport Layer
//!
//! The contract the dispatcher and sender need from a datagram transport,
//! plus two implementations:
//!
//! - [`MemoryTransport`]: in-process pair for tests and loopback sessions
//! - [`UdpTransport`]: tokio `UdpSocket` with a small sequencing frame
//!
//! Transports are polled, never pushed: [`Transport::try_receive`] returns
//! at most one pending [`TransportEvent`] without waiting.

use crate::Result;
use async_trait::async_trait;
use bytes::Bytes;
use orbitlink_types::DeliveryCategory;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

pub mod memory;
pub mod sequencing;
pub mod udp;

pub use memory::{InboxEntry, MemoryTransport};
pub use sequencing::{is_newer, SequenceCounters, SequenceFilter};
pub use udp::{UdpConfig, UdpTransport};

/// Datagram transport used by one peer connection
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a framed message to the connected peer
    async fn send(&self, payload: &[u8], category: DeliveryCategory) -> Result<()>;

    /// Send outside the connection (server-list and introduction traffic)
    async fn send_unconnected(&self, addr: SocketAddr, payload: &[u8]) -> Result<()>;

    /// Next pending event, or `None` when nothing is waiting
    async fn try_receive(&self) -> Result<Option<TransportEvent>>;

    fn is_healthy(&self) -> bool;

    fn transport_info(&self) -> TransportInfo;
}

/// Everything a transport can report from one poll
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// Application message from the connected peer
    Data {
        peer: SocketAddr,
        payload: Bytes,
        category: DeliveryCategory,
    },
    /// Application message from outside the connection
    UnconnectedData { from: SocketAddr, payload: Bytes },
    Debug(String),
    VerboseDebug(String),
    Warning(String),
    /// Transport-level error text; the connection may still be usable
    Error(String),
    StatusChanged {
        peer: SocketAddr,
        status: ConnectionStatus,
        reason: String,
    },
    /// NAT introduction completed
    IntroductionSuccess { endpoint: SocketAddr, token: String },
    LatencyUpdated { peer: SocketAddr, latency: Duration },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectionStatus {
    Connecting,
    Connected,
    Disconnecting,
    Disconnected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransportType {
    /// In-process pair
    Memory,
    Udp,
}

/// Transport information for monitoring
#[derive(Debug, Clone)]
pub struct TransportInfo {
    pub transport_type: TransportType,
    pub local_address: Option<SocketAddr>,
    pub remote_address: Option<SocketAddr>,
    pub datagrams_sent: u64,
    pub datagrams_received: u64,
    pub bytes_sent: u64,
    pub bytes_received: u64,
    /// Sequenced datagrams discarded as stale
    pub stale_dropped: u64,
}

/// Lock-free traffic counters shared by the transport implementations
#[derive(Debug, Default)]
pub(crate) struct TrafficCounters {
    datagrams_sent: AtomicU64,
    datagrams_received: AtomicU64,
    bytes_sent: AtomicU64,
    bytes_received: AtomicU64,
    stale_dropped: AtomicU64,
}

impl TrafficCounters {
    pub(crate) fn record_send(&self, bytes: usize) {
        self.datagrams_sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_receive(&self, bytes: usize) {
        self.datagrams_received.fetch_add(1, Ordering::Relaxed);
        self.bytes_received.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_stale(&self) {
        self.stale_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn info(
        &self,
        transport_type: TransportType,
        local_address: Option<SocketAddr>,
        remote_address: Option<SocketAddr>,
    ) -> TransportInfo {
        TransportInfo {
            transport_type,
            local_address,
            remote_address,
            datagrams_sent: self.datagrams_sent.load(Ordering::Relaxed),
            datagrams_received: self.datagrams_received.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            stale_dropped: self.stale_dropped.load(Ordering::Relaxed),
        }
    }
}

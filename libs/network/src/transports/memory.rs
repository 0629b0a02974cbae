//! In-process transport pair
//!
//! Two [`MemoryTransport`] ends share a pair of inboxes. Delivery is
//! lossless and in order unless a test rearranges an inbox; the receive
//! side still applies the `Sequenced` stale filter so reordering behaves
//! the way it would on a real network.

use super::{
    ConnectionStatus, SequenceCounters, SequenceFilter, TrafficCounters, Transport,
    TransportEvent, TransportInfo, TransportType,
};
use crate::{NetworkError, Result};
use async_trait::async_trait;
use bytes::Bytes;
use orbitlink_types::DeliveryCategory;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

/// One pending item in a memory inbox
#[derive(Debug, Clone, PartialEq)]
pub enum InboxEntry {
    Datagram {
        from: SocketAddr,
        category: DeliveryCategory,
        sequence: u32,
        payload: Bytes,
    },
    Unconnected {
        from: SocketAddr,
        payload: Bytes,
    },
    Event(TransportEvent),
}

#[derive(Debug, Default)]
struct Inbox {
    entries: Mutex<VecDeque<InboxEntry>>,
    sequences: SequenceCounters,
}

impl Inbox {
    fn push(&self, entry: InboxEntry) {
        self.entries.lock().push_back(entry);
    }

    fn datagram(&self, from: SocketAddr, category: DeliveryCategory, payload: Bytes) {
        let sequence = self.sequences.next(category);
        self.push(InboxEntry::Datagram {
            from,
            category,
            sequence,
            payload,
        });
    }
}

/// One end of an in-process connection
#[derive(Debug)]
pub struct MemoryTransport {
    local: SocketAddr,
    peer: SocketAddr,
    inbox: Arc<Inbox>,
    peer_inbox: Arc<Inbox>,
    connected: Arc<AtomicBool>,
    filter: Mutex<SequenceFilter>,
    counters: TrafficCounters,
}

impl MemoryTransport {
    /// Connected pair on synthetic loopback addresses
    pub fn pair() -> (Self, Self) {
        Self::pair_with_addresses(
            SocketAddr::from(([127, 0, 0, 1], 6701)),
            SocketAddr::from(([127, 0, 0, 1], 6702)),
        )
    }

    pub fn pair_with_addresses(a: SocketAddr, b: SocketAddr) -> (Self, Self) {
        let a_inbox = Arc::new(Inbox::default());
        let b_inbox = Arc::new(Inbox::default());
        let connected = Arc::new(AtomicBool::new(true));

        let a_end = Self {
            local: a,
            peer: b,
            inbox: a_inbox.clone(),
            peer_inbox: b_inbox.clone(),
            connected: connected.clone(),
            filter: Mutex::new(SequenceFilter::new()),
            counters: TrafficCounters::default(),
        };
        let b_end = Self {
            local: b,
            peer: a,
            inbox: b_inbox,
            peer_inbox: a_inbox,
            connected,
            filter: Mutex::new(SequenceFilter::new()),
            counters: TrafficCounters::default(),
        };
        (a_end, b_end)
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Close both ends
    ///
    /// Each side sees a `Disconnected` status event; once its inbox is
    /// drained, further receives fail with a connection error.
    pub fn disconnect(&self, reason: &str) {
        if !self.connected.swap(false, Ordering::AcqRel) {
            return;
        }
        for (inbox, peer) in [(&self.inbox, self.peer), (&self.peer_inbox, self.local)] {
            inbox.push(InboxEntry::Event(TransportEvent::StatusChanged {
                peer,
                status: ConnectionStatus::Disconnected,
                reason: reason.to_string(),
            }));
        }
        debug!(local = %self.local, peer = %self.peer, reason, "Memory transport disconnected");
    }

    /// Queue raw bytes as if the peer had sent them with `category`
    pub fn inject_raw(&self, category: DeliveryCategory, bytes: impl Into<Bytes>) {
        self.inbox.datagram(self.peer, category, bytes.into());
    }

    /// Queue a control event for the next receive
    pub fn inject_event(&self, event: TransportEvent) {
        self.inbox.push(InboxEntry::Event(event));
    }

    /// Rearrange everything not yet received
    pub fn reorder_inbox(&self, reorder: impl FnOnce(&mut VecDeque<InboxEntry>)) {
        reorder(&mut self.inbox.entries.lock());
    }

    pub fn pending(&self) -> usize {
        self.inbox.entries.lock().len()
    }

    fn ensure_connected(&self) -> Result<()> {
        if self.connected.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(NetworkError::connection(
                "memory transport closed",
                Some(self.peer),
            ))
        }
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn send(&self, payload: &[u8], category: DeliveryCategory) -> Result<()> {
        self.ensure_connected()?;
        self.peer_inbox
            .datagram(self.local, category, Bytes::copy_from_slice(payload));
        self.counters.record_send(payload.len());
        Ok(())
    }

    async fn send_unconnected(&self, addr: SocketAddr, payload: &[u8]) -> Result<()> {
        if addr != self.peer {
            return Err(NetworkError::connection(
                "memory transport only reaches its paired end",
                Some(addr),
            ));
        }
        self.peer_inbox.push(InboxEntry::Unconnected {
            from: self.local,
            payload: Bytes::copy_from_slice(payload),
        });
        self.counters.record_send(payload.len());
        Ok(())
    }

    async fn try_receive(&self) -> Result<Option<TransportEvent>> {
        loop {
            let Some(entry) = self.inbox.entries.lock().pop_front() else {
                return self.ensure_connected().map(|_| None);
            };

            match entry {
                InboxEntry::Datagram {
                    from,
                    category,
                    sequence,
                    payload,
                } => {
                    if !self.filter.lock().accept(from, category, sequence) {
                        self.counters.record_stale();
                        debug!(peer = %from, sequence, "Dropping stale sequenced datagram");
                        continue;
                    }
                    self.counters.record_receive(payload.len());
                    return Ok(Some(TransportEvent::Data {
                        peer: from,
                        payload,
                        category,
                    }));
                }
                InboxEntry::Unconnected { from, payload } => {
                    self.counters.record_receive(payload.len());
                    return Ok(Some(TransportEvent::UnconnectedData { from, payload }));
                }
                InboxEntry::Event(event) => {
                    if let TransportEvent::StatusChanged {
                        peer,
                        status: ConnectionStatus::Disconnected,
                        ..
                    } = &event
                    {
                        self.filter.lock().forget(*peer);
                    }
                    return Ok(Some(event));
                }
            }
        }
    }

    fn is_healthy(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    fn transport_info(&self) -> TransportInfo {
        self.counters
            .info(TransportType::Memory, Some(self.local), Some(self.peer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data_payload(event: Option<TransportEvent>) -> Bytes {
        match event {
            Some(TransportEvent::Data { payload, .. }) => payload,
            other => panic!("expected data, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_pair_delivers_in_order() {
        let (a, b) = MemoryTransport::pair();
        a.send(b"one", DeliveryCategory::ReliableOrdered).await.unwrap();
        a.send(b"two", DeliveryCategory::ReliableOrdered).await.unwrap();

        assert_eq!(&data_payload(b.try_receive().await.unwrap())[..], b"one");
        assert_eq!(&data_payload(b.try_receive().await.unwrap())[..], b"two");
        assert!(b.try_receive().await.unwrap().is_none());

        let info = a.transport_info();
        assert_eq!(info.datagrams_sent, 2);
        assert_eq!(info.bytes_sent, 6);
    }

    #[tokio::test]
    async fn test_reordered_sequenced_is_dropped() {
        let (a, b) = MemoryTransport::pair();
        a.send(b"old", DeliveryCategory::Sequenced).await.unwrap();
        a.send(b"new", DeliveryCategory::Sequenced).await.unwrap();
        b.reorder_inbox(|inbox| inbox.make_contiguous().reverse());

        assert_eq!(&data_payload(b.try_receive().await.unwrap())[..], b"new");
        assert!(b.try_receive().await.unwrap().is_none());
        assert_eq!(b.transport_info().stale_dropped, 1);
    }

    #[tokio::test]
    async fn test_reordered_reliable_is_kept() {
        let (a, b) = MemoryTransport::pair();
        a.send(b"first", DeliveryCategory::ReliableUnordered).await.unwrap();
        a.send(b"second", DeliveryCategory::ReliableUnordered).await.unwrap();
        b.reorder_inbox(|inbox| inbox.make_contiguous().reverse());

        assert_eq!(&data_payload(b.try_receive().await.unwrap())[..], b"second");
        assert_eq!(&data_payload(b.try_receive().await.unwrap())[..], b"first");
    }

    #[tokio::test]
    async fn test_unconnected_and_events() {
        let (a, b) = MemoryTransport::pair();
        a.send_unconnected(b.local_addr(), b"ping").await.unwrap();
        assert!(a
            .send_unconnected("10.0.0.1:1".parse().unwrap(), b"x")
            .await
            .is_err());

        b.inject_event(TransportEvent::Warning("slow".into()));
        match b.try_receive().await.unwrap() {
            Some(TransportEvent::UnconnectedData { from, payload }) => {
                assert_eq!(from, a.local_addr());
                assert_eq!(&payload[..], b"ping");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(
            b.try_receive().await.unwrap(),
            Some(TransportEvent::Warning("slow".into()))
        );
    }

    #[tokio::test]
    async fn test_disconnect_reports_then_fails() {
        let (a, b) = MemoryTransport::pair();
        a.disconnect("test over");

        assert!(a.send(b"late", DeliveryCategory::Unreliable).await.is_err());
        assert!(matches!(
            b.try_receive().await.unwrap(),
            Some(TransportEvent::StatusChanged {
                status: ConnectionStatus::Disconnected,
                ..
            })
        ));
        assert!(matches!(
            b.try_receive().await,
            Err(NetworkError::Connection { .. })
        ));
        assert!(!b.is_healthy());
    }
}

//! # Inbound Dispatcher
//!
//! ## Purpose
//!
//! The per-connection receive loop. Polls the transport, decodes each
//! application datagram through the [`CodecPipeline`] and hands the
//! envelope to the one sink the [`RoutingTable`] names for it.
//!
//! ## Failure Handling
//!
//! A bad message never stops the loop:
//!
//! | failure              | log level | counter      |
//! |----------------------|-----------|--------------|
//! | malformed header     | `warn`    | `malformed`  |
//! | unknown message type | `error`   | `unknown`    |
//! | unknown subtype      | `error`   | `unknown`    |
//! | corrupt payload      | `warn`    | `corrupt`    |
//! | no route             | `error`   | `unrouted`   |
//!
//! A transport failure is different: it is reported to the owner as
//! [`ControlEvent::TransportFailed`] and ends the loop with the error.

use crate::queue::MessageSink;
use crate::routing::RoutingTable;
use crate::shutdown::RunFlag;
use crate::transports::{ConnectionStatus, Transport, TransportEvent};
use crate::Result;
use bytes::Bytes;
use crossbeam_channel::Sender;
use orbitlink_codec::{CodecError, CodecPipeline};
use orbitlink_types::DeliveryCategory;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

/// Connection-level notifications forwarded to the session owner
#[derive(Debug, Clone, PartialEq)]
pub enum ControlEvent {
    StatusChanged {
        peer: SocketAddr,
        status: ConnectionStatus,
        reason: String,
    },
    IntroductionSuccess {
        endpoint: SocketAddr,
        token: String,
    },
    /// The transport failed and the receive loop has exited
    TransportFailed { message: String },
}

/// Receive-side counters
#[derive(Debug, Default)]
pub struct ReceiveStats {
    received: AtomicU64,
    dispatched: AtomicU64,
    malformed: AtomicU64,
    unknown: AtomicU64,
    corrupt: AtomicU64,
    unrouted: AtomicU64,
    unconnected: AtomicU64,
    latency_us: AtomicU64,
}

/// Point-in-time copy of [`ReceiveStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReceiveStatsSnapshot {
    pub received: u64,
    pub dispatched: u64,
    pub malformed: u64,
    pub unknown: u64,
    pub corrupt: u64,
    pub unrouted: u64,
    pub unconnected: u64,
}

impl ReceiveStatsSnapshot {
    pub fn dropped(&self) -> u64 {
        self.malformed + self.unknown + self.corrupt + self.unrouted
    }
}

impl ReceiveStats {
    pub fn snapshot(&self) -> ReceiveStatsSnapshot {
        ReceiveStatsSnapshot {
            received: self.received.load(Ordering::Relaxed),
            dispatched: self.dispatched.load(Ordering::Relaxed),
            malformed: self.malformed.load(Ordering::Relaxed),
            unknown: self.unknown.load(Ordering::Relaxed),
            corrupt: self.corrupt.load(Ordering::Relaxed),
            unrouted: self.unrouted.load(Ordering::Relaxed),
            unconnected: self.unconnected.load(Ordering::Relaxed),
        }
    }

    /// Last round-trip estimate reported by the transport
    pub fn latency(&self) -> Option<Duration> {
        match self.latency_us.load(Ordering::Relaxed) {
            0 => None,
            us => Some(Duration::from_micros(us)),
        }
    }

    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Receive loop for one transport
pub struct Dispatcher {
    transport: Arc<dyn Transport>,
    pipeline: Arc<CodecPipeline>,
    routes: Arc<RoutingTable>,
    running: RunFlag,
    receive_interval: Duration,
    stats: Arc<ReceiveStats>,
    control: Option<Sender<ControlEvent>>,
    discovery: Option<Arc<dyn MessageSink>>,
}

impl Dispatcher {
    pub fn new(
        transport: Arc<dyn Transport>,
        pipeline: Arc<CodecPipeline>,
        routes: Arc<RoutingTable>,
        running: RunFlag,
    ) -> Self {
        Self {
            transport,
            pipeline,
            routes,
            running,
            receive_interval: Duration::from_millis(1),
            stats: Arc::new(ReceiveStats::default()),
            control: None,
            discovery: None,
        }
    }

    /// Sleep between polls that find nothing pending
    pub fn with_receive_interval(mut self, interval: Duration) -> Self {
        self.receive_interval = interval;
        self
    }

    pub fn with_control_channel(mut self, control: Sender<ControlEvent>) -> Self {
        self.control = Some(control);
        self
    }

    /// Sink for decoded unconnected traffic (server-list replies)
    pub fn with_discovery_sink(mut self, sink: Arc<dyn MessageSink>) -> Self {
        self.discovery = Some(sink);
        self
    }

    pub fn stats(&self) -> Arc<ReceiveStats> {
        self.stats.clone()
    }

    /// Run until the flag clears or the transport fails
    pub async fn run(self) -> Result<()> {
        info!(
            transport = ?self.transport.transport_info().transport_type,
            "Dispatcher started"
        );

        while self.running.is_running() {
            match self.pump_once().await {
                Ok(true) => {}
                Ok(false) => tokio::time::sleep(self.receive_interval).await,
                Err(e) => {
                    error!(error = %e, "Transport receive failed; stopping dispatcher");
                    self.notify(ControlEvent::TransportFailed {
                        message: e.to_string(),
                    });
                    return Err(e);
                }
            }
        }

        info!(stats = ?self.stats.snapshot(), "Dispatcher stopped");
        Ok(())
    }

    pub fn spawn(self) -> JoinHandle<Result<()>> {
        tokio::spawn(self.run())
    }

    /// Process at most one transport event
    ///
    /// Returns `Ok(false)` when nothing was pending. Only transport
    /// failures are returned as errors.
    pub async fn pump_once(&self) -> Result<bool> {
        let Some(event) = self.transport.try_receive().await? else {
            return Ok(false);
        };
        self.handle_event(event);
        Ok(true)
    }

    fn handle_event(&self, event: TransportEvent) {
        match event {
            TransportEvent::Data {
                peer,
                payload,
                category,
            } => self.handle_data(peer, payload, category),
            TransportEvent::UnconnectedData { from, payload } => {
                self.handle_unconnected(from, payload)
            }
            TransportEvent::Debug(text) => debug!("Transport: {}", text),
            TransportEvent::VerboseDebug(text) => trace!("Transport: {}", text),
            TransportEvent::Warning(text) => warn!("Transport: {}", text),
            TransportEvent::Error(text) => error!("Transport: {}", text),
            TransportEvent::LatencyUpdated { peer, latency } => {
                trace!(%peer, ?latency, "Latency updated");
                self.stats
                    .latency_us
                    .store(latency.as_micros().max(1) as u64, Ordering::Relaxed);
            }
            TransportEvent::StatusChanged {
                peer,
                status,
                reason,
            } => {
                info!(%peer, ?status, %reason, "Connection status changed");
                self.notify(ControlEvent::StatusChanged {
                    peer,
                    status,
                    reason,
                });
            }
            TransportEvent::IntroductionSuccess { endpoint, token } => {
                info!(%endpoint, "NAT introduction succeeded");
                self.notify(ControlEvent::IntroductionSuccess { endpoint, token });
            }
        }
    }

    fn handle_data(&self, peer: SocketAddr, payload: Bytes, category: DeliveryCategory) {
        ReceiveStats::bump(&self.stats.received);

        let envelope = match self.pipeline.decode_datagram(&payload) {
            Ok(envelope) => envelope,
            Err(e) => return self.drop_unit(peer, &e),
        };

        if envelope.version_mismatch() {
            debug!(
                %peer,
                sender = %envelope.sender_version(),
                local = %self.pipeline.local_version(),
                "Message from peer running a different protocol version"
            );
        }

        trace!(
            %peer,
            message_type = %envelope.message_type(),
            sub_type = envelope.sub_type(),
            ?category,
            "Dispatching message"
        );

        match self.routes.route(envelope) {
            Ok(_) => ReceiveStats::bump(&self.stats.dispatched),
            Err(e) => {
                ReceiveStats::bump(&self.stats.unrouted);
                error!(%peer, error = %e, "Dropping unroutable message");
            }
        }
    }

    fn handle_unconnected(&self, from: SocketAddr, payload: Bytes) {
        ReceiveStats::bump(&self.stats.unconnected);

        let Some(sink) = &self.discovery else {
            debug!(%from, bytes = payload.len(), "Ignoring unconnected datagram");
            return;
        };

        match self.pipeline.decode_datagram(&payload) {
            Ok(envelope) => sink.enqueue_message(envelope),
            Err(e) => self.drop_unit(from, &e),
        }
    }

    fn drop_unit(&self, peer: SocketAddr, error: &CodecError) {
        match error {
            CodecError::MalformedHeader { .. } => {
                ReceiveStats::bump(&self.stats.malformed);
                warn!(%peer, error = %error, "Dropping malformed message");
            }
            CodecError::UnknownMessageType { .. } => {
                ReceiveStats::bump(&self.stats.unknown);
                error!(%peer, error = %error, "Dropping message of unknown type");
            }
            CodecError::UnknownSubType { .. } => {
                ReceiveStats::bump(&self.stats.unknown);
                error!(%peer, error = %error, "Dropping message of unknown subtype");
            }
            _ => {
                ReceiveStats::bump(&self.stats.corrupt);
                warn!(%peer, error = %error, "Dropping undecodable message");
            }
        }
    }

    fn notify(&self, event: ControlEvent) {
        if let Some(control) = &self.control {
            if control.send(event).is_err() {
                debug!("Control channel closed; event dropped");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::InboundQueue;
    use crate::transports::MemoryTransport;
    use orbitlink_codec::{Envelope, PayloadRegistry};
    use orbitlink_types::payload::chat::ChatChannelMessage;
    use orbitlink_types::payload::master_server::MasterServerReplyServers;
    use orbitlink_types::MessageType;

    struct Fixture {
        client: Arc<MemoryTransport>,
        dispatcher: Dispatcher,
        chat: Arc<InboundQueue>,
        pipeline: Arc<CodecPipeline>,
    }

    fn fixture() -> Fixture {
        let (client, server) = MemoryTransport::pair();
        let pipeline = Arc::new(CodecPipeline::new(Arc::new(
            PayloadRegistry::complete().unwrap(),
        )));
        let chat = Arc::new(InboundQueue::new("chat"));
        let routes = RoutingTable::builder()
            .route(MessageType::Chat, chat.clone())
            .build()
            .unwrap();
        let dispatcher = Dispatcher::new(
            Arc::new(server),
            pipeline.clone(),
            Arc::new(routes),
            RunFlag::new(),
        );
        Fixture {
            client: Arc::new(client),
            dispatcher,
            chat,
            pipeline,
        }
    }

    #[tokio::test]
    async fn test_pump_routes_chat() {
        let f = fixture();
        let env = f
            .pipeline
            .envelope::<ChatChannelMessage>(|m| m.text = "hi".into())
            .unwrap();
        let bytes = f.pipeline.serialize(&env, false).unwrap();
        f.client
            .send(&bytes, DeliveryCategory::ReliableOrdered)
            .await
            .unwrap();

        assert!(f.dispatcher.pump_once().await.unwrap());
        assert!(!f.dispatcher.pump_once().await.unwrap());
        assert_eq!(f.chat.len(), 1);
        assert_eq!(f.dispatcher.stats().snapshot().dispatched, 1);
    }

    #[tokio::test]
    async fn test_unrouted_is_counted() {
        let f = fixture();
        let bytes = f
            .pipeline
            .serialize(&Envelope::detached(MasterServerReplyServers::default()), false)
            .unwrap();
        f.client
            .send(&bytes, DeliveryCategory::ReliableOrdered)
            .await
            .unwrap();

        assert!(f.dispatcher.pump_once().await.unwrap());
        let stats = f.dispatcher.stats().snapshot();
        assert_eq!(stats.unrouted, 1);
        assert_eq!(stats.dropped(), 1);
    }

    #[tokio::test]
    async fn test_control_events_forwarded() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let f = fixture();
        let dispatcher = f.dispatcher.with_control_channel(tx);
        let peer = f.client.local_addr();

        f.client.disconnect("kicked");
        // The server end sees the status event first, then the closed transport
        let server_side = dispatcher.pump_once().await;
        assert!(server_side.unwrap());
        assert_eq!(
            rx.try_recv().unwrap(),
            ControlEvent::StatusChanged {
                peer,
                status: ConnectionStatus::Disconnected,
                reason: "kicked".into(),
            }
        );
        assert!(dispatcher.pump_once().await.is_err());
    }

    #[tokio::test]
    async fn test_latency_recorded() {
        let (client, server) = MemoryTransport::pair();
        let server = Arc::new(server);
        let f = fixture();
        let dispatcher = Dispatcher::new(
            server.clone(),
            f.pipeline.clone(),
            Arc::new(RoutingTable::builder().build().unwrap()),
            RunFlag::new(),
        );
        server.inject_event(TransportEvent::LatencyUpdated {
            peer: client.local_addr(),
            latency: Duration::from_millis(40),
        });

        assert!(dispatcher.pump_once().await.unwrap());
        assert_eq!(dispatcher.stats().latency(), Some(Duration::from_millis(40)));
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<parking_lot::Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_unknown_subtype_logged_as_error() {
        let f = fixture();
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_max_level(tracing::Level::TRACE)
            .with_writer(move || writer.clone())
            .finish();

        let err = CodecError::UnknownSubType {
            message_type: MessageType::Chat,
            sub_type: 200,
        };
        tracing::subscriber::with_default(subscriber, || {
            f.dispatcher.drop_unit(f.client.local_addr(), &err)
        });

        let output = String::from_utf8(logs.0.lock().clone()).unwrap();
        assert!(output.contains("ERROR"), "{output}");
        assert!(output.contains("unknown subtype"), "{output}");
        assert_eq!(f.dispatcher.stats().snapshot().unknown, 1);
    }
}

//! Outbound sender
//!
//! Serialization happens on the caller, so encoding failures surface as a
//! failed `send`. The encoded bytes then go onto an unbounded channel
//! drained by one background task that owns the transport writes; callers
//! never wait on the network.
//!
//! The task ends when every handle is dropped or when the [`RunFlag`] it
//! was started with is cleared. On a stop it writes whatever was already
//! queued, then exits; later sends fail with [`NetworkError::SenderClosed`].

use crate::shutdown::RunFlag;
use crate::transports::Transport;
use crate::{NetworkError, Result};
use orbitlink_codec::{CodecPipeline, Envelope};
use orbitlink_config::NetworkSettings;
use orbitlink_types::DeliveryCategory;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

enum Outbound {
    Connected {
        bytes: Vec<u8>,
        category: DeliveryCategory,
    },
    Unconnected {
        addr: SocketAddr,
        bytes: Vec<u8>,
    },
}

/// Send-side counters
#[derive(Debug, Default)]
pub struct SendStats {
    queued: AtomicU64,
    sent: AtomicU64,
    failed: AtomicU64,
    bytes_sent: AtomicU64,
}

impl SendStats {
    pub fn queued(&self) -> u64 {
        self.queued.load(Ordering::Relaxed)
    }

    pub fn sent(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent.load(Ordering::Relaxed)
    }

    /// Queued but not yet attempted
    pub fn in_flight(&self) -> u64 {
        self.queued().saturating_sub(self.sent() + self.failed())
    }
}

/// Handle for queueing outbound messages
///
/// Cheap to clone; every clone shares one queue and one background task.
#[derive(Clone)]
pub struct OutboundSender {
    tx: UnboundedSender<Outbound>,
    pipeline: Arc<CodecPipeline>,
    compress: bool,
    stats: Arc<SendStats>,
    running: RunFlag,
}

impl OutboundSender {
    /// Spawn the sender task; must be called inside a tokio runtime
    pub fn start(
        transport: Arc<dyn Transport>,
        pipeline: Arc<CodecPipeline>,
        settings: &NetworkSettings,
    ) -> (Self, JoinHandle<()>) {
        Self::start_with_flag(transport, pipeline, settings, RunFlag::new())
    }

    /// As [`start`](Self::start), stopping when `running` is cleared even
    /// if handles are still alive
    pub fn start_with_flag(
        transport: Arc<dyn Transport>,
        pipeline: Arc<CodecPipeline>,
        settings: &NetworkSettings,
        running: RunFlag,
    ) -> (Self, JoinHandle<()>) {
        let (tx, rx) = unbounded_channel();
        let stats = Arc::new(SendStats::default());
        let task = tokio::spawn(drain_outbound(
            transport,
            rx,
            stats.clone(),
            running.clone(),
        ));

        let sender = Self {
            tx,
            pipeline,
            compress: settings.compress_outbound,
            stats,
            running,
        };
        (sender, task)
    }

    /// Send with the category the payload asks for
    pub fn send(&self, envelope: Envelope) -> Result<()> {
        let category = envelope.delivery_category();
        self.send_with_category(envelope, category)
    }

    pub fn send_with_category(&self, envelope: Envelope, category: DeliveryCategory) -> Result<()> {
        let bytes = self.encode(envelope)?;
        self.enqueue(Outbound::Connected { bytes, category })
    }

    /// Send outside the connection (server-list traffic)
    pub fn send_unconnected(&self, envelope: Envelope, addr: SocketAddr) -> Result<()> {
        let bytes = self.encode(envelope)?;
        self.enqueue(Outbound::Unconnected { addr, bytes })
    }

    pub fn stats(&self) -> Arc<SendStats> {
        self.stats.clone()
    }

    pub fn is_closed(&self) -> bool {
        !self.running.is_running() || self.tx.is_closed()
    }

    fn encode(&self, envelope: Envelope) -> Result<Vec<u8>> {
        if self.is_closed() {
            envelope.recycle();
            return Err(NetworkError::SenderClosed);
        }
        let bytes = self.pipeline.serialize(&envelope, self.compress)?;
        trace!(
            message_type = %envelope.message_type(),
            sub_type = envelope.sub_type(),
            bytes = bytes.len(),
            "Encoded outbound message"
        );
        envelope.recycle();
        Ok(bytes)
    }

    fn enqueue(&self, item: Outbound) -> Result<()> {
        self.tx.send(item).map_err(|_| NetworkError::SenderClosed)?;
        self.stats.queued.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

async fn drain_outbound(
    transport: Arc<dyn Transport>,
    mut rx: UnboundedReceiver<Outbound>,
    stats: Arc<SendStats>,
    running: RunFlag,
) {
    loop {
        tokio::select! {
            item = rx.recv() => match item {
                Some(item) => write_one(transport.as_ref(), item, &stats).await,
                None => break,
            },
            _ = running.stopped() => {
                rx.close();
                let mut flushed = 0usize;
                while let Ok(item) = rx.try_recv() {
                    write_one(transport.as_ref(), item, &stats).await;
                    flushed += 1;
                }
                debug!(flushed, "Outbound sender stopped");
                break;
            }
        }
    }
    debug!(
        sent = stats.sent(),
        failed = stats.failed(),
        "Outbound sender drained"
    );
}

async fn write_one(transport: &dyn Transport, item: Outbound, stats: &SendStats) {
    let (result, len) = match &item {
        Outbound::Connected { bytes, category } => {
            (transport.send(bytes, *category).await, bytes.len())
        }
        Outbound::Unconnected { addr, bytes } => {
            (transport.send_unconnected(*addr, bytes).await, bytes.len())
        }
    };

    match result {
        Ok(()) => {
            stats.sent.fetch_add(1, Ordering::Relaxed);
            stats.bytes_sent.fetch_add(len as u64, Ordering::Relaxed);
        }
        Err(e) => {
            stats.failed.fetch_add(1, Ordering::Relaxed);
            warn!(error = %e, "Transport send failed; message dropped");
        }
    }
}

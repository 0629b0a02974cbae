//! Peer session
//!
//! Wires a [`Dispatcher`] and an [`OutboundSender`] around one transport
//! with a shared [`RunFlag`], and tears both down together.

use crate::dispatcher::{ControlEvent, Dispatcher, ReceiveStats};
use crate::queue::MessageSink;
use crate::routing::RoutingTable;
use crate::sender::{OutboundSender, SendStats};
use crate::shutdown::RunFlag;
use crate::transports::Transport;
use crate::{NetworkError, Result};
use crossbeam_channel::Receiver;
use orbitlink_codec::{CodecPipeline, CompressionEngine, MessagePool, PayloadRegistry};
use orbitlink_config::NetworkSettings;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

/// Codec pipeline sized by the protocol section of `settings`
pub fn build_pipeline(registry: Arc<PayloadRegistry>, settings: &NetworkSettings) -> CodecPipeline {
    let pool = MessagePool::with_capacity(&registry, settings.protocol.pool_prewarm_per_shape);
    CodecPipeline::with_pool(registry, pool).with_compression(CompressionEngine::new(
        settings.protocol.max_decompressed_size,
    ))
}

/// One running connection: receive loop plus outbound sender
pub struct PeerSession {
    running: RunFlag,
    sender: OutboundSender,
    dispatcher: JoinHandle<Result<()>>,
    sender_task: JoinHandle<()>,
    receive_stats: Arc<ReceiveStats>,
    control: Receiver<ControlEvent>,
}

impl PeerSession {
    /// Start both loops; must be called inside a tokio runtime
    pub fn start(
        transport: Arc<dyn Transport>,
        pipeline: Arc<CodecPipeline>,
        routes: Arc<RoutingTable>,
        settings: &NetworkSettings,
    ) -> Self {
        Self::start_with_discovery(transport, pipeline, routes, settings, None)
    }

    /// As [`start`](Self::start), also delivering decoded unconnected
    /// traffic to `discovery`
    pub fn start_with_discovery(
        transport: Arc<dyn Transport>,
        pipeline: Arc<CodecPipeline>,
        routes: Arc<RoutingTable>,
        settings: &NetworkSettings,
        discovery: Option<Arc<dyn MessageSink>>,
    ) -> Self {
        let running = RunFlag::new();
        let (control_tx, control) = crossbeam_channel::unbounded();

        let mut dispatcher = Dispatcher::new(
            transport.clone(),
            pipeline.clone(),
            routes,
            running.clone(),
        )
        .with_receive_interval(settings.receive_interval())
        .with_control_channel(control_tx);
        if let Some(sink) = discovery {
            dispatcher = dispatcher.with_discovery_sink(sink);
        }
        let receive_stats = dispatcher.stats();

        let (sender, sender_task) =
            OutboundSender::start_with_flag(transport, pipeline, settings, running.clone());

        info!(
            receive_interval_ms = settings.receive_interval_ms,
            compress = settings.compress_outbound,
            "Peer session started"
        );

        Self {
            running,
            sender,
            dispatcher: dispatcher.spawn(),
            sender_task,
            receive_stats,
            control,
        }
    }

    pub fn sender(&self) -> &OutboundSender {
        &self.sender
    }

    /// Flag shared with the receive loop; subsystem consumers may watch it
    pub fn running(&self) -> RunFlag {
        self.running.clone()
    }

    pub fn control_events(&self) -> &Receiver<ControlEvent> {
        &self.control
    }

    pub fn receive_stats(&self) -> Arc<ReceiveStats> {
        self.receive_stats.clone()
    }

    pub fn send_stats(&self) -> Arc<SendStats> {
        self.sender.stats()
    }

    /// Stop the receive loop, flush queued sends and wait for both tasks
    ///
    /// Sender clones held elsewhere do not keep the session alive; once this
    /// is called their sends fail with [`NetworkError::SenderClosed`].
    /// Returns the receive loop's error if the transport had failed.
    pub async fn shutdown(self) -> Result<()> {
        self.running.stop();
        let received = self
            .dispatcher
            .await
            .map_err(|e| NetworkError::network_with_source("Dispatcher task panicked", e))?;

        drop(self.sender);
        self.sender_task
            .await
            .map_err(|e| NetworkError::network_with_source("Sender task panicked", e))?;

        info!(stats = ?self.receive_stats.snapshot(), "Peer session stopped");
        received
    }
}

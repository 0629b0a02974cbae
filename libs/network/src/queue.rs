//! Subsystem inbound queues
//!
//! The dispatcher hands each decoded envelope to exactly one
//! [`MessageSink`]. [`InboundQueue`] is the standard sink: an unbounded
//! crossbeam channel that the owning subsystem drains on its own thread.

use crate::shutdown::RunFlag;
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use orbitlink_codec::Envelope;
use std::time::Duration;
use tracing::{debug, warn};

/// Destination for decoded inbound messages
pub trait MessageSink: Send + Sync {
    /// Take ownership of `envelope`; must not block the caller
    fn enqueue_message(&self, envelope: Envelope);

    /// Short label used in logs
    fn name(&self) -> &str;
}

/// FIFO queue feeding one subsystem
#[derive(Debug)]
pub struct InboundQueue {
    name: String,
    tx: Sender<Envelope>,
    rx: Receiver<Envelope>,
}

impl InboundQueue {
    pub fn new(name: impl Into<String>) -> Self {
        let (tx, rx) = unbounded();
        Self {
            name: name.into(),
            tx,
            rx,
        }
    }

    pub fn try_dequeue(&self) -> Option<Envelope> {
        self.rx.try_recv().ok()
    }

    /// Hand every queued envelope to `handler`; returns how many were handled
    pub fn drain(&self, mut handler: impl FnMut(Envelope)) -> usize {
        let mut handled = 0;
        while let Some(envelope) = self.try_dequeue() {
            handler(envelope);
            handled += 1;
        }
        handled
    }

    /// Consumer loop for a dedicated thread
    ///
    /// Blocks up to `poll` waiting for the next envelope, re-checking
    /// `running` in between. Envelopes still queued when the flag clears are
    /// left in place.
    pub fn run_until_stopped(
        &self,
        running: &RunFlag,
        poll: Duration,
        mut handler: impl FnMut(Envelope),
    ) -> usize {
        let mut handled = 0;
        while running.is_running() {
            match self.rx.recv_timeout(poll) {
                Ok(envelope) => {
                    handler(envelope);
                    handled += 1;
                }
                Err(RecvTimeoutError::Timeout) => {}
                // Unreachable while `self` holds a sender
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        debug!(queue = %self.name, handled, "Consumer loop stopped");
        handled
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

impl MessageSink for InboundQueue {
    fn enqueue_message(&self, envelope: Envelope) {
        if let Err(rejected) = self.tx.send(envelope) {
            warn!(queue = %self.name, "Inbound queue closed; dropping message");
            rejected.into_inner().recycle();
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

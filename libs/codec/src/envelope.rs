//! Message envelope
//!
//! Binds a pooled payload to its message identity, the sender's protocol
//! version and timing metadata. An envelope has exactly one owner at a time:
//! the producing subsystem until it is handed to the sender, or the
//! dispatcher until it is handed to a subsystem queue.

use crate::pool::PooledPayload;
use orbitlink_types::{DeliveryCategory, MessageType, Payload, PayloadShape, ProtocolVersion};
use std::time::{SystemTime, UNIX_EPOCH};

/// Wall-clock nanoseconds since the Unix epoch
pub fn current_timestamp_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos() as u64)
        .unwrap_or(0)
}

#[derive(Debug)]
pub struct Envelope {
    payload: PooledPayload,
    sender_version: ProtocolVersion,
    version_mismatch: bool,
    sent_at_ns: u64,
    received_at_ns: Option<u64>,
}

impl Envelope {
    /// Outbound envelope stamped with the local version
    pub fn new(payload: PooledPayload) -> Self {
        Self {
            payload,
            sender_version: ProtocolVersion::CURRENT,
            version_mismatch: false,
            sent_at_ns: current_timestamp_ns(),
            received_at_ns: None,
        }
    }

    /// Outbound envelope around a payload that did not come from a pool
    pub fn detached(payload: impl Into<Payload>) -> Self {
        Self::new(PooledPayload::detached(payload.into()))
    }

    pub(crate) fn received(
        payload: PooledPayload,
        sender_version: ProtocolVersion,
        local_version: ProtocolVersion,
        sent_at_ns: u64,
    ) -> Self {
        Self {
            payload,
            sender_version,
            version_mismatch: local_version.mismatches(&sender_version),
            sent_at_ns,
            received_at_ns: Some(current_timestamp_ns()),
        }
    }

    pub fn message_type(&self) -> MessageType {
        self.payload.message_type()
    }

    pub fn sub_type(&self) -> u16 {
        self.payload.sub_type()
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn payload_mut(&mut self) -> &mut Payload {
        &mut self.payload
    }

    pub fn get<T: PayloadShape>(&self) -> Option<&T> {
        self.payload.get::<T>()
    }

    pub fn get_mut<T: PayloadShape>(&mut self) -> Option<&mut T> {
        self.payload.get_mut::<T>()
    }

    /// Category the payload asks for; senders may override it
    pub fn delivery_category(&self) -> DeliveryCategory {
        self.payload.delivery_category()
    }

    /// True when the sender ran a different protocol version
    ///
    /// Informational: the message decoded successfully and the consuming
    /// subsystem decides what to do about the skew.
    pub fn version_mismatch(&self) -> bool {
        self.version_mismatch
    }

    pub fn sender_version(&self) -> ProtocolVersion {
        self.sender_version
    }

    pub fn sent_at_ns(&self) -> u64 {
        self.sent_at_ns
    }

    pub fn received_at_ns(&self) -> Option<u64> {
        self.received_at_ns
    }

    /// Return the payload to its pool
    ///
    /// Dropping the envelope does the same; this names the intent at the
    /// end of a consumer's processing step.
    pub fn recycle(self) {
        drop(self);
    }

    pub fn into_payload(self) -> PooledPayload {
        self.payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orbitlink_types::payload::vessel::{VesselDock, VesselPosition};

    #[test]
    fn test_category_follows_payload() {
        let position = Envelope::detached(VesselPosition::default());
        assert_eq!(position.delivery_category(), DeliveryCategory::Sequenced);
        assert_eq!(position.message_type(), MessageType::Vessel);

        let dock = Envelope::detached(VesselDock::default());
        assert_eq!(dock.delivery_category(), DeliveryCategory::ReliableOrdered);
    }

    #[test]
    fn test_version_mismatch_flag() {
        let local = ProtocolVersion::CURRENT;
        let older = ProtocolVersion::new(local.major, local.minor.wrapping_sub(1), 0);

        let env = Envelope::received(
            PooledPayload::detached(VesselDock::default().into()),
            older,
            local,
            1,
        );
        assert!(env.version_mismatch());
        assert_eq!(env.sender_version(), older);
        assert!(env.received_at_ns().is_some());

        let env = Envelope::received(
            PooledPayload::detached(VesselDock::default().into()),
            local,
            local,
            1,
        );
        assert!(!env.version_mismatch());
    }
}

//! Delivery categories requested from the transport

use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};

/// Reliability and ordering contract for one message
///
/// - `Unreliable`: may be lost, duplicated or reordered
/// - `Sequenced`: may be lost, but a packet older than one already received
///   is discarded instead of delivered late
/// - `ReliableUnordered`: never lost, any order
/// - `ReliableOrdered`: never lost, strict FIFO per stream
#[repr(u8)]
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    TryFromPrimitive,
    IntoPrimitive,
)]
pub enum DeliveryCategory {
    Unreliable = 0,
    Sequenced = 1,
    ReliableUnordered = 2,
    ReliableOrdered = 3,
}

impl DeliveryCategory {
    pub const ALL: [DeliveryCategory; 4] = [
        DeliveryCategory::Unreliable,
        DeliveryCategory::Sequenced,
        DeliveryCategory::ReliableUnordered,
        DeliveryCategory::ReliableOrdered,
    ];

    pub fn is_reliable(self) -> bool {
        matches!(
            self,
            DeliveryCategory::ReliableUnordered | DeliveryCategory::ReliableOrdered
        )
    }

    /// Whether stale packets must be dropped on receive
    pub fn drops_stale(self) -> bool {
        self == DeliveryCategory::Sequenced
    }

    /// Dense index for per-category tables
    pub fn index(self) -> usize {
        self as usize
    }
}

impl Default for DeliveryCategory {
    fn default() -> Self {
        DeliveryCategory::ReliableOrdered
    }
}

//! Sequence numbering for `Sequenced` delivery
//!
//! Senders number datagrams per category; receivers keep the newest number
//! seen per (peer, category) and discard anything older. Numbers are `u32`
//! and wrap, so "newer" means "ahead by less than half the number space".

use orbitlink_types::DeliveryCategory;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};

/// True when `candidate` comes after `latest` in wrapping order
pub fn is_newer(candidate: u32, latest: u32) -> bool {
    (candidate.wrapping_sub(latest) as i32) > 0
}

/// Outgoing sequence numbers, one stream per delivery category
#[derive(Debug, Default)]
pub struct SequenceCounters {
    next: [AtomicU32; 4],
}

impl SequenceCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self, category: DeliveryCategory) -> u32 {
        self.next[category.index()].fetch_add(1, Ordering::Relaxed)
    }
}

/// Receive-side stale filter
#[derive(Debug, Default)]
pub struct SequenceFilter {
    latest: HashMap<(SocketAddr, DeliveryCategory), u32>,
}

impl SequenceFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a datagram should be delivered
    ///
    /// Only categories that drop stale packets are filtered; everything
    /// else is accepted unconditionally.
    pub fn accept(&mut self, peer: SocketAddr, category: DeliveryCategory, sequence: u32) -> bool {
        if !category.drops_stale() {
            return true;
        }
        match self.latest.get_mut(&(peer, category)) {
            Some(latest) if !is_newer(sequence, *latest) => false,
            Some(latest) => {
                *latest = sequence;
                true
            }
            None => {
                self.latest.insert((peer, category), sequence);
                true
            }
        }
    }

    /// Drop state for a peer that disconnected
    pub fn forget(&mut self, peer: SocketAddr) {
        self.latest.retain(|(addr, _), _| *addr != peer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn peer(port: u16) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], port))
    }

    #[test]
    fn test_stale_sequenced_dropped() {
        let mut filter = SequenceFilter::new();
        assert!(filter.accept(peer(1), DeliveryCategory::Sequenced, 5));
        assert!(!filter.accept(peer(1), DeliveryCategory::Sequenced, 4));
        assert!(!filter.accept(peer(1), DeliveryCategory::Sequenced, 5));
        assert!(filter.accept(peer(1), DeliveryCategory::Sequenced, 6));
    }

    #[test]
    fn test_streams_are_independent() {
        let mut filter = SequenceFilter::new();
        assert!(filter.accept(peer(1), DeliveryCategory::Sequenced, 10));
        assert!(filter.accept(peer(2), DeliveryCategory::Sequenced, 3));
        // Reliable traffic is never filtered
        assert!(filter.accept(peer(1), DeliveryCategory::ReliableOrdered, 0));
        assert!(filter.accept(peer(1), DeliveryCategory::ReliableOrdered, 0));

        filter.forget(peer(1));
        assert!(filter.accept(peer(1), DeliveryCategory::Sequenced, 0));
    }

    #[test]
    fn test_wraparound() {
        let mut filter = SequenceFilter::new();
        assert!(filter.accept(peer(1), DeliveryCategory::Sequenced, u32::MAX));
        assert!(filter.accept(peer(1), DeliveryCategory::Sequenced, 0));
        assert!(!filter.accept(peer(1), DeliveryCategory::Sequenced, u32::MAX - 1));
    }

    #[test]
    fn test_counters_per_category() {
        let counters = SequenceCounters::new();
        assert_eq!(counters.next(DeliveryCategory::Sequenced), 0);
        assert_eq!(counters.next(DeliveryCategory::Sequenced), 1);
        assert_eq!(counters.next(DeliveryCategory::Unreliable), 0);
    }

    proptest! {
        #[test]
        fn prop_newer_is_antisymmetric(a in any::<u32>(), step in 1u32..(1 << 31)) {
            let b = a.wrapping_add(step);
            prop_assert!(is_newer(b, a));
            prop_assert!(!is_newer(a, b));
        }
    }
}

//! # Message Pool
//!
//! ## Purpose
//!
//! Recycles payload instances so steady high-frequency traffic (position
//! updates at tens of Hz per vessel) does not allocate per message. Each
//! registered shape has its own free list behind its own lock; acquiring a
//! chat payload never contends with a thread releasing a vessel position.
//!
//! ## Lifecycle
//!
//! ```text
//! acquire ──► PooledPayload (exclusive owner) ──► drop / release()
//!    ▲                                                  │
//!    └──────────── reset, pushed back on its shelf ◄────┘
//! ```
//!
//! [`PooledPayload`] is a scoped guard: whichever path drops it (normal
//! consumption, an early `?` return, a panic unwinding through a consumer)
//! returns the instance exactly once. An instance that is on a free list is
//! never reachable from any guard, so two live guards never alias.
//!
//! Free lists are unbounded and never expire; their size settles at the peak
//! number of in-flight messages per shape.

use crate::error::{CodecError, CodecResult};
use crate::registry::{PayloadDescriptor, PayloadRegistry, ShapeKey};
use orbitlink_types::{Payload, PayloadFields, PayloadShape};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// One shape's free list
struct Shelf {
    prototype: Payload,
    free: Mutex<Vec<Box<Payload>>>,
}

/// Pool counters
#[derive(Debug, Default)]
struct PoolCounters {
    created: AtomicU64,
    reused: AtomicU64,
    released: AtomicU64,
}

/// Point-in-time copy of pool counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Instances allocated because a shelf was empty
    pub created: u64,
    /// Acquisitions served from a shelf
    pub reused: u64,
    /// Instances returned to a shelf
    pub released: u64,
}

impl PoolStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.created + self.reused;
        if total == 0 {
            0.0
        } else {
            self.reused as f64 / total as f64
        }
    }
}

/// Per-shape payload free lists
pub struct MessagePool {
    shelves: HashMap<ShapeKey, Shelf>,
    counters: PoolCounters,
}

impl MessagePool {
    /// Build one shelf per shape in `registry`
    ///
    /// The shelf map is fixed after construction; only the per-shelf free
    /// lists change, so lookups need no lock.
    pub fn new(registry: &PayloadRegistry) -> Arc<Self> {
        Self::with_capacity(registry, 0)
    }

    /// Build shelves and pre-fill each with `per_shape` instances
    pub fn with_capacity(registry: &PayloadRegistry, per_shape: usize) -> Arc<Self> {
        let shelves = registry
            .descriptors()
            .map(|descriptor| {
                let prototype = descriptor.instantiate();
                let free = (0..per_shape)
                    .map(|_| Box::new(prototype.clone()))
                    .collect::<Vec<_>>();
                (
                    descriptor.key(),
                    Shelf {
                        prototype,
                        free: Mutex::new(free),
                    },
                )
            })
            .collect();

        Arc::new(Self {
            shelves,
            counters: PoolCounters::default(),
        })
    }

    pub fn acquire(self: &Arc<Self>, descriptor: &PayloadDescriptor) -> CodecResult<PooledPayload> {
        self.acquire_key(descriptor.key())
    }

    /// Reset instance of `key`, reused if one is free
    pub fn acquire_key(self: &Arc<Self>, key: ShapeKey) -> CodecResult<PooledPayload> {
        let shelf = self.shelves.get(&key).ok_or(CodecError::ShapeNotPooled {
            message_type: key.message_type,
            sub_type: key.sub_type,
        })?;

        // Pop under the lock, allocate outside it
        let recycled = shelf.free.lock().pop();
        let payload = match recycled {
            Some(payload) => {
                self.counters.reused.fetch_add(1, Ordering::Relaxed);
                payload
            }
            None => {
                self.counters.created.fetch_add(1, Ordering::Relaxed);
                Box::new(shelf.prototype.clone())
            }
        };

        Ok(PooledPayload {
            payload: Some(payload),
            pool: Some(Arc::clone(self)),
        })
    }

    pub fn acquire_shape<T: PayloadShape>(self: &Arc<Self>) -> CodecResult<PooledPayload> {
        self.acquire_key(ShapeKey::of::<T>())
    }

    fn release(&self, mut payload: Box<Payload>) {
        let key = ShapeKey::of_payload(&payload);
        if let Some(shelf) = self.shelves.get(&key) {
            payload.reset();
            shelf.free.lock().push(payload);
            self.counters.released.fetch_add(1, Ordering::Relaxed);
        }
        // A guard whose payload was switched to an unpooled shape just frees it
    }

    /// Instances currently waiting on the shelf for `key`
    pub fn available(&self, key: ShapeKey) -> usize {
        self.shelves
            .get(&key)
            .map(|shelf| shelf.free.lock().len())
            .unwrap_or(0)
    }

    pub fn shape_count(&self) -> usize {
        self.shelves.len()
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            created: self.counters.created.load(Ordering::Relaxed),
            reused: self.counters.reused.load(Ordering::Relaxed),
            released: self.counters.released.load(Ordering::Relaxed),
        }
    }
}

impl fmt::Debug for MessagePool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessagePool")
            .field("shapes", &self.shelves.len())
            .field("stats", &self.stats())
            .finish()
    }
}

/// Exclusively owned payload that returns to its pool on drop
pub struct PooledPayload {
    payload: Option<Box<Payload>>,
    pool: Option<Arc<MessagePool>>,
}

impl PooledPayload {
    /// Wrap a payload that did not come from a pool; it is simply freed on drop
    pub fn detached(payload: Payload) -> Self {
        Self {
            payload: Some(Box::new(payload)),
            pool: None,
        }
    }

    pub fn is_pooled(&self) -> bool {
        self.pool.is_some()
    }

    /// Return the instance to its pool now
    pub fn release(self) {
        drop(self);
    }

    /// Take the payload out, removing it from pool circulation
    pub fn into_inner(mut self) -> Payload {
        self.pool = None;
        match self.payload.take() {
            Some(payload) => *payload,
            None => unreachable!("pooled payload already taken"),
        }
    }

    /// Address of the pooled allocation, stable across reuse
    pub fn instance_id(&self) -> usize {
        self.payload
            .as_deref()
            .map(|payload| payload as *const Payload as usize)
            .unwrap_or(0)
    }

    pub fn get<T: PayloadShape>(&self) -> Option<&T> {
        T::from_payload(self)
    }

    pub fn get_mut<T: PayloadShape>(&mut self) -> Option<&mut T> {
        T::from_payload_mut(self)
    }
}

impl Deref for PooledPayload {
    type Target = Payload;

    fn deref(&self) -> &Payload {
        // Only `into_inner` and `drop` empty the slot, and both consume the guard
        match self.payload.as_deref() {
            Some(payload) => payload,
            None => unreachable!("pooled payload used after release"),
        }
    }
}

impl DerefMut for PooledPayload {
    fn deref_mut(&mut self) -> &mut Payload {
        match self.payload.as_deref_mut() {
            Some(payload) => payload,
            None => unreachable!("pooled payload used after release"),
        }
    }
}

impl Drop for PooledPayload {
    fn drop(&mut self) {
        if let (Some(payload), Some(pool)) = (self.payload.take(), self.pool.take()) {
            pool.release(payload);
        }
    }
}

impl fmt::Debug for PooledPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledPayload")
            .field("payload", &self.payload)
            .field("pooled", &self.pool.is_some())
            .finish()
    }
}

impl PartialEq for PooledPayload {
    fn eq(&self, other: &Self) -> bool {
        **self == **other
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orbitlink_types::payload::chat::{ChatChannelMessage, ChatJoin};
    use orbitlink_types::payload::vessel::VesselPosition;
    use std::collections::HashSet;
    use std::thread;

    fn pool() -> Arc<MessagePool> {
        MessagePool::new(&PayloadRegistry::complete().unwrap())
    }

    #[test]
    fn test_concurrent_acquisitions_never_alias() {
        let pool = pool();
        let a = pool.acquire_shape::<ChatChannelMessage>().unwrap();
        let b = pool.acquire_shape::<ChatChannelMessage>().unwrap();
        assert_ne!(a.instance_id(), b.instance_id());
        assert_eq!(pool.stats().created, 2);
    }

    #[test]
    fn test_release_then_acquire_reuses_instance() {
        let pool = pool();
        let first = pool.acquire_shape::<ChatChannelMessage>().unwrap();
        let id = first.instance_id();
        first.release();
        assert_eq!(pool.available(ShapeKey::of::<ChatChannelMessage>()), 1);

        let second = pool.acquire_shape::<ChatChannelMessage>().unwrap();
        assert_eq!(second.instance_id(), id);
        assert_eq!(pool.stats().reused, 1);
    }

    #[test]
    fn test_release_resets_fields_and_keeps_capacity() {
        let pool = pool();
        let mut msg = pool.acquire_shape::<ChatChannelMessage>().unwrap();
        let text = &mut msg.get_mut::<ChatChannelMessage>().unwrap().text;
        text.push_str("a fairly long line of chat text");
        let capacity = text.capacity();
        drop(msg);

        let msg = pool.acquire_shape::<ChatChannelMessage>().unwrap();
        let reused = msg.get::<ChatChannelMessage>().unwrap();
        assert_eq!(*reused, ChatChannelMessage::default());
        assert_eq!(reused.text.capacity(), capacity);
    }

    #[test]
    fn test_shapes_have_separate_shelves() {
        let pool = pool();
        drop(pool.acquire_shape::<ChatJoin>().unwrap());
        assert_eq!(pool.available(ShapeKey::of::<ChatJoin>()), 1);
        assert_eq!(pool.available(ShapeKey::of::<ChatChannelMessage>()), 0);

        let other = pool.acquire_shape::<ChatChannelMessage>().unwrap();
        assert!(other.get::<ChatChannelMessage>().is_some());
        assert_eq!(pool.available(ShapeKey::of::<ChatJoin>()), 1);
    }

    #[test]
    fn test_unregistered_shape_is_rejected() {
        let registry = PayloadRegistry::builder()
            .shape::<ChatJoin>()
            .build()
            .unwrap();
        let pool = MessagePool::new(&registry);
        assert!(matches!(
            pool.acquire_shape::<VesselPosition>(),
            Err(CodecError::ShapeNotPooled { .. })
        ));
    }

    #[test]
    fn test_detached_and_taken_payloads_skip_the_pool() {
        let pool = pool();
        let taken = pool.acquire_shape::<ChatJoin>().unwrap().into_inner();
        assert_eq!(taken, Payload::from(ChatJoin::default()));
        assert_eq!(pool.available(ShapeKey::of::<ChatJoin>()), 0);

        let detached = PooledPayload::detached(Payload::from(ChatJoin::default()));
        assert!(!detached.is_pooled());
        drop(detached);
        assert_eq!(pool.stats().released, 0);
    }

    #[test]
    fn test_threads_share_one_pool() {
        let pool = MessagePool::with_capacity(&PayloadRegistry::complete().unwrap(), 4);
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let pool = Arc::clone(&pool);
                thread::spawn(move || {
                    let mut ids = Vec::new();
                    for _ in 0..200 {
                        let a = pool.acquire_shape::<VesselPosition>().unwrap();
                        let b = pool.acquire_shape::<VesselPosition>().unwrap();
                        assert_ne!(a.instance_id(), b.instance_id());
                        ids.push(a.instance_id());
                    }
                    ids
                })
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            seen.extend(handle.join().unwrap());
        }
        let stats = pool.stats();
        assert_eq!(stats.created + stats.reused, 8 * 200 * 2);
        assert_eq!(stats.released, 8 * 200 * 2);
        // Every instance ended up back on its shelf
        assert_eq!(
            pool.available(ShapeKey::of::<VesselPosition>()) as u64,
            4 + stats.created
        );
        assert!(!seen.is_empty());
    }
}

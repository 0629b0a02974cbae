//! # Orbitlink Codec
//!
//! ## Purpose
//!
//! The rules layer between payload definitions and the network:
//!
//! - [`header`]: fixed 8-byte big-endian message header
//! - [`registry`]: `(MessageType, SubType)` → payload shape tables
//! - [`pool`]: per-shape payload recycling with scoped guards
//! - [`compression`]: LZ4 body compression, only when it helps
//! - [`envelope`]: payload + identity + version + timing
//! - [`pipeline`]: serialize envelopes to datagrams and back
//!
//! ## Architecture Role
//!
//! ```text
//! orbitlink-types → [orbitlink-codec] → orbitlink-network
//!       ↑                  ↓                    ↓
//!  Payload shapes    Framing, pooling      Transports, routing,
//!  Field codec       Serialization         dispatch, sending
//! ```
//!
//! ## What This Crate Does NOT Contain
//!
//! - Transports, queues or threads (see `orbitlink-network`)
//! - Payload field definitions (see `orbitlink-types`)

pub mod compression;
pub mod envelope;
pub mod error;
pub mod header;
pub mod pipeline;
pub mod pool;
pub mod registry;

pub use compression::CompressionEngine;
pub use envelope::{current_timestamp_ns, Envelope};
pub use error::{CodecError, CodecResult};
pub use header::{decode_header, encode_header, MessageHeader};
pub use pipeline::CodecPipeline;
pub use pool::{MessagePool, PoolStats, PooledPayload};
pub use registry::{PayloadDescriptor, PayloadRegistry, PayloadRegistryBuilder, ShapeKey};

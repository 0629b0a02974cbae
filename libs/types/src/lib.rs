//! # Orbitlink Types
//!
//! Protocol identities, payload shapes and the field-level wire codec shared by
//! every Orbitlink crate.
//!
//! ## Layout
//!
//! - [`protocol`]: header constants, [`MessageType`] families, [`DeliveryCategory`]
//!   and [`ProtocolVersion`]
//! - [`wire`]: big-endian field reader/writer and the [`WireField`] trait
//! - [`payload`]: the closed catalogue of payload shapes, grouped per family
//!
//! Framing, pooling and compression live in `orbitlink-codec`; this crate only
//! knows how a single payload lays its fields out.
//!
//! ## Quick Start
//!
//! ```rust
//! use orbitlink_types::payload::chat::{ChatChannelMessage, ChatMessageType};
//! use orbitlink_types::{MessageType, Payload, PayloadFields, WireReader, WireWriter};
//!
//! let msg = ChatChannelMessage {
//!     from: "jeb".to_string(),
//!     channel: "general".to_string(),
//!     text: "hello".to_string(),
//! };
//! let payload = Payload::from(msg);
//! assert_eq!(payload.message_type(), MessageType::Chat);
//! assert_eq!(payload.sub_type(), u16::from(ChatMessageType::ChannelMessage));
//!
//! let mut body = Vec::new();
//! payload.write_fields(&mut WireWriter::new(&mut body)).unwrap();
//!
//! let mut decoded = Payload::empty(MessageType::Chat, payload.sub_type()).unwrap();
//! decoded.read_fields(&mut WireReader::new(&body)).unwrap();
//! assert_eq!(decoded, payload);
//! ```

pub mod payload;
pub mod protocol;
pub mod wire;

pub use payload::{Payload, PayloadShape};
pub use protocol::{
    DeliveryCategory, MessageType, ProtocolVersion, HEADER_SIZE, MAX_PAYLOAD_LENGTH,
};
pub use wire::{PayloadFields, WireError, WireField, WireReader, WireWriter};

//! Protocol identities and constants
//!
//! Everything here is part of the wire contract: numeric values of message
//! families, delivery categories and header layout must never change for an
//! existing protocol version.

pub mod constants;
pub mod delivery;
pub mod message_type;
pub mod version;

pub use constants::*;
pub use delivery::DeliveryCategory;
pub use message_type::MessageType;
pub use version::ProtocolVersion;

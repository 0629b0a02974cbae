//! Codec errors
//!
//! Every variant carries enough context to diagnose the offending message
//! from a single log line. Receive-side errors are contained to the one
//! message that raised them; send-side errors are returned to the caller.

use orbitlink_types::{MessageType, WireError};
use thiserror::Error;

/// Framing, registry and payload codec failures
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CodecError {
    /// Header too short, or its length field disagrees with the bytes received
    #[error("Malformed header: {reason} (received {received} bytes)")]
    MalformedHeader { reason: String, received: usize },

    /// Message Type outside the catalogue or not registered on this side
    #[error("Unknown message type {message_type}")]
    UnknownMessageType { message_type: u16 },

    /// Known family without a registered shape for this SubType
    #[error("Unknown subtype {sub_type} for message type {message_type}")]
    UnknownSubType {
        message_type: MessageType,
        sub_type: u16,
    },

    /// Decompression or field decode failed
    #[error("Corrupt {shape} payload: {reason}")]
    CorruptPayload { shape: &'static str, reason: String },

    /// Field encode failed on the send side
    #[error("Failed to serialize {shape}: {source}")]
    Serialization {
        shape: &'static str,
        #[source]
        source: WireError,
    },

    /// Body does not fit the 31-bit header length
    #[error("Payload length {length} exceeds header limit {limit}")]
    PayloadTooLarge { length: usize, limit: u32 },

    /// Shape was registered after the pool was built
    #[error("No pool shelf for {message_type}/{sub_type}")]
    ShapeNotPooled {
        message_type: MessageType,
        sub_type: u16,
    },

    /// Compressor rejected the input
    #[error("Compression error: {codec}: {message}")]
    Compression { codec: &'static str, message: String },

    /// Registry definition is inconsistent with the payload catalogue
    #[error("Invalid registry: {message}")]
    Registry { message: String },
}

/// Result type for codec operations
pub type CodecResult<T> = std::result::Result<T, CodecError>;

impl CodecError {
    pub fn malformed_header(reason: impl Into<String>, received: usize) -> Self {
        Self::MalformedHeader {
            reason: reason.into(),
            received,
        }
    }

    pub fn corrupt(shape: &'static str, reason: impl Into<String>) -> Self {
        Self::CorruptPayload {
            shape,
            reason: reason.into(),
        }
    }

    pub fn serialization(shape: &'static str, source: WireError) -> Self {
        Self::Serialization { shape, source }
    }

    pub fn registry(message: impl Into<String>) -> Self {
        Self::Registry {
            message: message.into(),
        }
    }

    /// Whether the error only affects one received message
    ///
    /// The receive loop drops the unit and keeps going for these.
    pub fn is_per_message(&self) -> bool {
        matches!(
            self,
            CodecError::MalformedHeader { .. }
                | CodecError::UnknownMessageType { .. }
                | CodecError::UnknownSubType { .. }
                | CodecError::CorruptPayload { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_carry_context() {
        let err = CodecError::malformed_header("declared 1000 body bytes, got 2", 10);
        assert_eq!(
            err.to_string(),
            "Malformed header: declared 1000 body bytes, got 2 (received 10 bytes)"
        );

        let err = CodecError::UnknownSubType {
            message_type: MessageType::Vessel,
            sub_type: 77,
        };
        assert_eq!(err.to_string(), "Unknown subtype 77 for message type Vessel");
    }

    #[test]
    fn test_serialization_error_exposes_source() {
        use std::error::Error;
        let err = CodecError::serialization(
            "ChatChannelMessage",
            WireError::LengthOverflow {
                length: usize::MAX,
                limit: u32::MAX as usize,
            },
        );
        assert!(err.source().is_some());
        assert!(!err.is_per_message());
    }
}

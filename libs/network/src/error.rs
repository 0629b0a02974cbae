//! Network Error Types
//!
//! Errors raised by transports, routing and the send/receive loops. Codec
//! failures are wrapped so callers can tell a bad message from a bad
//! connection.

use orbitlink_codec::CodecError;
use std::net::SocketAddr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NetworkError {
    /// Socket-level failures
    #[error("Network error: {message}")]
    Network {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Peer is gone or never connected
    #[error("Connection error: {message} (remote: {remote_addr:?})")]
    Connection {
        message: String,
        remote_addr: Option<SocketAddr>,
    },

    #[error("Configuration error: {message}")]
    Configuration {
        message: String,
        field: Option<String>,
    },

    /// Encoding or decoding one message failed
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// No subsystem accepts the message, or the table is inconsistent
    #[error("Routing error: {message}")]
    Routing { message: String },

    /// The outbound sender task has stopped
    #[error("Outbound sender is closed")]
    SenderClosed,

    #[error("Timeout error: {operation} exceeded {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    #[error("I/O error: {message}")]
    Io {
        message: String,
        source: std::io::Error,
    },
}

/// Result type alias for network operations
pub type Result<T> = std::result::Result<T, NetworkError>;

impl NetworkError {
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
            source: None,
        }
    }

    pub fn network_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Network {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn connection(message: impl Into<String>, remote_addr: Option<SocketAddr>) -> Self {
        Self::Connection {
            message: message.into(),
            remote_addr,
        }
    }

    pub fn configuration(message: impl Into<String>, field: Option<&str>) -> Self {
        Self::Configuration {
            message: message.into(),
            field: field.map(|s| s.to_string()),
        }
    }

    pub fn routing(message: impl Into<String>) -> Self {
        Self::Routing {
            message: message.into(),
        }
    }

    pub fn timeout(operation: impl Into<String>, timeout_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_ms,
        }
    }

    pub fn io(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source,
        }
    }

    /// True for failures confined to a single message; the connection
    /// stays usable
    pub fn is_per_message(&self) -> bool {
        match self {
            NetworkError::Codec(e) => e.is_per_message(),
            NetworkError::Routing { .. } => true,
            _ => false,
        }
    }

    /// Get error category for logs and counters
    pub fn category(&self) -> &'static str {
        match self {
            NetworkError::Network { .. } => "network",
            NetworkError::Connection { .. } => "connection",
            NetworkError::Configuration { .. } => "configuration",
            NetworkError::Codec(_) => "codec",
            NetworkError::Routing { .. } => "routing",
            NetworkError::SenderClosed => "sender_closed",
            NetworkError::Timeout { .. } => "timeout",
            NetworkError::Io { .. } => "io",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orbitlink_types::MessageType;

    #[test]
    fn test_codec_errors_stay_per_message() {
        let err: NetworkError = CodecError::UnknownSubType {
            message_type: MessageType::Chat,
            sub_type: 99,
        }
        .into();
        assert!(err.is_per_message());
        assert_eq!(err.category(), "codec");

        let err: NetworkError = CodecError::PayloadTooLarge {
            length: u32::MAX as usize,
            limit: 0x7FFF_FFFF,
        }
        .into();
        assert!(!err.is_per_message());
    }

    #[test]
    fn test_connection_error_display() {
        let err = NetworkError::connection("peer closed", Some("127.0.0.1:6702".parse().unwrap()));
        let text = err.to_string();
        assert!(text.contains("peer closed"));
        assert!(text.contains("6702"));
        assert!(!err.is_per_message());
    }
}

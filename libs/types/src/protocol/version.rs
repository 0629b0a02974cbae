//! Protocol version carried in every message body

use serde::{Deserialize, Serialize};
use std::fmt;

/// Sender protocol version, compared field by field on receive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProtocolVersion {
    pub major: u16,
    pub minor: u16,
    pub build: u16,
}

impl ProtocolVersion {
    /// Version spoken by this build
    pub const CURRENT: ProtocolVersion = ProtocolVersion::new(0, 29, 1);

    pub const fn new(major: u16, minor: u16, build: u16) -> Self {
        Self {
            major,
            minor,
            build,
        }
    }

    /// Whether a message stamped with `other` was produced by a different build
    pub fn mismatches(&self, other: &ProtocolVersion) -> bool {
        self != other
    }
}

impl Default for ProtocolVersion {
    fn default() -> Self {
        Self::CURRENT
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.build)
    }
}

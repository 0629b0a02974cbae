//! Message family identities

use super::DeliveryCategory;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Top-level message family carried in header bytes 0-1
///
/// Values are unique per family and never reused within a protocol version.
#[repr(u16)]
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    TryFromPrimitive,
    IntoPrimitive,
)]
pub enum MessageType {
    Handshake = 0,
    Settings = 1,
    Chat = 2,
    PlayerStatus = 3,
    PlayerConnection = 4,
    Scenario = 5,
    Kerbal = 6,
    Vessel = 7,
    CraftLibrary = 8,
    Flag = 9,
    Motd = 10,
    Warp = 11,
    Admin = 12,
    Groups = 13,
    Facility = 14,
    MasterServer = 15,
    Lock = 16,
    PlayerColor = 17,
    Mod = 18,
}

impl MessageType {
    pub const ALL: [MessageType; 19] = [
        MessageType::Handshake,
        MessageType::Settings,
        MessageType::Chat,
        MessageType::PlayerStatus,
        MessageType::PlayerConnection,
        MessageType::Scenario,
        MessageType::Kerbal,
        MessageType::Vessel,
        MessageType::CraftLibrary,
        MessageType::Flag,
        MessageType::Motd,
        MessageType::Warp,
        MessageType::Admin,
        MessageType::Groups,
        MessageType::Facility,
        MessageType::MasterServer,
        MessageType::Lock,
        MessageType::PlayerColor,
        MessageType::Mod,
    ];

    /// Parse a raw header value, `None` for ids outside the catalogue
    pub fn from_wire(value: u16) -> Option<Self> {
        Self::try_from(value).ok()
    }

    /// Category used when the family does not pick one per SubType
    pub fn default_delivery(self) -> DeliveryCategory {
        DeliveryCategory::ReliableOrdered
    }

    pub fn name(self) -> &'static str {
        match self {
            MessageType::Handshake => "Handshake",
            MessageType::Settings => "Settings",
            MessageType::Chat => "Chat",
            MessageType::PlayerStatus => "PlayerStatus",
            MessageType::PlayerConnection => "PlayerConnection",
            MessageType::Scenario => "Scenario",
            MessageType::Kerbal => "Kerbal",
            MessageType::Vessel => "Vessel",
            MessageType::CraftLibrary => "CraftLibrary",
            MessageType::Flag => "Flag",
            MessageType::Motd => "Motd",
            MessageType::Warp => "Warp",
            MessageType::Admin => "Admin",
            MessageType::Groups => "Groups",
            MessageType::Facility => "Facility",
            MessageType::MasterServer => "MasterServer",
            MessageType::Lock => "Lock",
            MessageType::PlayerColor => "PlayerColor",
            MessageType::Mod => "Mod",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

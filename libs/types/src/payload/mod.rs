//! Payload Catalogue
//!
//! The closed set of payload shapes the protocol carries. Each message family
//! is a sum type over its SubType shapes, and [`Payload`] is the sum over all
//! families, so every `(MessageType, SubType)` pair maps to exactly one
//! concrete struct and dispatch over them is checked for exhaustiveness.
//!
//! Shapes are plain data: they own their fields, hold no reference to an
//! envelope, and can be [`reset`](crate::wire::PayloadFields::reset) and
//! refilled in place for reuse by the message pool.

#[macro_use]
mod macros;

pub mod chat;
pub mod coordination;
pub mod library;
pub mod master_server;
pub mod session;
pub mod vessel;
pub mod world;

use crate::protocol::{DeliveryCategory, MessageType};
use crate::wire::PayloadFields;

use chat::{ChatMessageType, ChatPayload};
use coordination::{
    LockMessageType, LockPayload, ModMessageType, ModPayload, PlayerColorMessageType,
    PlayerColorPayload,
};
use library::{
    CraftLibraryMessageType, CraftLibraryPayload, FlagMessageType, FlagPayload,
    GroupsMessageType, GroupsPayload,
};
use master_server::{MasterServerMessageType, MasterServerPayload};
use session::{
    AdminMessageType, AdminPayload, HandshakeMessageType, HandshakePayload, MotdMessageType,
    MotdPayload, PlayerConnectionMessageType, PlayerConnectionPayload, PlayerStatusMessageType,
    PlayerStatusPayload, SettingsMessageType, SettingsPayload,
};
use vessel::{VesselMessageType, VesselPayload};
use world::{
    FacilityMessageType, FacilityPayload, KerbalMessageType, KerbalPayload, ScenarioMessageType,
    ScenarioPayload, WarpMessageType, WarpPayload,
};

/// A concrete payload struct with a fixed `(MessageType, SubType)` identity
pub trait PayloadShape: PayloadFields + Default + Clone + Into<Payload> + Send + 'static {
    const MESSAGE_TYPE: MessageType;
    const SUB_TYPE: u16;
    const NAME: &'static str;

    fn from_payload(payload: &Payload) -> Option<&Self>;
    fn from_payload_mut(payload: &mut Payload) -> Option<&mut Self>;
}

define_payload_set! {
    Handshake => HandshakePayload, HandshakeMessageType;
    Settings => SettingsPayload, SettingsMessageType;
    Chat => ChatPayload, ChatMessageType;
    PlayerStatus => PlayerStatusPayload, PlayerStatusMessageType;
    PlayerConnection => PlayerConnectionPayload, PlayerConnectionMessageType;
    Scenario => ScenarioPayload, ScenarioMessageType;
    Kerbal => KerbalPayload, KerbalMessageType;
    Vessel => VesselPayload, VesselMessageType;
    CraftLibrary => CraftLibraryPayload, CraftLibraryMessageType;
    Flag => FlagPayload, FlagMessageType;
    Motd => MotdPayload, MotdMessageType;
    Warp => WarpPayload, WarpMessageType;
    Admin => AdminPayload, AdminMessageType;
    Groups => GroupsPayload, GroupsMessageType;
    Facility => FacilityPayload, FacilityMessageType;
    MasterServer => MasterServerPayload, MasterServerMessageType;
    Lock => LockPayload, LockMessageType;
    PlayerColor => PlayerColorPayload, PlayerColorMessageType;
    Mod => ModPayload, ModMessageType;
}

impl Payload {
    /// Category this payload should travel with unless the sender overrides it
    pub fn delivery_category(&self) -> DeliveryCategory {
        match self {
            Payload::Vessel(vessel) => vessel.sub_type().delivery_category(),
            other => other.message_type().default_delivery(),
        }
    }

    /// Typed view of the payload, `None` if it holds a different shape
    pub fn get<T: PayloadShape>(&self) -> Option<&T> {
        T::from_payload(self)
    }

    pub fn get_mut<T: PayloadShape>(&mut self) -> Option<&mut T> {
        T::from_payload_mut(self)
    }
}

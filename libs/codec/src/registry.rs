//! # Payload Registry
//!
//! ## Purpose
//!
//! Maps each `(MessageType, SubType)` pair a peer accepts to the payload shape
//! that decodes it. Built once at startup, then shared read-only (behind an
//! `Arc`) by the codec pipeline, message pool and router.
//!
//! The catalogue in `orbitlink-types` already knows every shape; a registry
//! selects the subset one side of a connection should accept. Separate
//! client, server and master-server tables keep a peer from decoding traffic
//! it should never receive, and small registries make isolated tests easy.
//!
//! ## Usage
//!
//! ```rust
//! use orbitlink_codec::PayloadRegistry;
//! use orbitlink_types::payload::chat::ChatMessageType;
//! use orbitlink_types::MessageType;
//!
//! let registry = PayloadRegistry::builder()
//!     .family(MessageType::Chat, &[ChatMessageType::Join, ChatMessageType::ChannelMessage])
//!     .single(MessageType::PlayerConnection)
//!     .build()
//!     .unwrap();
//!
//! assert!(registry.resolve(2, ChatMessageType::Join.into()).is_ok());
//! assert!(registry.resolve(2, ChatMessageType::Leave.into()).is_err());
//! ```

use crate::error::{CodecError, CodecResult};
use orbitlink_types::payload::chat::ChatMessageType;
use orbitlink_types::payload::coordination::{LockMessageType, PlayerColorMessageType};
use orbitlink_types::payload::library::{
    CraftLibraryMessageType, FlagMessageType, GroupsMessageType,
};
use orbitlink_types::payload::session::{
    AdminMessageType, HandshakeMessageType, MotdMessageType, PlayerStatusMessageType,
    SettingsMessageType,
};
use orbitlink_types::payload::vessel::VesselMessageType;
use orbitlink_types::payload::world::{KerbalMessageType, ScenarioMessageType, WarpMessageType};
use orbitlink_types::protocol::DEFAULT_SUB_TYPE;
use orbitlink_types::{MessageType, Payload, PayloadShape};
use std::collections::hash_map::Entry;
use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// Identity of one payload shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShapeKey {
    pub message_type: MessageType,
    pub sub_type: u16,
}

impl ShapeKey {
    pub fn new(message_type: MessageType, sub_type: u16) -> Self {
        Self {
            message_type,
            sub_type,
        }
    }

    pub fn of<T: PayloadShape>() -> Self {
        Self::new(T::MESSAGE_TYPE, T::SUB_TYPE)
    }

    pub fn of_payload(payload: &Payload) -> Self {
        Self::new(payload.message_type(), payload.sub_type())
    }
}

impl fmt::Display for ShapeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.message_type, self.sub_type)
    }
}

/// Everything needed to materialize a fresh instance of one shape
#[derive(Debug, Clone)]
pub struct PayloadDescriptor {
    key: ShapeKey,
    name: &'static str,
    prototype: Payload,
}

impl PayloadDescriptor {
    pub fn key(&self) -> ShapeKey {
        self.key
    }

    pub fn message_type(&self) -> MessageType {
        self.key.message_type
    }

    pub fn sub_type(&self) -> u16 {
        self.key.sub_type
    }

    /// Shape name used in diagnostics
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// New default-valued instance
    pub fn instantiate(&self) -> Payload {
        self.prototype.clone()
    }
}

/// Immutable `(MessageType, SubType)` → shape table
#[derive(Debug, Clone)]
pub struct PayloadRegistry {
    shapes: HashMap<ShapeKey, PayloadDescriptor>,
    families: BTreeSet<MessageType>,
}

impl PayloadRegistry {
    pub fn builder() -> PayloadRegistryBuilder {
        PayloadRegistryBuilder::default()
    }

    /// Resolve raw header values to a descriptor
    pub fn resolve(&self, message_type: u16, sub_type: u16) -> CodecResult<&PayloadDescriptor> {
        let family = MessageType::from_wire(message_type)
            .filter(|family| self.families.contains(family))
            .ok_or(CodecError::UnknownMessageType { message_type })?;
        self.resolve_key(ShapeKey::new(family, sub_type))
    }

    pub fn resolve_key(&self, key: ShapeKey) -> CodecResult<&PayloadDescriptor> {
        self.shapes.get(&key).ok_or(CodecError::UnknownSubType {
            message_type: key.message_type,
            sub_type: key.sub_type,
        })
    }

    pub fn descriptor_for<T: PayloadShape>(&self) -> CodecResult<&PayloadDescriptor> {
        self.resolve_key(ShapeKey::of::<T>())
    }

    pub fn contains(&self, key: ShapeKey) -> bool {
        self.shapes.contains_key(&key)
    }

    /// Families with at least one registered shape, in id order
    pub fn message_types(&self) -> impl Iterator<Item = MessageType> + '_ {
        self.families.iter().copied()
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &PayloadDescriptor> {
        self.shapes.values()
    }

    /// Registered keys in a stable order
    pub fn keys(&self) -> Vec<ShapeKey> {
        let mut keys: Vec<ShapeKey> = self.shapes.keys().copied().collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    /// Shapes a server accepts from its clients
    pub fn client_to_server() -> CodecResult<Self> {
        Self::builder().with_client_messages().build()
    }

    /// Shapes a client accepts from its server
    pub fn server_to_client() -> CodecResult<Self> {
        Self::builder().with_server_messages().build()
    }

    /// Shapes exchanged with the server-list service
    pub fn master_server() -> CodecResult<Self> {
        Self::builder().with_master_server().build()
    }

    /// Every shape in the catalogue
    pub fn complete() -> CodecResult<Self> {
        MessageType::ALL
            .iter()
            .fold(Self::builder(), |builder, message_type| {
                builder.all_shapes(*message_type)
            })
            .build()
    }
}

/// Collects registrations; errors surface from [`build`](Self::build)
#[derive(Debug, Default)]
pub struct PayloadRegistryBuilder {
    shapes: HashMap<ShapeKey, PayloadDescriptor>,
    errors: Vec<String>,
}

impl PayloadRegistryBuilder {
    /// Register the listed SubTypes of one family
    pub fn family<S>(mut self, message_type: MessageType, sub_types: &[S]) -> Self
    where
        S: Copy + Into<u16>,
    {
        for sub_type in sub_types {
            self.insert(ShapeKey::new(message_type, (*sub_type).into()));
        }
        self
    }

    /// Register a single-shape family at SubType 0
    pub fn single(mut self, message_type: MessageType) -> Self {
        self.insert(ShapeKey::new(message_type, DEFAULT_SUB_TYPE));
        self
    }

    /// Register every SubType the family declares
    pub fn all_shapes(mut self, message_type: MessageType) -> Self {
        for sub_type in Payload::declared_sub_types(message_type) {
            self.insert(ShapeKey::new(message_type, sub_type));
        }
        self
    }

    pub fn shape<T: PayloadShape>(mut self) -> Self {
        self.insert(ShapeKey::of::<T>());
        self
    }

    fn insert(&mut self, key: ShapeKey) {
        match (Payload::empty(key.message_type, key.sub_type), self.shapes.entry(key)) {
            (Some(_), Entry::Occupied(_)) => self
                .errors
                .push(format!("{key} registered more than once")),
            (Some(prototype), Entry::Vacant(slot)) => {
                slot.insert(PayloadDescriptor {
                    key,
                    name: prototype.shape_name(),
                    prototype,
                });
            }
            (None, _) => self
                .errors
                .push(format!("{} declares no shape for subtype {}", key.message_type, key.sub_type)),
        }
    }

    /// Traffic a client sends to its server
    pub fn with_client_messages(self) -> Self {
        use ChatMessageType as Chat;
        use VesselMessageType as Vessel;

        self.family(
            MessageType::Handshake,
            &[HandshakeMessageType::Request, HandshakeMessageType::Response],
        )
        .family(MessageType::Settings, &[SettingsMessageType::Request])
        .family(
            MessageType::Chat,
            &[
                Chat::ListRequest,
                Chat::Join,
                Chat::Leave,
                Chat::ChannelMessage,
                Chat::PrivateMessage,
                Chat::ConsoleMessage,
            ],
        )
        .family(
            MessageType::PlayerStatus,
            &[PlayerStatusMessageType::Request, PlayerStatusMessageType::Set],
        )
        .family(
            MessageType::Scenario,
            &[ScenarioMessageType::Request, ScenarioMessageType::Data],
        )
        .family(
            MessageType::Kerbal,
            &[
                KerbalMessageType::Request,
                KerbalMessageType::Proto,
                KerbalMessageType::Remove,
            ],
        )
        .family(
            MessageType::Vessel,
            &[
                Vessel::ListRequest,
                Vessel::VesselsRequest,
                Vessel::Proto,
                Vessel::ProtoReliable,
                Vessel::Dock,
                Vessel::Remove,
                Vessel::Position,
                Vessel::FlightState,
                Vessel::Update,
                Vessel::Resource,
                Vessel::PartSync,
                Vessel::Fairing,
            ],
        )
        .family(
            MessageType::CraftLibrary,
            &[
                CraftLibraryMessageType::ListRequest,
                CraftLibraryMessageType::RequestFile,
                CraftLibraryMessageType::UploadFile,
                CraftLibraryMessageType::DeleteFile,
            ],
        )
        .family(
            MessageType::Flag,
            &[
                FlagMessageType::ListRequest,
                FlagMessageType::FlagData,
                FlagMessageType::FlagDelete,
            ],
        )
        .family(MessageType::Motd, &[MotdMessageType::Request])
        .family(
            MessageType::Warp,
            &[
                WarpMessageType::SubspacesRequest,
                WarpMessageType::NewSubspace,
                WarpMessageType::ChangeSubspace,
            ],
        )
        .family(MessageType::Admin, &[AdminMessageType::ListRequest])
        .family(
            MessageType::Groups,
            &[
                GroupsMessageType::ListRequest,
                GroupsMessageType::CreateGroup,
                GroupsMessageType::RemoveGroup,
                GroupsMessageType::GroupUpdate,
            ],
        )
        .all_shapes(MessageType::Facility)
        .family(
            MessageType::Lock,
            &[
                LockMessageType::ListRequest,
                LockMessageType::Acquire,
                LockMessageType::Release,
            ],
        )
        .family(
            MessageType::PlayerColor,
            &[PlayerColorMessageType::Request, PlayerColorMessageType::Set],
        )
        .single(MessageType::Mod)
    }

    /// Traffic a server sends to its clients
    pub fn with_server_messages(self) -> Self {
        use ChatMessageType as Chat;
        use VesselMessageType as Vessel;

        self.family(
            MessageType::Handshake,
            &[HandshakeMessageType::Challenge, HandshakeMessageType::Reply],
        )
        .family(MessageType::Settings, &[SettingsMessageType::Reply])
        .family(
            MessageType::Chat,
            &[
                Chat::ListReply,
                Chat::Join,
                Chat::Leave,
                Chat::ChannelMessage,
                Chat::PrivateMessage,
                Chat::ConsoleMessage,
            ],
        )
        .family(
            MessageType::PlayerStatus,
            &[PlayerStatusMessageType::Reply, PlayerStatusMessageType::Set],
        )
        .single(MessageType::PlayerConnection)
        .family(MessageType::Scenario, &[ScenarioMessageType::Data])
        .family(
            MessageType::Kerbal,
            &[
                KerbalMessageType::Reply,
                KerbalMessageType::Proto,
                KerbalMessageType::Remove,
            ],
        )
        .family(
            MessageType::Vessel,
            &[
                Vessel::ListReply,
                Vessel::Proto,
                Vessel::ProtoReliable,
                Vessel::Dock,
                Vessel::Remove,
                Vessel::Position,
                Vessel::FlightState,
                Vessel::Update,
                Vessel::Resource,
                Vessel::PartSync,
                Vessel::Fairing,
            ],
        )
        .family(
            MessageType::CraftLibrary,
            &[
                CraftLibraryMessageType::ListReply,
                CraftLibraryMessageType::RespondFile,
                CraftLibraryMessageType::UploadFile,
                CraftLibraryMessageType::DeleteFile,
            ],
        )
        .family(
            MessageType::Flag,
            &[
                FlagMessageType::ListResponse,
                FlagMessageType::FlagData,
                FlagMessageType::FlagDelete,
            ],
        )
        .family(MessageType::Motd, &[MotdMessageType::Reply])
        .family(
            MessageType::Warp,
            &[
                WarpMessageType::SubspacesReply,
                WarpMessageType::NewSubspace,
                WarpMessageType::ChangeSubspace,
            ],
        )
        .family(
            MessageType::Admin,
            &[
                AdminMessageType::ListReply,
                AdminMessageType::Add,
                AdminMessageType::Remove,
            ],
        )
        .family(
            MessageType::Groups,
            &[
                GroupsMessageType::ListResponse,
                GroupsMessageType::CreateGroup,
                GroupsMessageType::RemoveGroup,
                GroupsMessageType::GroupUpdate,
            ],
        )
        .all_shapes(MessageType::Facility)
        .family(
            MessageType::Lock,
            &[
                LockMessageType::ListReply,
                LockMessageType::Acquire,
                LockMessageType::Release,
            ],
        )
        .family(
            MessageType::PlayerColor,
            &[PlayerColorMessageType::Reply, PlayerColorMessageType::Set],
        )
        .single(MessageType::Mod)
    }

    /// Server-list traffic, exchanged over unconnected datagrams
    pub fn with_master_server(self) -> Self {
        self.all_shapes(MessageType::MasterServer)
    }

    pub fn build(self) -> CodecResult<PayloadRegistry> {
        if !self.errors.is_empty() {
            return Err(CodecError::registry(self.errors.join("; ")));
        }
        let families = self.shapes.keys().map(|key| key.message_type).collect();
        Ok(PayloadRegistry {
            shapes: self.shapes,
            families,
        })
    }
}

//! Message routing
//!
//! Maps each `(MessageType, SubType)` to exactly one [`MessageSink`].
//! Most families route as a whole; a family can also route individual
//! subtypes to their own sinks, which take precedence over the family
//! route. Vessel traffic is split this way so high-rate position updates
//! never queue behind proto transfers.

use crate::queue::{InboundQueue, MessageSink};
use crate::{NetworkError, Result};
use orbitlink_codec::{Envelope, PayloadRegistry, ShapeKey};
use orbitlink_types::payload::vessel::VesselMessageType;
use orbitlink_types::MessageType;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

/// Consumer of one stream of inbound messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Subsystem {
    Handshake,
    Settings,
    Chat,
    PlayerStatus,
    PlayerConnection,
    Scenario,
    Kerbal,
    /// Vessel list and request traffic
    Vessel,
    VesselPosition,
    VesselFlightState,
    VesselProto,
    VesselDock,
    VesselRemove,
    VesselUpdate,
    VesselResource,
    /// Part module field changes
    VesselPartSync,
    VesselFairing,
    CraftLibrary,
    Flag,
    Motd,
    Warp,
    Admin,
    Groups,
    Facility,
    /// Server-list service traffic
    MasterServer,
    Lock,
    PlayerColor,
    /// Mod payloads, handed to whichever mod registered the name
    Mod,
}

impl Subsystem {
    /// Subsystem that consumes a given shape
    pub fn of(message_type: MessageType, sub_type: u16) -> Self {
        match message_type {
            MessageType::Handshake => Subsystem::Handshake,
            MessageType::Settings => Subsystem::Settings,
            MessageType::Chat => Subsystem::Chat,
            MessageType::PlayerStatus => Subsystem::PlayerStatus,
            MessageType::PlayerConnection => Subsystem::PlayerConnection,
            MessageType::Scenario => Subsystem::Scenario,
            MessageType::Kerbal => Subsystem::Kerbal,
            MessageType::Vessel => match VesselMessageType::try_from(sub_type) {
                Ok(VesselMessageType::Position) => Subsystem::VesselPosition,
                Ok(VesselMessageType::FlightState) => Subsystem::VesselFlightState,
                Ok(VesselMessageType::Proto | VesselMessageType::ProtoReliable) => {
                    Subsystem::VesselProto
                }
                Ok(VesselMessageType::Dock) => Subsystem::VesselDock,
                Ok(VesselMessageType::Remove) => Subsystem::VesselRemove,
                Ok(VesselMessageType::Update) => Subsystem::VesselUpdate,
                Ok(VesselMessageType::Resource) => Subsystem::VesselResource,
                Ok(VesselMessageType::PartSync) => Subsystem::VesselPartSync,
                Ok(VesselMessageType::Fairing) => Subsystem::VesselFairing,
                _ => Subsystem::Vessel,
            },
            MessageType::CraftLibrary => Subsystem::CraftLibrary,
            MessageType::Flag => Subsystem::Flag,
            MessageType::Motd => Subsystem::Motd,
            MessageType::Warp => Subsystem::Warp,
            MessageType::Admin => Subsystem::Admin,
            MessageType::Groups => Subsystem::Groups,
            MessageType::Facility => Subsystem::Facility,
            MessageType::MasterServer => Subsystem::MasterServer,
            MessageType::Lock => Subsystem::Lock,
            MessageType::PlayerColor => Subsystem::PlayerColor,
            MessageType::Mod => Subsystem::Mod,
        }
    }

    /// Whether this subsystem is reached through a per-subtype route
    pub fn is_sub_routed(self) -> bool {
        matches!(
            self,
            Subsystem::VesselPosition
                | Subsystem::VesselFlightState
                | Subsystem::VesselProto
                | Subsystem::VesselDock
                | Subsystem::VesselRemove
                | Subsystem::VesselUpdate
                | Subsystem::VesselResource
                | Subsystem::VesselPartSync
                | Subsystem::VesselFairing
        )
    }
}

impl fmt::Display for Subsystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Immutable `(MessageType, SubType) -> sink` map
pub struct RoutingTable {
    families: HashMap<MessageType, Arc<dyn MessageSink>>,
    sub_types: HashMap<ShapeKey, Arc<dyn MessageSink>>,
}

impl RoutingTable {
    pub fn builder() -> RoutingTableBuilder {
        RoutingTableBuilder::default()
    }

    /// Sink for a shape; a subtype route wins over its family route
    pub fn resolve(&self, message_type: MessageType, sub_type: u16) -> Option<&Arc<dyn MessageSink>> {
        self.sub_types
            .get(&ShapeKey::new(message_type, sub_type))
            .or_else(|| self.families.get(&message_type))
    }

    /// Hand `envelope` to its sink
    ///
    /// On failure the envelope is dropped, returning its payload to the
    /// pool.
    pub fn route(&self, envelope: Envelope) -> Result<&str> {
        let (message_type, sub_type) = (envelope.message_type(), envelope.sub_type());
        let sink = self.resolve(message_type, sub_type).ok_or_else(|| {
            NetworkError::routing(format!("No route for {message_type}/{sub_type}"))
        })?;
        sink.enqueue_message(envelope);
        Ok(sink.name())
    }

    /// Check that every shape in `registry` resolves to a sink
    pub fn verify(&self, registry: &PayloadRegistry) -> Result<()> {
        let unrouted: Vec<String> = registry
            .keys()
            .into_iter()
            .filter(|key| self.resolve(key.message_type, key.sub_type).is_none())
            .map(|key| key.to_string())
            .collect();

        if unrouted.is_empty() {
            Ok(())
        } else {
            Err(NetworkError::routing(format!(
                "Registered shapes without a route: {}",
                unrouted.join(", ")
            )))
        }
    }

    pub fn len(&self) -> usize {
        self.families.len() + self.sub_types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for RoutingTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let families: BTreeMap<_, _> = self
            .families
            .iter()
            .map(|(mt, sink)| (*mt, sink.name()))
            .collect();
        let sub_types: BTreeMap<_, _> = self
            .sub_types
            .iter()
            .map(|(key, sink)| (*key, sink.name()))
            .collect();
        f.debug_struct("RoutingTable")
            .field("families", &families)
            .field("sub_types", &sub_types)
            .finish()
    }
}

/// Collects routes; duplicates surface from [`build`](Self::build)
#[derive(Default)]
pub struct RoutingTableBuilder {
    families: HashMap<MessageType, Arc<dyn MessageSink>>,
    sub_types: HashMap<ShapeKey, Arc<dyn MessageSink>>,
    errors: Vec<String>,
}

impl RoutingTableBuilder {
    /// Route a whole family
    pub fn route(mut self, message_type: MessageType, sink: Arc<dyn MessageSink>) -> Self {
        if let Some(existing) = self.families.get(&message_type) {
            self.errors.push(format!(
                "{message_type} already routed to {}",
                existing.name()
            ));
        } else {
            self.families.insert(message_type, sink);
        }
        self
    }

    /// Route one subtype of a family
    pub fn route_sub_type(
        mut self,
        message_type: MessageType,
        sub_type: impl Into<u16>,
        sink: Arc<dyn MessageSink>,
    ) -> Self {
        let key = ShapeKey::new(message_type, sub_type.into());
        if let Some(existing) = self.sub_types.get(&key) {
            self.errors
                .push(format!("{key} already routed to {}", existing.name()));
        } else {
            self.sub_types.insert(key, sink);
        }
        self
    }

    pub fn build(self) -> Result<RoutingTable> {
        if !self.errors.is_empty() {
            return Err(NetworkError::routing(self.errors.join("; ")));
        }
        Ok(RoutingTable {
            families: self.families,
            sub_types: self.sub_types,
        })
    }
}

/// One [`InboundQueue`] per subsystem plus the table routing to them
#[derive(Debug)]
pub struct SubsystemQueues {
    queues: BTreeMap<Subsystem, Arc<InboundQueue>>,
    routes: Arc<RoutingTable>,
}

impl SubsystemQueues {
    /// Queues for every shape `registry` can decode, verified complete
    pub fn for_registry(registry: &PayloadRegistry) -> Result<Self> {
        let mut queues: BTreeMap<Subsystem, Arc<InboundQueue>> = BTreeMap::new();
        let mut builder = RoutingTable::builder();
        let mut family_routed = Vec::new();

        for key in registry.keys() {
            let subsystem = Subsystem::of(key.message_type, key.sub_type);
            let queue = queues
                .entry(subsystem)
                .or_insert_with(|| Arc::new(InboundQueue::new(subsystem.to_string())))
                .clone();

            if subsystem.is_sub_routed() {
                builder = builder.route_sub_type(key.message_type, key.sub_type, queue);
            } else if !family_routed.contains(&key.message_type) {
                family_routed.push(key.message_type);
                builder = builder.route(key.message_type, queue);
            }
        }

        let routes = builder.build()?;
        routes.verify(registry)?;
        Ok(Self {
            queues,
            routes: Arc::new(routes),
        })
    }

    /// Queues for what a client receives: server traffic and server lists
    pub fn client() -> Result<Self> {
        let registry = PayloadRegistry::builder()
            .with_server_messages()
            .with_master_server()
            .build()?;
        Self::for_registry(&registry)
    }

    /// Queues for what a server receives from its clients
    pub fn server() -> Result<Self> {
        Self::for_registry(&PayloadRegistry::client_to_server()?)
    }

    pub fn queue(&self, subsystem: Subsystem) -> Option<&Arc<InboundQueue>> {
        self.queues.get(&subsystem)
    }

    pub fn subsystems(&self) -> impl Iterator<Item = Subsystem> + '_ {
        self.queues.keys().copied()
    }

    pub fn routes(&self) -> Arc<RoutingTable> {
        self.routes.clone()
    }

    /// Messages waiting across all queues
    pub fn pending(&self) -> usize {
        self.queues.values().map(|queue| queue.len()).sum()
    }
}

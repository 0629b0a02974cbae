//! Vessel family
//!
//! High-frequency per-vessel state (position, flight controls, periodic
//! proto/update snapshots) travels `Sequenced`: a late packet is worthless
//! once a newer one has arrived. Structural events (creation, docking,
//! removal) travel `ReliableOrdered`, as do part-module field syncs and
//! fairing deployments, which change state once and must not be skipped.

use crate::protocol::DeliveryCategory;
use uuid::Uuid;

define_payload! {
    VesselListRequest {}
}

define_payload! {
    /// Ids of every vessel the server stores
    VesselListReply {
        vessel_ids: Vec<Uuid>,
    }
}

define_payload! {
    /// Ask for full protos of the listed vessels
    VesselsRequest {
        vessel_ids: Vec<Uuid>,
    }
}

define_payload! {
    /// Periodic serialized vessel definition
    VesselProto {
        vessel_id: Uuid,
        game_time: f64,
        vessel_data: Vec<u8>,
    }
}

define_payload! {
    /// Vessel definition that must not be lost (creation)
    VesselProtoReliable {
        vessel_id: Uuid,
        game_time: f64,
        vessel_data: Vec<u8>,
    }
}

define_payload! {
    VesselDock {
        dominant_vessel_id: Uuid,
        weak_vessel_id: Uuid,
        subspace_id: i32,
        game_time: f64,
        final_vessel_data: Vec<u8>,
    }
}

define_payload! {
    VesselRemove {
        vessel_id: Uuid,
        add_to_kill_list: bool,
        game_time: f64,
    }
}

define_payload! {
    /// Orbital position sample
    VesselPosition {
        vessel_id: Uuid,
        body_index: i32,
        subspace_id: i32,
        latitude: f64,
        longitude: f64,
        altitude: f64,
        velocity: [f64; 3],
        rotation: [f32; 4],
        game_time: f64,
    }
}

define_payload! {
    /// Pilot control inputs
    VesselFlightState {
        vessel_id: Uuid,
        main_throttle: f32,
        pitch: f32,
        yaw: f32,
        roll: f32,
        game_time: f64,
    }
}

define_payload! {
    VesselUpdate {
        vessel_id: Uuid,
        name: String,
        vessel_type: String,
        situation: String,
        landed: bool,
        game_time: f64,
    }
}

define_payload! {
    VesselResource {
        vessel_id: Uuid,
        resource_names: Vec<String>,
        amounts: Vec<f64>,
        game_time: f64,
    }
}

define_payload! {
    /// One part-module field changed value
    VesselPartSync {
        vessel_id: Uuid,
        part_flight_id: u32,
        module_name: String,
        base_module_name: String,
        field_name: String,
        value: String,
        game_time: f64,
    }
}

define_payload! {
    /// A part's fairing was deployed
    VesselFairing {
        vessel_id: Uuid,
        part_flight_id: u32,
        game_time: f64,
    }
}

define_family! {
    /// Vessel state and lifecycle
    Vessel => VesselPayload, VesselMessageType {
        ListRequest = 0 => VesselListRequest,
        ListReply = 1 => VesselListReply,
        VesselsRequest = 2 => VesselsRequest,
        Proto = 3 => VesselProto,
        ProtoReliable = 4 => VesselProtoReliable,
        Dock = 5 => VesselDock,
        Remove = 6 => VesselRemove,
        Position = 7 => VesselPosition,
        FlightState = 8 => VesselFlightState,
        Update = 9 => VesselUpdate,
        Resource = 10 => VesselResource,
        PartSync = 11 => VesselPartSync,
        Fairing = 12 => VesselFairing,
    }
}

impl VesselMessageType {
    /// Per-SubType category selection for the vessel family
    pub fn delivery_category(self) -> DeliveryCategory {
        match self {
            VesselMessageType::Position
            | VesselMessageType::FlightState
            | VesselMessageType::Proto
            | VesselMessageType::Update
            | VesselMessageType::Resource => DeliveryCategory::Sequenced,
            VesselMessageType::ListRequest
            | VesselMessageType::ListReply
            | VesselMessageType::VesselsRequest
            | VesselMessageType::ProtoReliable
            | VesselMessageType::Dock
            | VesselMessageType::Remove
            | VesselMessageType::PartSync
            | VesselMessageType::Fairing => DeliveryCategory::ReliableOrdered,
        }
    }
}

impl VesselPayload {
    /// Vessel the message is about, when it names exactly one
    pub fn vessel_id(&self) -> Option<Uuid> {
        match self {
            VesselPayload::Proto(msg) => Some(msg.vessel_id),
            VesselPayload::ProtoReliable(msg) => Some(msg.vessel_id),
            VesselPayload::Dock(msg) => Some(msg.dominant_vessel_id),
            VesselPayload::Remove(msg) => Some(msg.vessel_id),
            VesselPayload::Position(msg) => Some(msg.vessel_id),
            VesselPayload::FlightState(msg) => Some(msg.vessel_id),
            VesselPayload::Update(msg) => Some(msg.vessel_id),
            VesselPayload::Resource(msg) => Some(msg.vessel_id),
            VesselPayload::PartSync(msg) => Some(msg.vessel_id),
            VesselPayload::Fairing(msg) => Some(msg.vessel_id),
            VesselPayload::ListRequest(_)
            | VesselPayload::ListReply(_)
            | VesselPayload::VesselsRequest(_) => None,
        }
    }
}

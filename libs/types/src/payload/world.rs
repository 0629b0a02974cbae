//! Shared-world families: scenario modules, kerbal roster, time warp
//! subspaces and space-center facilities.

define_payload! {
    ScenarioRequest {}
}

define_payload! {
    /// One serialized scenario module
    ScenarioData {
        module: String,
        data: Vec<u8>,
    }
}

define_family! {
    Scenario => ScenarioPayload, ScenarioMessageType {
        Request = 0 => ScenarioRequest,
        Data = 1 => ScenarioData,
    }
}

define_payload! {
    KerbalRequest {}
}

define_payload! {
    KerbalReply {
        kerbal_names: Vec<String>,
    }
}

define_payload! {
    KerbalProto {
        kerbal_name: String,
        kerbal_data: Vec<u8>,
    }
}

define_payload! {
    KerbalRemove {
        kerbal_name: String,
    }
}

define_family! {
    Kerbal => KerbalPayload, KerbalMessageType {
        Request = 0 => KerbalRequest,
        Reply = 1 => KerbalReply,
        Proto = 2 => KerbalProto,
        Remove = 3 => KerbalRemove,
    }
}

define_payload! {
    WarpSubspacesRequest {}
}

define_payload! {
    /// Known subspaces, index-aligned
    WarpSubspacesReply {
        subspace_keys: Vec<i32>,
        server_time_differences: Vec<f64>,
        player_names: Vec<String>,
    }
}

define_payload! {
    WarpNewSubspace {
        subspace_key: i32,
        server_time_difference: f64,
        player_creator: String,
    }
}

define_payload! {
    WarpChangeSubspace {
        player_name: String,
        subspace: i32,
    }
}

define_family! {
    /// Time warp subspace coordination
    Warp => WarpPayload, WarpMessageType {
        SubspacesRequest = 0 => WarpSubspacesRequest,
        SubspacesReply = 1 => WarpSubspacesReply,
        NewSubspace = 2 => WarpNewSubspace,
        ChangeSubspace = 3 => WarpChangeSubspace,
    }
}

define_payload! {
    FacilityCollapse {
        object_id: String,
    }
}

define_payload! {
    FacilityRepair {
        object_id: String,
    }
}

define_payload! {
    FacilityUpgrade {
        object_id: String,
        level: i32,
    }
}

define_family! {
    Facility => FacilityPayload, FacilityMessageType {
        Collapse = 0 => FacilityCollapse,
        Repair = 1 => FacilityRepair,
        Upgrade = 2 => FacilityUpgrade,
    }
}

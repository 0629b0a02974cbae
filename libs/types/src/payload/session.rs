//! Session-level families: handshake, server settings, MOTD, player presence
//! and administrator lists.

use uuid::Uuid;

define_payload! {
    /// Client opens a session
    HandshakeRequest {
        player_name: String,
        public_key: String,
    }
}

define_payload! {
    /// Server nonce the client must sign
    HandshakeChallenge {
        challenge: Vec<u8>,
    }
}

define_payload! {
    /// Signed answer to a challenge
    HandshakeResponse {
        player_name: String,
        public_key: String,
        challenge_signature: String,
    }
}

define_payload! {
    /// Server verdict on a handshake
    HandshakeReply {
        /// 0 = accepted, anything else is a rejection code
        response: u8,
        reason: String,
        mod_control: u8,
        server_start_time: i64,
        player_id: Uuid,
        mod_file_data: Vec<u8>,
    }
}

define_family! {
    /// Session establishment
    Handshake => HandshakePayload, HandshakeMessageType {
        Request = 0 => HandshakeRequest,
        Challenge = 1 => HandshakeChallenge,
        Response = 2 => HandshakeResponse,
        Reply = 3 => HandshakeReply,
    }
}

define_payload! {
    SettingsRequest {}
}

define_payload! {
    /// Server-wide gameplay settings
    SettingsReply {
        warp_mode: u8,
        game_mode: u8,
        allow_cheats: bool,
        max_players: u16,
        vessel_update_interval_ms: u32,
        secondary_update_interval_ms: u32,
        console_identifier: String,
    }
}

define_family! {
    Settings => SettingsPayload, SettingsMessageType {
        Request = 0 => SettingsRequest,
        Reply = 1 => SettingsReply,
    }
}

define_payload! {
    MotdRequest {}
}

define_payload! {
    MotdReply {
        message: String,
    }
}

define_family! {
    /// Message of the day
    Motd => MotdPayload, MotdMessageType {
        Request = 0 => MotdRequest,
        Reply = 1 => MotdReply,
    }
}

define_payload! {
    PlayerStatusRequest {}
}

define_payload! {
    /// Snapshot of every connected player's status, index-aligned
    PlayerStatusReply {
        player_names: Vec<String>,
        vessel_texts: Vec<String>,
        status_texts: Vec<String>,
    }
}

define_payload! {
    PlayerStatusSet {
        player_name: String,
        vessel_text: String,
        status_text: String,
    }
}

define_family! {
    PlayerStatus => PlayerStatusPayload, PlayerStatusMessageType {
        Request = 0 => PlayerStatusRequest,
        Reply = 1 => PlayerStatusReply,
        Set = 2 => PlayerStatusSet,
    }
}

define_payload! {
    /// A player joined or left the server
    PlayerConnectionChange {
        player_name: String,
        joined: bool,
    }
}

define_family! {
    /// Single-shape family, always SubType 0
    PlayerConnection => PlayerConnectionPayload, PlayerConnectionMessageType {
        Change = 0 => PlayerConnectionChange,
    }
}

define_payload! {
    AdminListRequest {}
}

define_payload! {
    AdminListReply {
        admins: Vec<String>,
    }
}

define_payload! {
    AdminAdd {
        player_name: String,
    }
}

define_payload! {
    AdminRemove {
        player_name: String,
    }
}

define_family! {
    Admin => AdminPayload, AdminMessageType {
        ListRequest = 0 => AdminListRequest,
        ListReply = 1 => AdminListReply,
        Add = 2 => AdminAdd,
        Remove = 3 => AdminRemove,
    }
}

//! Master server family
//!
//! Exchanged over unconnected datagrams between game servers, clients and the
//! server-list service, using the same envelope format as connected traffic.

define_payload! {
    /// Periodic announcement from a game server
    MasterServerRegister {
        id: i64,
        server_name: String,
        description: String,
        internal_endpoint: String,
        max_players: i32,
        player_count: i32,
        server_version: String,
        password: bool,
        cheats: bool,
        game_mode: u8,
    }
}

define_payload! {
    MasterServerRequestServers {
        current_version: String,
    }
}

define_payload! {
    /// One entry of the server list
    MasterServerReplyServers {
        id: i64,
        server_name: String,
        description: String,
        internal_endpoint: String,
        external_endpoint: String,
        max_players: i32,
        player_count: i32,
        server_version: String,
        password: bool,
        cheats: bool,
        game_mode: u8,
    }
}

define_payload! {
    /// Ask the master server to introduce us to a game server
    MasterServerIntroduction {
        id: i64,
        token: String,
        internal_endpoint: String,
    }
}

define_family! {
    MasterServer => MasterServerPayload, MasterServerMessageType {
        RegisterServer = 0 => MasterServerRegister,
        RequestServers = 1 => MasterServerRequestServers,
        ReplyServers = 2 => MasterServerReplyServers,
        Introduction = 3 => MasterServerIntroduction,
    }
}

//! Cross-player coordination families: ownership locks, player colors and
//! opaque mod traffic relayed between peers.

use num_enum::{IntoPrimitive, TryFromPrimitive};
use uuid::Uuid;

/// What a lock grants its holder
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
pub enum LockType {
    /// Pilot a vessel
    Control = 0,
    /// Send updates for a loaded vessel
    Update = 1,
    /// Send updates for a vessel outside physics range
    UnloadedUpdate = 2,
    Kerbal = 3,
    /// Spawns asteroids for the whole server
    Asteroid = 4,
    Spectator = 5,
    Contract = 6,
}

define_payload! {
    LockListRequest {}
}

define_payload! {
    /// Every held lock, index-aligned
    LockListReply {
        lock_types: Vec<u8>,
        player_names: Vec<String>,
        vessel_ids: Vec<Uuid>,
        kerbal_names: Vec<String>,
    }
}

define_payload! {
    /// Client request for a lock, echoed by the server with the outcome
    LockAcquire {
        lock_type: u8,
        player_name: String,
        vessel_id: Uuid,
        kerbal_name: String,
        force: bool,
        granted: bool,
    }
}

define_payload! {
    LockRelease {
        lock_type: u8,
        player_name: String,
        vessel_id: Uuid,
        kerbal_name: String,
        released: bool,
    }
}

define_family! {
    /// Vessel, kerbal and server-wide ownership locks
    Lock => LockPayload, LockMessageType {
        ListRequest = 0 => LockListRequest,
        ListReply = 1 => LockListReply,
        Acquire = 2 => LockAcquire,
        Release = 3 => LockRelease,
    }
}

impl LockAcquire {
    /// `None` when the peer sent a lock type this build does not know
    pub fn kind(&self) -> Option<LockType> {
        LockType::try_from(self.lock_type).ok()
    }
}

impl LockRelease {
    pub fn kind(&self) -> Option<LockType> {
        LockType::try_from(self.lock_type).ok()
    }
}

define_payload! {
    PlayerColorRequest {}
}

define_payload! {
    /// Every player's RGBA color, index-aligned
    PlayerColorReply {
        player_names: Vec<String>,
        colors: Vec<[f32; 4]>,
    }
}

define_payload! {
    PlayerColorSet {
        player_name: String,
        color: [f32; 4],
    }
}

define_family! {
    PlayerColor => PlayerColorPayload, PlayerColorMessageType {
        Request = 0 => PlayerColorRequest,
        Reply = 1 => PlayerColorReply,
        Set = 2 => PlayerColorSet,
    }
}

define_payload! {
    /// Opaque bytes addressed to a named mod
    ModData {
        mod_name: String,
        /// Server forwards the message to every other client
        relay: bool,
        data: Vec<u8>,
    }
}

define_family! {
    /// Single-shape family, always SubType 0
    Mod => ModPayload, ModMessageType {
        Data = 0 => ModData,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::{PayloadFields, WireReader, WireWriter};

    #[test]
    fn test_lock_kind() {
        let mut acquire = LockAcquire {
            lock_type: LockType::UnloadedUpdate.into(),
            ..Default::default()
        };
        assert_eq!(acquire.kind(), Some(LockType::UnloadedUpdate));
        acquire.lock_type = 42;
        assert_eq!(acquire.kind(), None);
    }

    #[test]
    fn test_color_array_has_no_count_prefix() {
        let set = PlayerColorSet {
            player_name: "bill".into(),
            color: [1.0, 0.5, 0.0, 1.0],
        };
        let mut body = Vec::new();
        set.write_fields(&mut WireWriter::new(&mut body)).unwrap();
        assert_eq!(body.len(), 4 + 4 + 4 * 4);
        assert_eq!(&body[8..12], &1.0f32.to_be_bytes());
    }

    #[test]
    fn test_color_reply_round_trip() {
        let reply = PlayerColorReply {
            player_names: vec!["bob".into(), "val".into()],
            colors: vec![[0.1, 0.2, 0.3, 1.0], [0.9, 0.8, 0.7, 0.5]],
        };
        let mut body = Vec::new();
        reply.write_fields(&mut WireWriter::new(&mut body)).unwrap();

        let mut decoded = PlayerColorReply::default();
        decoded.read_fields(&mut WireReader::new(&body)).unwrap();
        assert_eq!(decoded, reply);
    }

    #[test]
    fn test_mod_is_single_shape() {
        assert_eq!(ModMessageType::ALL, &[ModMessageType::Data]);
        assert_eq!(u16::from(ModMessageType::Data), 0);
    }
}

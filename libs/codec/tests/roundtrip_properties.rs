//! Property tests for the codec laws:
//! - deserialize(serialize(p)) == p, with and without compression
//! - requesting compression never produces a larger message
//! - header encode/decode is exact for every field value

use orbitlink_codec::{decode_header, encode_header, CodecPipeline, Envelope, PayloadRegistry};
use orbitlink_types::payload::chat::ChatChannelMessage;
use orbitlink_types::payload::session::{HandshakeReply, PlayerStatusReply, SettingsReply};
use orbitlink_types::payload::vessel::{VesselListReply, VesselPosition, VesselProto, VesselResource};
use orbitlink_types::payload::world::WarpSubspacesReply;
use orbitlink_types::{Payload, MAX_PAYLOAD_LENGTH};
use proptest::prelude::*;
use std::sync::Arc;
use uuid::Uuid;

fn pipeline() -> CodecPipeline {
    CodecPipeline::new(Arc::new(PayloadRegistry::complete().unwrap()))
}

fn chat_strategy() -> impl Strategy<Value = Payload> {
    (".{0,16}", ".{0,16}", ".{0,256}").prop_map(|(from, channel, text)| {
        ChatChannelMessage {
            from,
            channel,
            text,
        }
        .into()
    })
}

fn position_strategy() -> impl Strategy<Value = Payload> {
    (
        any::<u128>(),
        any::<i32>(),
        -90.0f64..90.0,
        -180.0f64..180.0,
        prop::array::uniform3(-1e5f64..1e5),
        prop::array::uniform4(-1.0f32..1.0),
        0.0f64..1e9,
    )
        .prop_map(|(id, body, lat, lon, velocity, rotation, time)| {
            VesselPosition {
                vessel_id: Uuid::from_u128(id),
                body_index: body,
                latitude: lat,
                longitude: lon,
                altitude: lat * 1000.0,
                velocity,
                rotation,
                game_time: time,
                ..Default::default()
            }
            .into()
        })
}

fn proto_strategy() -> impl Strategy<Value = Payload> {
    (
        any::<u128>(),
        prop_oneof![
            prop::collection::vec(any::<u8>(), 0..2048),
            (any::<u8>(), 0usize..4096).prop_map(|(b, n)| vec![b; n]),
        ],
    )
        .prop_map(|(id, vessel_data)| {
            VesselProto {
                vessel_id: Uuid::from_u128(id),
                game_time: 1.0,
                vessel_data,
            }
            .into()
        })
}

fn status_strategy() -> impl Strategy<Value = Payload> {
    prop::collection::vec(("[a-z]{1,12}", ".{0,24}"), 0..16).prop_map(|rows| {
        let (player_names, status_texts): (Vec<_>, Vec<_>) = rows.into_iter().unzip();
        PlayerStatusReply {
            vessel_texts: player_names.iter().map(|n| format!("{n}'s ship")).collect(),
            player_names,
            status_texts,
        }
        .into()
    })
}

fn vessel_list_strategy() -> impl Strategy<Value = Payload> {
    prop::collection::vec(any::<u128>(), 0..64).prop_map(|ids| {
        VesselListReply {
            vessel_ids: ids.into_iter().map(Uuid::from_u128).collect(),
        }
        .into()
    })
}

fn subspaces_strategy() -> impl Strategy<Value = Payload> {
    prop::collection::vec((any::<i32>(), -1e7f64..1e7, "[A-Za-z0-9_]{1,16}"), 0..24).prop_map(
        |rows| {
            let mut reply = WarpSubspacesReply::default();
            for (key, difference, player) in rows {
                reply.subspace_keys.push(key);
                reply.server_time_differences.push(difference);
                reply.player_names.push(player);
            }
            reply.into()
        },
    )
}

fn handshake_reply_strategy() -> impl Strategy<Value = Payload> {
    (
        any::<u8>(),
        ".{0,64}",
        any::<u8>(),
        any::<i64>(),
        any::<u128>(),
        prop::collection::vec(any::<u8>(), 0..512),
    )
        .prop_map(|(response, reason, mod_control, start, player, mod_file_data)| {
            HandshakeReply {
                response,
                reason,
                mod_control,
                server_start_time: start,
                player_id: Uuid::from_u128(player),
                mod_file_data,
            }
            .into()
        })
}

fn settings_reply_strategy() -> impl Strategy<Value = Payload> {
    (
        any::<u8>(),
        any::<u8>(),
        any::<bool>(),
        any::<u16>(),
        any::<u32>(),
        any::<u32>(),
        ".{0,8}",
    )
        .prop_map(
            |(warp_mode, game_mode, allow_cheats, max_players, primary, secondary, console)| {
                SettingsReply {
                    warp_mode,
                    game_mode,
                    allow_cheats,
                    max_players,
                    vessel_update_interval_ms: primary,
                    secondary_update_interval_ms: secondary,
                    console_identifier: console,
                }
                .into()
            },
        )
}

fn resource_strategy() -> impl Strategy<Value = Payload> {
    (
        any::<u128>(),
        prop::collection::vec(("[A-Za-z]{1,20}", 0.0f64..1e6), 0..32),
        0.0f64..1e9,
    )
        .prop_map(|(id, rows, game_time)| {
            let (resource_names, amounts) = rows.into_iter().unzip();
            VesselResource {
                vessel_id: Uuid::from_u128(id),
                resource_names,
                amounts,
                game_time,
            }
            .into()
        })
}

fn payload_strategy() -> impl Strategy<Value = Payload> {
    prop_oneof![
        chat_strategy(),
        position_strategy(),
        proto_strategy(),
        status_strategy(),
        vessel_list_strategy(),
        subspaces_strategy(),
        handshake_reply_strategy(),
        settings_reply_strategy(),
        resource_strategy(),
    ]
}

proptest! {
    #[test]
    fn prop_round_trip(payload in payload_strategy(), compress in any::<bool>()) {
        let pipeline = pipeline();
        let envelope = Envelope::detached(payload.clone());
        let bytes = pipeline.serialize(&envelope, compress).unwrap();
        let decoded = pipeline.decode_datagram(&bytes).unwrap();
        prop_assert_eq!(decoded.payload(), &payload);
        prop_assert_eq!(decoded.sent_at_ns(), envelope.sent_at_ns());
        prop_assert!(!decoded.version_mismatch());
    }

    #[test]
    fn prop_compression_never_worse(payload in payload_strategy()) {
        let pipeline = pipeline();
        let envelope = Envelope::detached(payload);
        let plain = pipeline.serialize(&envelope, false).unwrap();
        let packed = pipeline.serialize(&envelope, true).unwrap();
        prop_assert!(packed.len() <= plain.len());
    }

    #[test]
    fn prop_header_exact(
        message_type in any::<u16>(),
        sub_type in any::<u16>(),
        length in 0..=MAX_PAYLOAD_LENGTH,
        compressed in any::<bool>(),
    ) {
        let bytes = encode_header(message_type, sub_type, length as usize, compressed).unwrap();
        prop_assert_eq!(bytes.len(), 8);
        prop_assert_eq!(
            decode_header(&bytes).unwrap(),
            (message_type, sub_type, length as usize, compressed)
        );
    }
}

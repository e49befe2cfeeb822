//! Play-phase driver: the canned post-login packet burst and the dispatch of
//! inbound play packets.

use serde_json::json;
use tokio::net::tcp::OwnedReadHalf;
use tokio::sync::Notify;
use tracing::{debug, trace, warn};
use uuid::Uuid;

use crate::chunk;
use crate::consts::{
    BRAND_CHANNEL,
    BRAND_NAME,
    DIMENSION_OVERWORLD,
    INITIAL_TELEPORT_ID,
    VIEW_DISTANCE_MAX,
    VIEW_DISTANCE_MIN,
};
use crate::nbt::{NbtError, Tag, json_to_nbt};
use crate::network::packets::{
    ChunkData,
    ClientBound,
    ClientSettings,
    JoinGame,
    PlayerInfoEntry,
    ServerBound,
};
use crate::network::{FrameReader, Phase, ProtocolError};
use crate::player::{KeepaliveLedger, Pose};

/// Mutable play-phase state of one client.
pub struct PlaySession {
    pub username:           String,
    pub settings:           Option<ClientSettings>,
    pub pose:               Pose,
    pub teleport_confirmed: bool,
}

impl PlaySession {
    pub fn new(username: String) -> Self {
        Self {
            username,
            settings: None,
            pose: Pose::default(),
            teleport_confirmed: false,
        }
    }
}

/// The dimension registry sent with Join Game: one overworld entry, built
/// through the JSON-to-NBT mapping so the byte layout stays fixed.
pub fn registry_codec() -> Result<Tag, NbtError> {
    json_to_nbt(&json!({
        "minecraft:dimension_type": {
            "type": "minecraft:dimension_type",
            "value": [
                {
                    "name": DIMENSION_OVERWORLD,
                    "id": 0,
                    "element": {
                        "min_y": 0,
                        "height": 256,
                        "logical_height": 256,
                        "natural": true,
                        "has_skylight": true,
                        "bed_works": true,
                    },
                },
            ],
        },
    }))
}

/// The ten packets every fresh player receives, in order. Written back to
/// back before the keepalive clock starts.
pub fn join_burst(username: &str, uuid: Uuid) -> Result<Vec<ClientBound>, ProtocolError> {
    let join_game = JoinGame {
        entity_id:             1,
        is_hardcore:           false,
        game_mode:             1,
        previous_game_mode:    -1,
        dimension_names:       vec![DIMENSION_OVERWORLD.to_string()],
        registry_codec:        registry_codec()?,
        dimension_type:        DIMENSION_OVERWORLD.to_string(),
        dimension_name:        DIMENSION_OVERWORLD.to_string(),
        hashed_seed:           0,
        max_players:           0,
        view_distance:         10,
        simulation_distance:   10,
        reduced_debug_info:    false,
        enable_respawn_screen: true,
        is_debug:              false,
        is_flat:               false,
        death_location:        None,
        portal_cooldown:       0,
    };

    Ok(vec![
        ClientBound::JoinGame(Box::new(join_game)),
        ClientBound::SpawnPosition {
            x:     0,
            y:     0,
            z:     0,
            angle: 0.0,
        },
        ClientBound::PlayerPositionAndLook {
            x:           0.5,
            y:           65.0,
            z:           0.5,
            yaw:         0.0,
            pitch:       0.0,
            flags:       0,
            teleport_id: INITIAL_TELEPORT_ID,
            dismount:    false,
        },
        ClientBound::UpdateViewPosition {
            chunk_x: 0,
            chunk_z: 0,
        },
        ClientBound::ChunkData(ChunkData {
            chunk_x:                0,
            chunk_z:                0,
            heightmaps:             chunk::heightmap(),
            data:                   chunk::column_data(),
            block_entities:         vec![],
            trust_edges:            true,
            sky_light_mask:         vec![],
            block_light_mask:       vec![],
            empty_sky_light_mask:   vec![],
            empty_block_light_mask: vec![],
            light_arrays:           vec![],
        }),
        // Invulnerable, flying, fly allowed, creative.
        ClientBound::PlayerAbilities {
            flags:        0x0F,
            flying_speed: 0.05,
            fov_modifier: 0.1,
        },
        ClientBound::PlayerInfo {
            action:  0,
            entries: vec![PlayerInfoEntry {
                uuid,
                name: username.to_string(),
                game_mode: 1,
                ping: 0,
            }],
        },
        ClientBound::UpdateHealth {
            health:     20.0,
            food:       20,
            saturation: 5.0,
        },
        ClientBound::PluginMessage {
            channel: BRAND_CHANNEL.to_string(),
            data:    BRAND_NAME.as_bytes().to_vec(),
        },
        ClientBound::TimeUpdate {
            world_age:   0,
            time_of_day: 6000,
        },
    ])
}

/// Read and dispatch play packets until the peer leaves, the keepalive clock
/// signals a timeout, or a protocol error ends the session.
pub async fn play_loop(
    reader: &mut FrameReader<OwnedReadHalf>,
    ledger: &KeepaliveLedger,
    timed_out: &Notify,
    session: &mut PlaySession,
) -> Result<(), ProtocolError> {
    loop {
        let (id, payload) = tokio::select! {
            frame = reader.read_frame() => frame?,
            _ = timed_out.notified() => return Err(ProtocolError::KeepaliveTimeout),
        };

        let packet = ServerBound::decode(Phase::Play, id, &payload)?;
        dispatch(session, ledger, id, packet)?;
    }
}

fn dispatch(
    session: &mut PlaySession,
    ledger: &KeepaliveLedger,
    id: i32,
    packet: ServerBound,
) -> Result<(), ProtocolError> {
    match packet {
        ServerBound::TeleportConfirm { teleport_id } => {
            if teleport_id == INITIAL_TELEPORT_ID && !session.teleport_confirmed {
                session.teleport_confirmed = true;
                debug!("[PLAY] {} confirmed the initial teleport", session.username);
            } else {
                warn!(
                    "[PLAY] {} sent stray teleport confirm id {teleport_id}, ignoring",
                    session.username
                );
            }
        }

        ServerBound::ClientSettings(mut settings) => {
            settings.view_distance = settings.view_distance.clamp(VIEW_DISTANCE_MIN, VIEW_DISTANCE_MAX);
            debug!(
                "[PLAY] {} settings: locale {}, view distance {}",
                session.username, settings.locale, settings.view_distance
            );
            session.settings = Some(settings);
        }

        ServerBound::KeepAlive { id } => {
            ledger.acknowledge(id)?;
            trace!("[KEEPALIVE] {} answered id {id}", session.username);
        }

        ServerBound::PlayerPosition {
            x,
            feet_y,
            z,
            on_ground,
        } => {
            session.pose.x = x;
            session.pose.y = feet_y;
            session.pose.z = z;
            session.pose.on_ground = on_ground;
            trace!("[PLAY] {} moved to {}", session.username, session.pose);
        }

        ServerBound::PlayerPositionAndLook {
            x,
            feet_y,
            z,
            yaw,
            pitch,
            on_ground,
        } => {
            session.pose.x = x;
            session.pose.y = feet_y;
            session.pose.z = z;
            session.pose.yaw = yaw;
            session.pose.pitch = pitch;
            session.pose.on_ground = on_ground;
            trace!("[PLAY] {} moved to {}", session.username, session.pose);
        }

        ServerBound::PlayerLook {
            yaw,
            pitch,
            on_ground,
        } => {
            session.pose.yaw = yaw;
            session.pose.pitch = pitch;
            session.pose.on_ground = on_ground;
        }

        _ => {
            return Err(ProtocolError::UnexpectedPacket {
                phase: Phase::Play,
                id,
            });
        }
    }

    Ok(())
}

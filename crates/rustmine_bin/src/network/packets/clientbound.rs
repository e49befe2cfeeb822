use bytes::BytesMut;
use uuid::Uuid;

use crate::nbt::{self, Tag};
use crate::network::protocol::PacketWriter;
use crate::network::{ByteWritable, ProtocolError};

/// Join Game (0x28). Field order is fixed by the wire layout; the registry
/// codec travels as a named compound with the empty name.
#[derive(Debug, Clone)]
pub struct JoinGame {
    pub entity_id:            i32,
    pub is_hardcore:          bool,
    pub game_mode:            u8,
    pub previous_game_mode:   i8,
    pub dimension_names:      Vec<String>,
    pub registry_codec:       Tag,
    pub dimension_type:       String,
    pub dimension_name:       String,
    pub hashed_seed:          i64,
    pub max_players:          i32,
    pub view_distance:        i32,
    pub simulation_distance:  i32,
    pub reduced_debug_info:   bool,
    pub enable_respawn_screen: bool,
    pub is_debug:             bool,
    pub is_flat:              bool,
    pub death_location:       Option<(String, i64)>,
    pub portal_cooldown:      i32,
}

/// Chunk Data (0x22). The column bytes and heightmap tree come from the
/// generator and are carried opaquely.
#[derive(Debug, Clone)]
pub struct ChunkData {
    pub chunk_x:                i32,
    pub chunk_z:                i32,
    pub heightmaps:             Tag,
    pub data:                   Vec<u8>,
    pub block_entities:         Vec<Tag>,
    pub trust_edges:            bool,
    pub sky_light_mask:         Vec<i64>,
    pub block_light_mask:       Vec<i64>,
    pub empty_sky_light_mask:   Vec<i64>,
    pub empty_block_light_mask: Vec<i64>,
    pub light_arrays:           Vec<Vec<u8>>,
}

/// One row of the Player Info (0x36) Add action. Property records are never
/// emitted; every entry carries a zero-length property list.
#[derive(Debug, Clone)]
pub struct PlayerInfoEntry {
    pub uuid:      Uuid,
    pub name:      String,
    pub game_mode: i32,
    pub ping:      i32,
}

/// Every server-to-client packet the server encodes, across all phases.
#[derive(Debug, Clone)]
pub enum ClientBound {
    // Status 0x00
    StatusResponse { json: String },

    // Status 0x01
    StatusPong { token: i64 },

    // Login 0x02
    LoginSuccess { uuid: Uuid, username: String },

    // Login 0x03
    SetCompression { threshold: i32 },

    // Play 0x19
    PluginMessage { channel: String, data: Vec<u8> },

    // Play 0x22
    ChunkData(ChunkData),

    // Play 0x23
    KeepAlive { id: i64 },

    // Play 0x28
    JoinGame(Box<JoinGame>),

    // Play 0x32
    PlayerAbilities {
        flags:        u8,
        flying_speed: f32,
        fov_modifier: f32,
    },

    // Play 0x36
    PlayerInfo {
        action:  i32,
        entries: Vec<PlayerInfoEntry>,
    },

    // Play 0x38
    PlayerPositionAndLook {
        x:           f64,
        y:           f64,
        z:           f64,
        yaw:         f32,
        pitch:       f32,
        flags:       u8,
        teleport_id: i32,
        dismount:    bool,
    },

    // Play 0x49
    UpdateViewPosition { chunk_x: i32, chunk_z: i32 },

    // Play 0x4E
    SpawnPosition { x: i32, y: i32, z: i32, angle: f32 },

    // Play 0x52
    UpdateHealth {
        health:     f32,
        food:       i32,
        saturation: f32,
    },

    // Play 0x5E
    TimeUpdate { world_age: i64, time_of_day: i64 },
}

impl ClientBound {
    pub fn packet_id(&self) -> i32 {
        match self {
            Self::StatusResponse { .. } => 0x00,
            Self::StatusPong { .. } => 0x01,
            Self::LoginSuccess { .. } => 0x02,
            Self::SetCompression { .. } => 0x03,
            Self::PluginMessage { .. } => 0x19,
            Self::ChunkData(_) => 0x22,
            Self::KeepAlive { .. } => 0x23,
            Self::JoinGame(_) => 0x28,
            Self::PlayerAbilities { .. } => 0x32,
            Self::PlayerInfo { .. } => 0x36,
            Self::PlayerPositionAndLook { .. } => 0x38,
            Self::UpdateViewPosition { .. } => 0x49,
            Self::SpawnPosition { .. } => 0x4E,
            Self::UpdateHealth { .. } => 0x52,
            Self::TimeUpdate { .. } => 0x5E,
        }
    }

    /// Serialize the payload, without packet id or frame length.
    pub fn encode(&self) -> Result<BytesMut, ProtocolError> {
        let mut w = PacketWriter::new();

        match self {
            Self::StatusResponse { json } => {
                w.write_string(json);
            }

            Self::StatusPong { token } => {
                w.write_long(*token);
            }

            Self::LoginSuccess { uuid, username } => {
                w.write_uuid(uuid);
                w.write_string(username);
            }

            Self::SetCompression { threshold } => {
                w.write_varint(*threshold);
            }

            Self::PluginMessage { channel, data } => {
                w.write_string(channel);
                w.write_bytes(data);
            }

            Self::ChunkData(chunk) => {
                w.write_int(chunk.chunk_x);
                w.write_int(chunk.chunk_z);
                w.write_byte_array(nbt::to_named_bytes("", &chunk.heightmaps)?);
                w.write_byte_array(&chunk.data);
                w.write_varint(chunk.block_entities.len() as i32);
                for entity in &chunk.block_entities {
                    w.write_bytes(nbt::to_named_bytes("", entity)?);
                }
                w.write_bool(chunk.trust_edges);
                w.write_bitset(&chunk.sky_light_mask);
                w.write_bitset(&chunk.block_light_mask);
                w.write_bitset(&chunk.empty_sky_light_mask);
                w.write_bitset(&chunk.empty_block_light_mask);
                w.write_varint(chunk.light_arrays.len() as i32);
                for array in &chunk.light_arrays {
                    w.write_byte_array(array);
                }
            }

            Self::KeepAlive { id } => {
                w.write_long(*id);
            }

            Self::JoinGame(join) => {
                w.write_int(join.entity_id);
                w.write_bool(join.is_hardcore);
                w.write_byte(join.game_mode);
                w.write_sbyte(join.previous_game_mode);
                w.write_varint(join.dimension_names.len() as i32);
                for name in &join.dimension_names {
                    w.write_string(name);
                }
                w.write_bytes(nbt::to_named_bytes("", &join.registry_codec)?);
                w.write_string(&join.dimension_type);
                w.write_string(&join.dimension_name);
                w.write_long(join.hashed_seed);
                w.write_varint(join.max_players);
                w.write_varint(join.view_distance);
                w.write_varint(join.simulation_distance);
                w.write_bool(join.reduced_debug_info);
                w.write_bool(join.enable_respawn_screen);
                w.write_bool(join.is_debug);
                w.write_bool(join.is_flat);
                match &join.death_location {
                    Some((dimension, position)) => {
                        w.write_bool(true);
                        w.write_string(dimension);
                        w.write_long(*position);
                    }
                    None => w.write_bool(false),
                }
                w.write_varint(join.portal_cooldown);
            }

            Self::PlayerAbilities {
                flags,
                flying_speed,
                fov_modifier,
            } => {
                w.write_byte(*flags);
                w.write_float(*flying_speed);
                w.write_float(*fov_modifier);
            }

            Self::PlayerInfo { action, entries } => {
                w.write_varint(*action);
                w.write_varint(entries.len() as i32);
                for entry in entries {
                    w.write_uuid(&entry.uuid);
                    w.write_string(&entry.name);
                    w.write_varint(0); // properties
                    w.write_varint(entry.game_mode);
                    w.write_varint(entry.ping);
                    w.write_bool(false); // display name
                }
            }

            Self::PlayerPositionAndLook {
                x,
                y,
                z,
                yaw,
                pitch,
                flags,
                teleport_id,
                dismount,
            } => {
                w.write_double(*x);
                w.write_double(*y);
                w.write_double(*z);
                w.write_float(*yaw);
                w.write_float(*pitch);
                w.write_byte(*flags);
                w.write_varint(*teleport_id);
                w.write_bool(*dismount);
            }

            Self::UpdateViewPosition { chunk_x, chunk_z } => {
                w.write_varint(*chunk_x);
                w.write_varint(*chunk_z);
            }

            Self::SpawnPosition { x, y, z, angle } => {
                w.write_position(*x, *y, *z);
                w.write_float(*angle);
            }

            Self::UpdateHealth {
                health,
                food,
                saturation,
            } => {
                w.write_float(*health);
                w.write_varint(*food);
                w.write_float(*saturation);
            }

            Self::TimeUpdate {
                world_age,
                time_of_day,
            } => {
                w.write_long(*world_age);
                w.write_long(*time_of_day);
            }
        }

        Ok(w.finish())
    }
}

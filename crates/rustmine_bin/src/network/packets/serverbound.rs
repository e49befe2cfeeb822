use crate::network::protocol::PacketReader;
use crate::network::{Phase, ProtocolError};

/// Where a handshake sends the connection next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextState {
    Status,
    Login,
}

/// Client settings as sent by the play-phase client. Stored on the
/// connection; never answered.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientSettings {
    pub locale:                 String,
    pub view_distance:          i8,
    pub chat_mode:              i32,
    pub chat_colors:            bool,
    pub skin_parts:             u8,
    pub main_hand:              i32,
    pub text_filtering_enabled: bool,
}

/// Every client-to-server packet the server decodes, across all phases.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerBound {
    // Handshaking 0x00
    Handshake {
        protocol: i32,
        host:     String,
        port:     u16,
        next:     NextState,
    },

    // Status 0x00
    StatusRequest,

    // Status 0x01
    StatusPing { token: i64 },

    // Login 0x00
    LoginStart { username: String },

    // Play 0x00
    TeleportConfirm { teleport_id: i32 },

    // Play 0x08
    ClientSettings(ClientSettings),

    // Play 0x10
    KeepAlive { id: i64 },

    // Play 0x13
    PlayerPosition {
        x:         f64,
        feet_y:    f64,
        z:         f64,
        on_ground: bool,
    },

    // Play 0x14
    PlayerPositionAndLook {
        x:         f64,
        feet_y:    f64,
        z:         f64,
        yaw:       f32,
        pitch:     f32,
        on_ground: bool,
    },

    // Play 0x15
    PlayerLook {
        yaw:       f32,
        pitch:     f32,
        on_ground: bool,
    },
}

impl ServerBound {
    /// Decode a payload against the packet vocabulary of `phase`. An id the
    /// phase does not know is fatal for the connection.
    pub fn decode(phase: Phase, id: i32, payload: &[u8]) -> Result<Self, ProtocolError> {
        let mut reader = PacketReader::new(payload);

        match (phase, id) {
            (Phase::Handshaking, 0x00) => {
                let protocol = reader.read_varint()?;
                let host = reader.read_string()?;
                let port = reader.read_unsigned_short()?;
                let next = match reader.read_varint()? {
                    1 => NextState::Status,
                    2 => NextState::Login,
                    _ => return Err(ProtocolError::MalformedPacket),
                };
                Ok(Self::Handshake {
                    protocol,
                    host,
                    port,
                    next,
                })
            }

            (Phase::Status, 0x00) => Ok(Self::StatusRequest),

            (Phase::Status, 0x01) => Ok(Self::StatusPing {
                token: reader.read_long()?,
            }),

            (Phase::Login, 0x00) => {
                let username = reader.read_string()?;
                if username.is_empty() || username.len() > 16 {
                    return Err(ProtocolError::MalformedPacket);
                }
                Ok(Self::LoginStart { username })
            }

            (Phase::Play, 0x00) => Ok(Self::TeleportConfirm {
                teleport_id: reader.read_varint()?,
            }),

            (Phase::Play, 0x08) => Ok(Self::ClientSettings(ClientSettings {
                locale:                 reader.read_string()?,
                view_distance:          reader.read_sbyte()?,
                chat_mode:              reader.read_varint()?,
                chat_colors:            reader.read_bool()?,
                skin_parts:             reader.read_byte()?,
                main_hand:              reader.read_varint()?,
                text_filtering_enabled: reader.read_bool()?,
            })),

            (Phase::Play, 0x10) => Ok(Self::KeepAlive {
                id: reader.read_long()?,
            }),

            (Phase::Play, 0x13) => Ok(Self::PlayerPosition {
                x:         reader.read_double()?,
                feet_y:    reader.read_double()?,
                z:         reader.read_double()?,
                on_ground: reader.read_bool()?,
            }),

            (Phase::Play, 0x14) => Ok(Self::PlayerPositionAndLook {
                x:         reader.read_double()?,
                feet_y:    reader.read_double()?,
                z:         reader.read_double()?,
                yaw:       reader.read_float()?,
                pitch:     reader.read_float()?,
                on_ground: reader.read_bool()?,
            }),

            (Phase::Play, 0x15) => Ok(Self::PlayerLook {
                yaw:       reader.read_float()?,
                pitch:     reader.read_float()?,
                on_ground: reader.read_bool()?,
            }),

            _ => Err(ProtocolError::UnknownPacket { phase, id }),
        }
    }
}

pub mod framing;
pub mod packets;
pub mod protocol;

use bytes::BytesMut;
use thiserror::Error;
use uuid::Uuid;

use crate::nbt::NbtError;
pub use crate::network::framing::{FrameReader, FrameWriter};
pub use crate::network::protocol::{
    PacketReader,
    PacketWriter,
    pack_position,
    read_varint,
    unpack_position,
    write_varint,
};

/// Protocol phase of a connection. The phase fixes which packet ids are
/// legal in each direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Handshaking,
    Status,
    Login,
    Play,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Handshaking => write!(f, "Handshaking"),
            Self::Status => write!(f, "Status"),
            Self::Login => write!(f, "Login"),
            Self::Play => write!(f, "Play"),
        }
    }
}

/// Every way a connection can fail below the accept loop. The state machine
/// turns any of these into connection close plus a single log line.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("VarInt longer than five bytes")]
    BadVarInt,

    #[error("frame ended mid-read")]
    TruncatedFrame,

    #[error("frame of {0} bytes exceeds the cap")]
    FrameTooLarge(usize),

    #[error("zlib inflate failed: {0}")]
    DecompressError(std::io::Error),

    #[error("decompressed to {actual} bytes, header claimed {expected}")]
    DecompressedSizeMismatch { expected: usize, actual: usize },

    #[error("unknown packet id 0x{id:02X} in phase {phase}")]
    UnknownPacket { phase: Phase, id: i32 },

    #[error("malformed packet payload")]
    MalformedPacket,

    #[error("packet id 0x{id:02X} not expected in phase {phase}")]
    UnexpectedPacket { phase: Phase, id: i32 },

    #[error("keepalive reply with no matching outstanding id")]
    KeepaliveMismatch,

    #[error("timeout")]
    KeepaliveTimeout,

    #[error("connection closed by peer")]
    IoClosed,

    #[error(transparent)]
    Nbt(#[from] NbtError),
}

impl ProtocolError {
    /// Bare kind name, used for the one warning line per dead connection.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::BadVarInt => "BadVarInt",
            Self::TruncatedFrame => "TruncatedFrame",
            Self::FrameTooLarge(_) => "FrameTooLarge",
            Self::DecompressError(_) => "DecompressError",
            Self::DecompressedSizeMismatch { .. } => "DecompressedSizeMismatch",
            Self::UnknownPacket { .. } => "UnknownPacket",
            Self::MalformedPacket => "MalformedPacket",
            Self::UnexpectedPacket { .. } => "UnexpectedPacket",
            Self::KeepaliveMismatch => "KeepaliveMismatch",
            Self::KeepaliveTimeout => "KeepaliveTimeout",
            Self::IoClosed => "IoClosed",
            Self::Nbt(e) => e.kind(),
        }
    }
}

pub trait ByteWritable {
    fn write_varint<N: Into<i32>>(&mut self, value: N);

    fn write_string<S: AsRef<str>>(&mut self, s: S);

    fn write_byte<N: Into<u8>>(&mut self, value: N);

    fn write_sbyte<N: Into<i8>>(&mut self, value: N);

    fn write_short<N: Into<i16>>(&mut self, value: N);

    fn write_unsigned_short<N: Into<u16>>(&mut self, value: N);

    fn write_int<N: Into<i32>>(&mut self, value: N);

    fn write_long<N: Into<i64>>(&mut self, value: N);

    fn write_float<N: Into<f32>>(&mut self, value: N);

    fn write_double<N: Into<f64>>(&mut self, value: N);

    fn write_bool<B: Into<bool>>(&mut self, value: B);

    fn write_uuid(&mut self, uuid: &Uuid);

    fn write_bytes<A: AsRef<[u8]>>(&mut self, bytes: A);

    /// VarInt byte-count prefix followed by the raw bytes.
    fn write_byte_array<A: AsRef<[u8]>>(&mut self, bytes: A);

    /// `VarInt N` followed by `N` big-endian longs.
    fn write_bitset(&mut self, words: &[i64]);

    /// Block position packed into one long.
    fn write_position(&mut self, x: i32, y: i32, z: i32);

    fn finish(self) -> BytesMut;
}

//! NBT: Minecraft's self-describing big-endian tagged tree format.
//!
//! One `Tag` enum covers the 13 tag kinds. Compound children keep their
//! insertion order on write; `List` carries its element tag id so empty and
//! homogeneous lists serialize exactly.

mod decode;
mod encode;
mod json;

use std::io::{Read, Write};

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use thiserror::Error;

pub use decode::from_named_bytes;
pub use encode::to_named_bytes;
pub use json::json_to_nbt;

/// Tag names (and string payloads) are length-prefixed; names are capped at
/// this many bytes.
pub const MAX_NAME_LEN: usize = 32767;

#[derive(Debug, Error)]
pub enum NbtError {
    #[error("bad NBT tag id {0}")]
    BadTagId(u8),

    #[error("list elements have mixed tag types")]
    MixedListTypes,

    #[error("NBT name of {0} bytes exceeds the limit")]
    NameTooLong(usize),

    #[error("invalid UTF-8 in NBT data")]
    InvalidUtf8,

    #[error("truncated NBT data")]
    Truncated,

    #[error("value has no NBT mapping")]
    UnsupportedValue,
}

impl NbtError {
    /// Bare kind name, for one-line error reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::BadTagId(_) => "BadTagId",
            Self::MixedListTypes => "MixedListTypes",
            Self::NameTooLong(_) => "NameTooLong",
            Self::InvalidUtf8 => "InvalidUtf8",
            Self::Truncated => "NbtTruncated",
            Self::UnsupportedValue => "UnsupportedValue",
        }
    }
}

/// Wire id of each tag kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TagId {
    End       = 0,
    Byte      = 1,
    Short     = 2,
    Int       = 3,
    Long      = 4,
    Float     = 5,
    Double    = 6,
    ByteArray = 7,
    String    = 8,
    List      = 9,
    Compound  = 10,
    IntArray  = 11,
    LongArray = 12,
}

impl TagId {
    pub fn from_u8(id: u8) -> Result<Self, NbtError> {
        match id {
            0 => Ok(Self::End),
            1 => Ok(Self::Byte),
            2 => Ok(Self::Short),
            3 => Ok(Self::Int),
            4 => Ok(Self::Long),
            5 => Ok(Self::Float),
            6 => Ok(Self::Double),
            7 => Ok(Self::ByteArray),
            8 => Ok(Self::String),
            9 => Ok(Self::List),
            10 => Ok(Self::Compound),
            11 => Ok(Self::IntArray),
            12 => Ok(Self::LongArray),
            other => Err(NbtError::BadTagId(other)),
        }
    }
}

/// A single NBT tag. Names live in the enclosing `Compound` entry or the
/// named top-level framing, never in the tag itself.
#[derive(Debug, Clone, PartialEq)]
pub enum Tag {
    End,
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    ByteArray(Vec<u8>),
    String(String),
    List { elem: TagId, items: Vec<Tag> },
    Compound(Vec<(String, Tag)>),
    IntArray(Vec<i32>),
    LongArray(Vec<i64>),
}

impl Tag {
    pub fn id(&self) -> TagId {
        match self {
            Self::End => TagId::End,
            Self::Byte(_) => TagId::Byte,
            Self::Short(_) => TagId::Short,
            Self::Int(_) => TagId::Int,
            Self::Long(_) => TagId::Long,
            Self::Float(_) => TagId::Float,
            Self::Double(_) => TagId::Double,
            Self::ByteArray(_) => TagId::ByteArray,
            Self::String(_) => TagId::String,
            Self::List { .. } => TagId::List,
            Self::Compound(_) => TagId::Compound,
            Self::IntArray(_) => TagId::IntArray,
            Self::LongArray(_) => TagId::LongArray,
        }
    }

    /// Child lookup on a `Compound`; `None` for any other kind.
    pub fn get(&self, name: &str) -> Option<&Tag> {
        match self {
            Self::Compound(entries) => entries.iter().find(|(n, _)| n == name).map(|(_, t)| t),
            _ => None,
        }
    }
}

/// Serialize a sequence of named tags as one document, optionally wrapped in
/// gzip. When no level is given it scales with the document size: under
/// 100 KiB the cheapest setting wins, under 10 MiB a middle one, above that
/// the near-maximum.
pub fn serialize_document(
    tags: &[(String, Tag)],
    compress: bool,
    level: Option<u32>,
) -> Result<Vec<u8>, NbtError> {
    let mut raw = Vec::new();
    for (name, tag) in tags {
        raw.extend_from_slice(&to_named_bytes(name, tag)?);
    }

    if !compress {
        return Ok(raw);
    }

    let level = level.unwrap_or(if raw.len() < 100 * 1024 {
        1
    } else if raw.len() < 10 * 1024 * 1024 {
        5
    } else {
        6
    });

    let mut encoder = GzEncoder::new(Vec::new(), Compression::new(level));
    encoder.write_all(&raw).map_err(|_| NbtError::Truncated)?;
    encoder.finish().map_err(|_| NbtError::Truncated)
}

/// Inverse of [`serialize_document`].
pub fn deserialize(data: &[u8], compressed: bool) -> Result<Vec<(String, Tag)>, NbtError> {
    let raw;
    let data = if compressed {
        let mut decoder = GzDecoder::new(data);
        let mut out = Vec::new();
        decoder.read_to_end(&mut out).map_err(|_| NbtError::Truncated)?;
        raw = out;
        raw.as_slice()
    } else {
        data
    };

    let mut tags = Vec::new();
    let mut pos = 0;
    while pos < data.len() {
        let (named, consumed) = from_named_bytes(&data[pos..])?;
        tags.push(named);
        pos += consumed;
    }
    Ok(tags)
}

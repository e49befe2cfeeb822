//! Primitive wire codec: VarInts, length-prefixed strings and arrays,
//! big-endian scalars, packed block positions.

use bytes::{BufMut, BytesMut};
use smallvec::SmallVec;
use uuid::Uuid;

use crate::network::{ByteWritable, ProtocolError};

/// Low 7 payload bits of a VarInt group.
const SEGMENT_BITS: u32 = 0x7F;

/// Continuation flag of a VarInt group.
const CONTINUE_BIT: u8 = 0x80;

/// Encode a VarInt: base-128, little-endian groups, at most five bytes.
#[must_use]
pub fn write_varint(value: i32) -> SmallVec<[u8; 5]> {
    let mut out: SmallVec<[u8; 5]> = SmallVec::new_const();
    let mut v = value as u32;

    loop {
        let mut b = (v & SEGMENT_BITS) as u8;
        v >>= 7;
        if v != 0 {
            b |= CONTINUE_BIT;
        }
        out.push(b);
        if v == 0 {
            break;
        }
    }

    out
}

/// Decode exactly one VarInt starting at byte offset `at`. Returns the value
/// and the number of bytes consumed. Consumes nothing past the terminating
/// byte, whatever else the buffer holds.
pub fn read_varint(buf: &[u8], at: usize) -> Result<(i32, usize), ProtocolError> {
    let mut value: u32 = 0;

    for i in 0..5 {
        let Some(&b) = buf.get(at + i) else {
            return Err(ProtocolError::BadVarInt);
        };
        value |= (u32::from(b) & SEGMENT_BITS) << (7 * i);
        if b & CONTINUE_BIT == 0 {
            return Ok((value as i32, i + 1));
        }
    }

    Err(ProtocolError::BadVarInt)
}

/// Pack a block position: signed 26-bit X, signed 26-bit Z, 12-bit Y.
#[must_use]
pub const fn pack_position(x: i32, y: i32, z: i32) -> i64 {
    ((x as i64 & 0x3FF_FFFF) << 38) | ((z as i64 & 0x3FF_FFFF) << 12) | (y as i64 & 0xFFF)
}

/// Inverse of [`pack_position`]. X and Z are sign-extended from 26 bits;
/// Y occupies the low 12 bits unsigned.
#[must_use]
pub const fn unpack_position(packed: i64) -> (i32, i32, i32) {
    let x = (packed >> 38) as i32;
    let z = ((packed << 26) >> 38) as i32;
    let y = (packed & 0xFFF) as i32;
    (x, y, z)
}

pub struct PacketWriter {
    data: BytesMut,
}

impl Default for PacketWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl PacketWriter {
    pub fn new() -> Self {
        Self {
            data: BytesMut::new(),
        }
    }
}

impl ByteWritable for PacketWriter {
    fn write_varint<N: Into<i32>>(&mut self, value: N) {
        self.data.extend_from_slice(&write_varint(value.into()));
    }

    fn write_string<S: AsRef<str>>(&mut self, s: S) {
        let bytes = s.as_ref().as_bytes();
        self.write_varint(bytes.len() as i32);
        self.data.extend_from_slice(bytes);
    }

    fn write_byte<N: Into<u8>>(&mut self, value: N) {
        self.data.put_u8(value.into());
    }

    fn write_sbyte<N: Into<i8>>(&mut self, value: N) {
        self.data.put_i8(value.into());
    }

    fn write_short<N: Into<i16>>(&mut self, value: N) {
        self.data.extend_from_slice(&value.into().to_be_bytes());
    }

    fn write_unsigned_short<N: Into<u16>>(&mut self, value: N) {
        self.data.extend_from_slice(&value.into().to_be_bytes());
    }

    fn write_int<N: Into<i32>>(&mut self, value: N) {
        self.data.extend_from_slice(&value.into().to_be_bytes());
    }

    fn write_long<N: Into<i64>>(&mut self, value: N) {
        self.data.extend_from_slice(&value.into().to_be_bytes());
    }

    fn write_float<N: Into<f32>>(&mut self, value: N) {
        self.data.extend_from_slice(&value.into().to_be_bytes());
    }

    fn write_double<N: Into<f64>>(&mut self, value: N) {
        self.data.extend_from_slice(&value.into().to_be_bytes());
    }

    fn write_bool<B: Into<bool>>(&mut self, value: B) {
        self.data.put_u8(if value.into() { 1 } else { 0 });
    }

    fn write_uuid(&mut self, uuid: &Uuid) {
        self.data.extend_from_slice(uuid.as_bytes());
    }

    fn write_bytes<A: AsRef<[u8]>>(&mut self, bytes: A) {
        self.data.extend_from_slice(bytes.as_ref());
    }

    fn write_byte_array<A: AsRef<[u8]>>(&mut self, bytes: A) {
        let bytes = bytes.as_ref();
        self.write_varint(bytes.len() as i32);
        self.data.extend_from_slice(bytes);
    }

    fn write_bitset(&mut self, words: &[i64]) {
        self.write_varint(words.len() as i32);
        for word in words {
            self.data.extend_from_slice(&word.to_be_bytes());
        }
    }

    fn write_position(&mut self, x: i32, y: i32, z: i32) {
        self.data.extend_from_slice(&pack_position(x, y, z).to_be_bytes());
    }

    fn finish(self) -> BytesMut {
        self.data
    }
}

pub struct PacketReader<'a> {
    data: &'a [u8],
    pos:  usize,
}

impl<'a> PacketReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], ProtocolError> {
        if self.remaining() < n {
            return Err(ProtocolError::MalformedPacket);
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn read_varint(&mut self) -> Result<i32, ProtocolError> {
        let (value, consumed) = read_varint(self.data, self.pos)?;
        self.pos += consumed;
        Ok(value)
    }

    pub fn read_string(&mut self) -> Result<String, ProtocolError> {
        let len = self.read_varint()?;
        if len < 0 {
            return Err(ProtocolError::MalformedPacket);
        }
        let bytes = self.take(len as usize)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| ProtocolError::MalformedPacket)
    }

    pub fn read_byte(&mut self) -> Result<u8, ProtocolError> {
        Ok(self.take(1)?[0])
    }

    pub fn read_sbyte(&mut self) -> Result<i8, ProtocolError> {
        Ok(self.take(1)?[0] as i8)
    }

    pub fn read_short(&mut self) -> Result<i16, ProtocolError> {
        Ok(i16::from_be_bytes(self.take(2)?.try_into().unwrap()))
    }

    pub fn read_unsigned_short(&mut self) -> Result<u16, ProtocolError> {
        Ok(u16::from_be_bytes(self.take(2)?.try_into().unwrap()))
    }

    pub fn read_int(&mut self) -> Result<i32, ProtocolError> {
        Ok(i32::from_be_bytes(self.take(4)?.try_into().unwrap()))
    }

    pub fn read_long(&mut self) -> Result<i64, ProtocolError> {
        Ok(i64::from_be_bytes(self.take(8)?.try_into().unwrap()))
    }

    pub fn read_float(&mut self) -> Result<f32, ProtocolError> {
        Ok(f32::from_be_bytes(self.take(4)?.try_into().unwrap()))
    }

    pub fn read_double(&mut self) -> Result<f64, ProtocolError> {
        Ok(f64::from_be_bytes(self.take(8)?.try_into().unwrap()))
    }

    pub fn read_bool(&mut self) -> Result<bool, ProtocolError> {
        Ok(self.read_byte()? != 0)
    }

    pub fn read_uuid(&mut self) -> Result<Uuid, ProtocolError> {
        let bytes: [u8; 16] = self.take(16)?.try_into().unwrap();
        Ok(Uuid::from_bytes(bytes))
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>, ProtocolError> {
        Ok(self.take(len)?.to_vec())
    }

    /// All bytes left in the payload.
    pub fn read_rest(&mut self) -> Vec<u8> {
        let rest = self.data[self.pos..].to_vec();
        self.pos = self.data.len();
        rest
    }
}

//! The length-prefixed frame envelope, with optional per-connection zlib
//! compression.
//!
//! Uncompressed: `VarInt length · VarInt packet-id · payload`.
//! Compressed:   `VarInt length · VarInt uncompressed-length · body`, where a
//! zero uncompressed-length marks a raw body and anything else a deflated one
//! that must inflate to exactly that size.

use std::io::{Read, Write};

use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::consts::NETWORK_MAX_FRAME_BYTES;
use crate::network::protocol::{read_varint, write_varint};
use crate::network::ProtocolError;

const CONTINUE_BIT: u8 = 0x80;

// Whatever the exact io cause, the socket is unusable from here on.
fn map_io(_err: std::io::Error) -> ProtocolError {
    ProtocolError::IoClosed
}

/// Reads frames off one half of a connection. The compression threshold is
/// shared with the peer via SetCompression; negative means disabled.
pub struct FrameReader<R> {
    reader:    R,
    threshold: i32,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            threshold: -1,
        }
    }

    pub fn set_threshold(&mut self, threshold: i32) {
        self.threshold = threshold;
    }

    /// Read one frame and return `(packet_id, payload)`.
    ///
    /// EOF on a frame boundary is the peer hanging up; EOF anywhere inside a
    /// frame is a protocol error.
    pub async fn read_frame(&mut self) -> Result<(i32, Vec<u8>), ProtocolError> {
        let length = self.read_length().await?;
        if length > NETWORK_MAX_FRAME_BYTES {
            return Err(ProtocolError::FrameTooLarge(length));
        }

        let mut body = vec![0u8; length];
        self.reader.read_exact(&mut body).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                ProtocolError::TruncatedFrame
            } else {
                map_io(e)
            }
        })?;

        let body = if self.threshold >= 0 {
            decompress_body(&body)?
        } else {
            body
        };

        let (packet_id, consumed) = read_varint(&body, 0)?;
        Ok((packet_id, body[consumed..].to_vec()))
    }

    /// Read the frame length VarInt one byte at a time, so exactly the bytes
    /// of a single VarInt are consumed off the stream.
    async fn read_length(&mut self) -> Result<usize, ProtocolError> {
        let mut value: u32 = 0;

        for i in 0..5 {
            let b = match self.reader.read_u8().await {
                Ok(b) => b,
                Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    if i == 0 {
                        // Clean close between frames.
                        return Err(ProtocolError::IoClosed);
                    }
                    return Err(ProtocolError::TruncatedFrame);
                }
                Err(e) => return Err(map_io(e)),
            };

            value |= u32::from(b & 0x7F) << (7 * i);
            if b & CONTINUE_BIT == 0 {
                return Ok(value as usize);
            }
        }

        Err(ProtocolError::BadVarInt)
    }
}

fn decompress_body(body: &[u8]) -> Result<Vec<u8>, ProtocolError> {
    let (uncompressed_len, consumed) = read_varint(body, 0)?;
    let rest = &body[consumed..];

    if uncompressed_len == 0 {
        return Ok(rest.to_vec());
    }
    if uncompressed_len < 0 || uncompressed_len as usize > NETWORK_MAX_FRAME_BYTES {
        return Err(ProtocolError::FrameTooLarge(uncompressed_len as usize));
    }

    let expected = uncompressed_len as usize;
    let mut inflated = Vec::with_capacity(expected);
    ZlibDecoder::new(rest)
        .read_to_end(&mut inflated)
        .map_err(ProtocolError::DecompressError)?;

    if inflated.len() != expected {
        return Err(ProtocolError::DecompressedSizeMismatch {
            expected,
            actual: inflated.len(),
        });
    }
    Ok(inflated)
}

/// Writes frames onto one half of a connection.
pub struct FrameWriter<W> {
    writer:    W,
    threshold: i32,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            threshold: -1,
        }
    }

    pub fn set_threshold(&mut self, threshold: i32) {
        self.threshold = threshold;
    }

    /// Frame and send one packet. Packets strictly below the threshold go out
    /// raw with a zero uncompressed-length marker; at or above it the body is
    /// deflated and prefixed with its true size.
    pub async fn write_frame(&mut self, packet_id: i32, payload: &[u8]) -> Result<(), ProtocolError> {
        let mut body = write_varint(packet_id).to_vec();
        body.extend_from_slice(payload);

        let frame = if self.threshold >= 0 {
            let inner = if body.len() < self.threshold as usize {
                let mut inner = write_varint(0).to_vec();
                inner.extend_from_slice(&body);
                inner
            } else {
                let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
                encoder.write_all(&body).map_err(map_io)?;
                let deflated = encoder.finish().map_err(map_io)?;
                let mut inner = write_varint(body.len() as i32).to_vec();
                inner.extend_from_slice(&deflated);
                inner
            };
            let mut frame = write_varint(inner.len() as i32).to_vec();
            frame.extend_from_slice(&inner);
            frame
        } else {
            let mut frame = write_varint(body.len() as i32).to_vec();
            frame.extend_from_slice(&body);
            frame
        };

        self.writer.write_all(&frame).await.map_err(map_io)?;
        self.writer.flush().await.map_err(map_io)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn round_trip(threshold: i32, packet_id: i32, payload: &[u8]) -> (i32, Vec<u8>) {
        let mut writer = FrameWriter::new(Vec::new());
        writer.set_threshold(threshold);
        writer.write_frame(packet_id, payload).await.unwrap();
        let wire = writer.writer;

        let mut reader = FrameReader::new(wire.as_slice());
        reader.set_threshold(threshold);
        reader.read_frame().await.unwrap()
    }

    #[tokio::test]
    async fn test_round_trip_uncompressed() {
        let payload = vec![0xAB; 40];
        let (id, back) = round_trip(-1, 0x19, &payload).await;
        assert_eq!(id, 0x19);
        assert_eq!(back, payload);
    }

    #[tokio::test]
    async fn test_round_trip_below_threshold() {
        let payload = vec![0x01; 40];
        let (id, back) = round_trip(256, 0x19, &payload).await;
        assert_eq!(id, 0x19);
        assert_eq!(back, payload);
    }

    #[tokio::test]
    async fn test_round_trip_above_threshold() {
        let payload: Vec<u8> = (0..2048u32).map(|i| (i % 251) as u8).collect();
        let (id, back) = round_trip(256, 0x22, &payload).await;
        assert_eq!(id, 0x22);
        assert_eq!(back, payload);
    }

    #[tokio::test]
    async fn test_small_frame_carries_zero_marker() {
        let mut writer = FrameWriter::new(Vec::new());
        writer.set_threshold(256);
        writer.write_frame(0x19, &[0x55; 40]).await.unwrap();
        let wire = writer.writer;

        // Outer length, then the zero uncompressed-length marker, then the
        // raw packet id.
        let (outer, n) = read_varint(&wire, 0).unwrap();
        assert_eq!(outer as usize, wire.len() - n);
        assert_eq!(wire[n], 0x00);
        assert_eq!(wire[n + 1], 0x19);
    }

    #[tokio::test]
    async fn test_large_frame_is_deflated() {
        let payload = vec![0u8; 1024];
        let mut writer = FrameWriter::new(Vec::new());
        writer.set_threshold(256);
        writer.write_frame(0x28, &payload).await.unwrap();
        let wire = writer.writer;

        let (_, n) = read_varint(&wire, 0).unwrap();
        let (uncompressed_len, _) = read_varint(&wire, n).unwrap();
        assert_eq!(uncompressed_len as usize, payload.len() + 1);
        // Zeros deflate well below the threshold.
        assert!(wire.len() < 256);
    }

    #[tokio::test]
    async fn test_overlong_length_varint_is_rejected() {
        let wire: &[u8] = &[0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x7F];
        let mut reader = FrameReader::new(wire);
        let err = reader.read_frame().await.unwrap_err();
        assert!(matches!(err, ProtocolError::BadVarInt));
    }

    #[tokio::test]
    async fn test_oversized_frame_is_rejected() {
        let wire = write_varint((NETWORK_MAX_FRAME_BYTES + 1) as i32).to_vec();
        let mut reader = FrameReader::new(wire.as_slice());
        let err = reader.read_frame().await.unwrap_err();
        assert!(matches!(err, ProtocolError::FrameTooLarge(_)));
    }

    #[tokio::test]
    async fn test_truncated_body_is_rejected() {
        let mut wire = write_varint(10).to_vec();
        wire.extend_from_slice(&[0x01, 0x02]);
        let mut reader = FrameReader::new(wire.as_slice());
        let err = reader.read_frame().await.unwrap_err();
        assert!(matches!(err, ProtocolError::TruncatedFrame));
    }

    #[tokio::test]
    async fn test_eof_between_frames_is_io_closed() {
        let mut reader = FrameReader::new(&[][..]);
        let err = reader.read_frame().await.unwrap_err();
        assert!(matches!(err, ProtocolError::IoClosed));
    }

    #[tokio::test]
    async fn test_size_mismatch_is_rejected() {
        // Deflate a body, then lie about its size by one.
        let body = [0x19u8, 0xAA, 0xBB];
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&body).unwrap();
        let deflated = encoder.finish().unwrap();

        let mut inner = write_varint(body.len() as i32 + 1).to_vec();
        inner.extend_from_slice(&deflated);
        let mut wire = write_varint(inner.len() as i32).to_vec();
        wire.extend_from_slice(&inner);

        let mut reader = FrameReader::new(wire.as_slice());
        reader.set_threshold(0);
        let err = reader.read_frame().await.unwrap_err();
        assert!(matches!(err, ProtocolError::DecompressedSizeMismatch { .. }));
    }

    #[tokio::test]
    async fn test_garbage_deflate_stream_is_rejected() {
        let mut inner = write_varint(8).to_vec();
        inner.extend_from_slice(&[0x00, 0x11, 0x22, 0x33]);
        let mut wire = write_varint(inner.len() as i32).to_vec();
        wire.extend_from_slice(&inner);

        let mut reader = FrameReader::new(wire.as_slice());
        reader.set_threshold(0);
        let err = reader.read_frame().await.unwrap_err();
        assert!(matches!(err, ProtocolError::DecompressError(_)));
    }
}

// ============================================
// File: crates/ferrogate-core/src/protocol/header.rs
// ============================================
//! # Packet Header Codec
//!
//! ## Creation Reason
//! Every binary-framed message starts with a fixed 28-byte header; this
//! module owns its layout, parsing, and the frame checksum that covers it.
//!
//! ## Wire Format
//! ```text
//! ┌──────────────┬──────────────┬──────────────┬──────────┬──────────────┐
//! │ checksum u64 │ msgtype  u32 │ version  u32 │ seq  u32 │ nonce    u64 │
//! └──────────────┴──────────────┴──────────────┴──────────┴──────────────┘
//! all fields little-endian, 28 bytes total
//! ```
//!
//! ## Checksum
//! MD5 of the frame (header + body) with the checksum field read as eight
//! zero bytes; digest bytes [4..12) taken as a little-endian u64.
//!
//! ## ⚠️ Important Note for Next Developer
//! - The checksum covers everything after the 4-byte length prefix
//! - Field order is wire contract; never reorder

use bytes::{Buf, BufMut, BytesMut};
use md5::{Digest, Md5};

use crate::error::{CoreError, Result};

/// Packet header length in bytes.
pub const PACKET_HEADER_LEN: usize = 28;

/// Length-prefix size in bytes.
pub const LENGTH_PREFIX_LEN: usize = 4;

/// ACK word size in bytes.
pub const ACK_FIELD_LEN: usize = 4;

/// Legacy protocol version (nonce-derived IV).
pub const VERSION_LEGACY: u32 = 1;

/// Current protocol version (MD5-derived IV).
pub const VERSION_CURRENT: u32 = 2;

/// Message type codes.
pub mod msgtype {
    /// Initial handshake request (client → server).
    pub const HANDSHAKE_REQUEST: u32 = 1;
    /// Handshake acknowledgment carrying an RSA signature.
    pub const HANDSHAKE_ACK: u32 = 2;
    /// Steady-state acknowledged response.
    pub const ACK: u32 = 3;
    /// Streamed response (chunked body, pre-advertised size).
    pub const STREAM: u32 = 4;
}

/// Fixed packet header preceding every binary frame body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PacketHeader {
    /// Truncated MD5 over the frame with this field zeroed.
    pub checksum: u64,
    /// Message type, see [`msgtype`].
    pub msgtype: u32,
    /// Protocol version, 1 or 2.
    pub version: u32,
    /// Sequence number (client nonce counter or server response counter).
    pub seq: u32,
    /// Client nonce on requests; Unix seconds at send time on responses.
    pub nonce: u64,
}

impl PacketHeader {
    /// Parses a header from the start of `buf`.
    pub fn parse(mut buf: &[u8]) -> Result<Self> {
        if buf.len() < PACKET_HEADER_LEN {
            return Err(CoreError::bad_frame(format!(
                "frame too short for header: {} bytes",
                buf.len()
            )));
        }
        Ok(Self {
            checksum: buf.get_u64_le(),
            msgtype: buf.get_u32_le(),
            version: buf.get_u32_le(),
            seq: buf.get_u32_le(),
            nonce: buf.get_u64_le(),
        })
    }

    /// Appends the encoded header to `buf`.
    pub fn write_to(&self, buf: &mut BytesMut) {
        buf.reserve(PACKET_HEADER_LEN);
        buf.put_u64_le(self.checksum);
        buf.put_u32_le(self.msgtype);
        buf.put_u32_le(self.version);
        buf.put_u32_le(self.seq);
        buf.put_u64_le(self.nonce);
    }
}

/// Computes the frame checksum over `frame` (header + body, no length
/// prefix), treating the checksum field as zeroes.
#[must_use]
pub fn frame_checksum(frame: &[u8]) -> u64 {
    let mut hasher = Md5::new();
    hasher.update([0u8; 8]);
    if frame.len() > 8 {
        hasher.update(&frame[8..]);
    }
    let digest = hasher.finalize();
    let mut word = [0u8; 8];
    word.copy_from_slice(&digest[4..12]);
    u64::from_le_bytes(word)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_header() -> PacketHeader {
        PacketHeader {
            checksum: 0x1122_3344_5566_7788,
            msgtype: msgtype::HANDSHAKE_REQUEST,
            version: VERSION_CURRENT,
            seq: 7,
            nonce: 0xdead_beef_0000_0001,
        }
    }

    #[test]
    fn test_header_roundtrip() {
        let original = sample_header();
        let mut buf = BytesMut::new();
        original.write_to(&mut buf);
        assert_eq!(buf.len(), PACKET_HEADER_LEN);

        let decoded = PacketHeader::parse(&buf).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_header_layout_little_endian() {
        let mut buf = BytesMut::new();
        sample_header().write_to(&mut buf);

        // checksum at offset 0.
        assert_eq!(&buf[..8], &0x1122_3344_5566_7788u64.to_le_bytes());
        // msgtype at offset 8.
        assert_eq!(&buf[8..12], &1u32.to_le_bytes());
        // version at offset 12.
        assert_eq!(&buf[12..16], &2u32.to_le_bytes());
        // seq at offset 16.
        assert_eq!(&buf[16..20], &7u32.to_le_bytes());
        // nonce at offset 20.
        assert_eq!(&buf[20..28], &0xdead_beef_0000_0001u64.to_le_bytes());
    }

    #[test]
    fn test_parse_rejects_short_buffer() {
        assert!(matches!(
            PacketHeader::parse(&[0u8; 27]),
            Err(CoreError::BadFrame { .. })
        ));
    }

    #[test]
    fn test_checksum_ignores_checksum_field() {
        let mut frame = vec![0u8; 40];
        frame[30] = 0x5a;
        let base = frame_checksum(&frame);

        // Changing the first 8 bytes must not affect the checksum.
        frame[..8].copy_from_slice(&[0xff; 8]);
        assert_eq!(frame_checksum(&frame), base);
    }

    #[test]
    fn test_checksum_detects_bit_flip() {
        let mut frame = vec![0u8; 64];
        for (i, b) in frame.iter_mut().enumerate() {
            *b = i as u8;
        }
        let base = frame_checksum(&frame);
        for pos in 8..frame.len() {
            frame[pos] ^= 0x01;
            assert_ne!(frame_checksum(&frame), base, "flip at {pos} undetected");
            frame[pos] ^= 0x01;
        }
    }
}

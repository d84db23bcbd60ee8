//! Base data types used throughout the Java protocol.

use std::fmt;

use bytes::{Buf, BufMut};

use crate::codec::{ProtoDecode, ProtoEncode};
use crate::error::ProtoError;

/// A protocol VarInt: little-endian base-128 groups of the raw two's
/// complement bits, so any negative value costs the full five bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct VarInt(pub i32);

impl VarInt {
    pub const MAX_BYTES: usize = 5;

    pub fn encoded_len(value: i32) -> usize {
        match value as u32 {
            0..=0x7F => 1,
            0x80..=0x3FFF => 2,
            0x4000..=0x1F_FFFF => 3,
            0x20_0000..=0xFFF_FFFF => 4,
            _ => 5,
        }
    }

    /// Look at the VarInt at the front of `data` without consuming it.
    ///
    /// `Ok(None)` means `data` ends before the value does; the caller should
    /// wait for more bytes.
    pub fn peek(data: &[u8]) -> Result<Option<(Self, usize)>, ProtoError> {
        let mut value = 0u32;
        for (i, &byte) in data.iter().take(Self::MAX_BYTES).enumerate() {
            value |= u32::from(byte & 0x7F) << (7 * i);
            if byte & 0x80 == 0 {
                return Ok(Some((VarInt(value as i32), i + 1)));
            }
        }
        if data.len() >= Self::MAX_BYTES {
            Err(ProtoError::VarIntTooLong)
        } else {
            Ok(None)
        }
    }
}

impl ProtoEncode for VarInt {
    fn proto_encode(&self, buf: &mut impl BufMut) {
        let mut rest = self.0 as u32;
        while rest >= 0x80 {
            buf.put_u8(rest as u8 | 0x80);
            rest >>= 7;
        }
        buf.put_u8(rest as u8);
    }
}

impl ProtoDecode for VarInt {
    fn proto_decode(buf: &mut impl Buf) -> Result<Self, ProtoError> {
        let mut value = 0u32;
        for i in 0..Self::MAX_BYTES {
            if !buf.has_remaining() {
                return Err(ProtoError::Truncated {
                    needed: 1,
                    remaining: 0,
                });
            }
            let byte = buf.get_u8();
            value |= u32::from(byte & 0x7F) << (7 * i);
            if byte & 0x80 == 0 {
                return Ok(VarInt(value as i32));
            }
        }
        Err(ProtoError::VarIntTooLong)
    }
}

impl fmt::Debug for VarInt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("VarInt").field(&self.0).finish()
    }
}

/// 128-bit identifier as it appears on the wire.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Uuid(pub [u8; 16]);

impl Uuid {
    pub const ZERO: Self = Self([0; 16]);

    /// Lowercase hex without dashes.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl ProtoEncode for Uuid {
    fn proto_encode(&self, buf: &mut impl BufMut) {
        buf.put_slice(&self.0);
    }
}

impl ProtoDecode for Uuid {
    fn proto_decode(buf: &mut impl Buf) -> Result<Self, ProtoError> {
        if buf.remaining() < 16 {
            return Err(ProtoError::Truncated {
                needed: 16,
                remaining: buf.remaining(),
            });
        }
        let mut bytes = [0u8; 16];
        buf.copy_to_slice(&mut bytes);
        Ok(Self(bytes))
    }
}

impl fmt::Debug for Uuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Uuid({})", self.to_hex())
    }
}

impl fmt::Display for Uuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Block coordinates, sent as one `i64` holding 26 bits of x, 12 of y and
/// 26 of z from the top down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    pub fn chunk_pos(&self) -> ChunkPos {
        ChunkPos::new(self.x >> 4, self.z >> 4)
    }

    pub fn pack(&self) -> i64 {
        ((self.x as i64 & 0x3FF_FFFF) << 38)
            | ((self.y as i64 & 0xFFF) << 26)
            | (self.z as i64 & 0x3FF_FFFF)
    }

    pub fn unpack(packed: i64) -> Self {
        // Arithmetic shifts sign-extend each field.
        let x = (packed >> 38) as i32;
        let y = ((packed << 26) >> 52) as i32;
        let z = ((packed << 38) >> 38) as i32;
        Self { x, y, z }
    }
}

impl ProtoEncode for BlockPos {
    fn proto_encode(&self, buf: &mut impl BufMut) {
        buf.put_i64(self.pack());
    }
}

impl ProtoDecode for BlockPos {
    fn proto_decode(buf: &mut impl Buf) -> Result<Self, ProtoError> {
        if buf.remaining() < 8 {
            return Err(ProtoError::Truncated {
                needed: 8,
                remaining: buf.remaining(),
            });
        }
        Ok(Self::unpack(buf.get_i64()))
    }
}

/// A 16x16 column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkPos {
    pub x: i32,
    pub z: i32,
}

impl ChunkPos {
    pub fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Column containing the given world coordinates (floor division).
    pub fn containing(x: f64, z: f64) -> Self {
        Self::new((x / 16.0).floor() as i32, (z / 16.0).floor() as i32)
    }
}

impl fmt::Display for ChunkPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    fn roundtrip_varint(value: i32) {
        let mut buf = Vec::new();
        VarInt(value).proto_encode(&mut buf);
        assert_eq!(buf.len(), VarInt::encoded_len(value), "length of {value}");
        let (peeked, consumed) = VarInt::peek(&buf).unwrap().unwrap();
        assert_eq!(peeked.0, value);
        assert_eq!(consumed, buf.len());
        assert_eq!(VarInt::proto_decode(&mut &buf[..]).unwrap().0, value);
    }

    #[test]
    fn varint_values() {
        for v in [0, 1, 127, 128, 255, 25565, 2_097_151, i32::MAX, -1, i32::MIN] {
            roundtrip_varint(v);
        }
    }

    #[test]
    fn varint_known_encodings() {
        // Reference encodings for the Java protocol (no ZigZag).
        let cases: [(i32, &[u8]); 5] = [
            (0, &[0x00]),
            (1, &[0x01]),
            (128, &[0x80, 0x01]),
            (25565, &[0xdd, 0xc7, 0x01]),
            (-1, &[0xff, 0xff, 0xff, 0xff, 0x0f]),
        ];
        for (value, expected) in cases {
            let mut buf = BytesMut::new();
            VarInt(value).proto_encode(&mut buf);
            assert_eq!(&buf[..], expected, "encoding of {value}");
        }
    }

    #[test]
    fn varint_incomplete() {
        assert!(VarInt::peek(&[]).unwrap().is_none());
        assert!(VarInt::peek(&[0x80]).unwrap().is_none());
        assert!(matches!(
            VarInt::proto_decode(&mut &[0x80u8, 0x80][..]),
            Err(ProtoError::Truncated { .. })
        ));
    }

    #[test]
    fn varint_too_long() {
        let data = [0x80u8, 0x80, 0x80, 0x80, 0x80, 0x01];
        assert!(matches!(
            VarInt::peek(&data),
            Err(ProtoError::VarIntTooLong)
        ));
        assert!(matches!(
            VarInt::proto_decode(&mut &data[..]),
            Err(ProtoError::VarIntTooLong)
        ));
    }

    #[test]
    fn uuid_hex() {
        let mut raw = [0u8; 16];
        raw[0] = 0xab;
        raw[15] = 0x01;
        let uuid = Uuid(raw);
        assert_eq!(uuid.to_hex(), "ab000000000000000000000000000001");
        assert_eq!(uuid.to_string().len(), 32);
    }

    #[test]
    fn blockpos_pack_unpack() {
        for pos in [
            BlockPos::new(0, 0, 0),
            BlockPos::new(100, 64, -200),
            BlockPos::new(-33_554_432, 0, 33_554_431),
            BlockPos::new(-1, 255, -1),
        ] {
            assert_eq!(BlockPos::unpack(pos.pack()), pos);
        }
    }

    #[test]
    fn blockpos_negative_y_sign_extends() {
        let pos = BlockPos::new(5, -1, 5);
        assert_eq!(BlockPos::unpack(pos.pack()).y, -1);
    }

    #[test]
    fn blockpos_chunk_pos() {
        assert_eq!(BlockPos::new(15, 64, 15).chunk_pos(), ChunkPos::new(0, 0));
        assert_eq!(BlockPos::new(16, 64, 16).chunk_pos(), ChunkPos::new(1, 1));
        assert_eq!(BlockPos::new(-1, 64, -1).chunk_pos(), ChunkPos::new(-1, -1));
        assert_eq!(
            BlockPos::new(-17, 64, -17).chunk_pos(),
            ChunkPos::new(-2, -2)
        );
    }

    #[test]
    fn chunkpos_containing_floors() {
        assert_eq!(ChunkPos::containing(0.5, 15.9), ChunkPos::new(0, 0));
        assert_eq!(ChunkPos::containing(-0.5, 16.0), ChunkPos::new(-1, 1));
    }
}

//! Packets as `VarInt id + body`, with a cursor reader and a builder.
//!
//! Bodies are held as `Bytes` so that spans cut out of a packet by
//! [`PacketReader::read_bytes`] or [`PacketReader::slice_from`] share the
//! original allocation instead of copying it.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::codec::{read_string, write_string, ProtoDecode, ProtoEncode};
use crate::error::ProtoError;
use crate::types::{BlockPos, Uuid, VarInt};

/// One decoded packet: numeric kind plus its undecoded body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub id: i32,
    pub body: Bytes,
}

impl Packet {
    pub fn new(id: i32, body: impl Into<Bytes>) -> Self {
        Self {
            id,
            body: body.into(),
        }
    }

    /// A cursor positioned at the start of the body.
    pub fn reader(&self) -> PacketReader {
        PacketReader::new(self.body.clone())
    }

    /// Length of `VarInt(id) + body`.
    pub fn encoded_len(&self) -> usize {
        VarInt::encoded_len(self.id) + self.body.len()
    }

    /// Serialize to `VarInt(id) + body`.
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        VarInt(self.id).proto_encode(&mut buf);
        buf.put_slice(&self.body);
        buf.freeze()
    }

    /// Split `VarInt(id) + body` without copying the body.
    pub fn decode(data: Bytes) -> Result<Self, ProtoError> {
        let mut cursor = &data[..];
        let id = VarInt::proto_decode(&mut cursor)?.0;
        let consumed = data.len() - cursor.len();
        Ok(Self {
            id,
            body: data.slice(consumed..),
        })
    }
}

/// Cursor over a packet body. Every read advances the cursor.
#[derive(Debug, Clone)]
pub struct PacketReader {
    data: Bytes,
    pos: usize,
}

impl PacketReader {
    pub fn new(data: Bytes) -> Self {
        Self { data, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// The unread part of the body, without advancing.
    pub fn unread(&self) -> &[u8] {
        &self.data[self.pos..]
    }

    fn take(&mut self, n: usize) -> Result<&[u8], ProtoError> {
        if self.remaining() < n {
            return Err(ProtoError::Truncated {
                needed: n,
                remaining: self.remaining(),
            });
        }
        let start = self.pos;
        self.pos += n;
        Ok(&self.data[start..self.pos])
    }

    /// Advance past `n` bytes.
    pub fn skip(&mut self, n: usize) -> Result<(), ProtoError> {
        self.take(n).map(|_| ())
    }

    pub fn read_u8(&mut self) -> Result<u8, ProtoError> {
        Ok(self.take(1)?[0])
    }

    pub fn read_i8(&mut self) -> Result<i8, ProtoError> {
        Ok(self.take(1)?[0] as i8)
    }

    pub fn read_bool(&mut self) -> Result<bool, ProtoError> {
        Ok(self.read_u8()? != 0)
    }

    pub fn read_i16(&mut self) -> Result<i16, ProtoError> {
        Ok(self.take(2)?.get_i16())
    }

    pub fn read_u16(&mut self) -> Result<u16, ProtoError> {
        Ok(self.take(2)?.get_u16())
    }

    pub fn read_i32(&mut self) -> Result<i32, ProtoError> {
        Ok(self.take(4)?.get_i32())
    }

    pub fn read_i64(&mut self) -> Result<i64, ProtoError> {
        Ok(self.take(8)?.get_i64())
    }

    pub fn read_f32(&mut self) -> Result<f32, ProtoError> {
        Ok(self.take(4)?.get_f32())
    }

    pub fn read_f64(&mut self) -> Result<f64, ProtoError> {
        Ok(self.take(8)?.get_f64())
    }

    pub fn read_varint(&mut self) -> Result<i32, ProtoError> {
        let mut rest = self.unread();
        let before = rest.len();
        let value = VarInt::proto_decode(&mut rest)?;
        self.pos += before - rest.len();
        Ok(value.0)
    }

    pub fn read_string(&mut self) -> Result<String, ProtoError> {
        let mut rest = self.unread();
        let before = rest.len();
        let value = read_string(&mut rest)?;
        self.pos += before - rest.len();
        Ok(value)
    }

    pub fn read_position(&mut self) -> Result<BlockPos, ProtoError> {
        Ok(BlockPos::unpack(self.read_i64()?))
    }

    pub fn read_uuid(&mut self) -> Result<Uuid, ProtoError> {
        let mut raw = self.take(16)?;
        Uuid::proto_decode(&mut raw)
    }

    /// Cut the next `n` bytes out as a shared span.
    pub fn read_bytes(&mut self, n: usize) -> Result<Bytes, ProtoError> {
        let start = self.pos;
        self.skip(n)?;
        Ok(self.data.slice(start..self.pos))
    }

    /// Everything left in the body, consuming it.
    pub fn read_rest(&mut self) -> Bytes {
        let start = self.pos;
        self.pos = self.data.len();
        self.data.slice(start..)
    }

    /// Span from `start` up to the current position.
    pub fn slice_from(&self, start: usize) -> Bytes {
        self.data.slice(start..self.pos)
    }
}

/// Builder for an outgoing packet.
#[derive(Debug)]
pub struct PacketWriter {
    id: i32,
    buf: BytesMut,
}

impl PacketWriter {
    pub fn new(id: i32) -> Self {
        Self {
            id,
            buf: BytesMut::new(),
        }
    }

    pub fn write_u8(&mut self, v: u8) -> &mut Self {
        self.buf.put_u8(v);
        self
    }

    pub fn write_i8(&mut self, v: i8) -> &mut Self {
        self.buf.put_i8(v);
        self
    }

    pub fn write_bool(&mut self, v: bool) -> &mut Self {
        self.buf.put_u8(v as u8);
        self
    }

    pub fn write_i16(&mut self, v: i16) -> &mut Self {
        self.buf.put_i16(v);
        self
    }

    pub fn write_u16(&mut self, v: u16) -> &mut Self {
        self.buf.put_u16(v);
        self
    }

    pub fn write_i32(&mut self, v: i32) -> &mut Self {
        self.buf.put_i32(v);
        self
    }

    pub fn write_i64(&mut self, v: i64) -> &mut Self {
        self.buf.put_i64(v);
        self
    }

    pub fn write_f32(&mut self, v: f32) -> &mut Self {
        self.buf.put_f32(v);
        self
    }

    pub fn write_f64(&mut self, v: f64) -> &mut Self {
        self.buf.put_f64(v);
        self
    }

    pub fn write_varint(&mut self, v: i32) -> &mut Self {
        VarInt(v).proto_encode(&mut self.buf);
        self
    }

    pub fn write_string(&mut self, s: &str) -> &mut Self {
        write_string(&mut self.buf, s);
        self
    }

    pub fn write_position(&mut self, pos: BlockPos) -> &mut Self {
        pos.proto_encode(&mut self.buf);
        self
    }

    pub fn write_uuid(&mut self, uuid: Uuid) -> &mut Self {
        uuid.proto_encode(&mut self.buf);
        self
    }

    pub fn write_bytes(&mut self, data: &[u8]) -> &mut Self {
        self.buf.put_slice(data);
        self
    }

    pub fn finish(self) -> Packet {
        Packet {
            id: self.id,
            body: self.buf.freeze(),
        }
    }
}

//! Length-prefixed framing with optional zlib compression.
//!
//! Uncompressed frame: `VarInt(len) + VarInt(id) + body`.
//! Compressed frame: `VarInt(len) + VarInt(data_len) + payload`, where
//! `data_len == 0` means the payload is raw and anything else is the
//! inflated size of a zlib stream.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::codec::{ProtoDecode, ProtoEncode};
use crate::compression::{deflate, inflate};
use crate::error::ProtoError;
use crate::packet::Packet;
use crate::types::VarInt;

/// Largest frame the protocol can express (3-byte VarInt length).
pub const MAX_FRAME_LEN: usize = 2_097_151;

const COMPRESSION_LEVEL: u32 = 6;

/// Stateful frame codec for one direction of one connection.
#[derive(Debug, Clone, Default)]
pub struct FrameCodec {
    threshold: Option<usize>,
}

impl FrameCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Switch compression on (`Some`) or off (`None`). Negative thresholds
    /// disable compression, matching the set-compression packet.
    pub fn set_compression(&mut self, threshold: Option<i32>) {
        self.threshold = threshold.and_then(|t| usize::try_from(t).ok());
    }

    pub fn compression_threshold(&self) -> Option<usize> {
        self.threshold
    }

    /// Pull one complete packet off the front of `buf`, or `None` if more
    /// bytes are needed.
    pub fn decode(&self, buf: &mut BytesMut) -> Result<Option<Packet>, ProtoError> {
        let Some((VarInt(len), header)) = VarInt::peek(buf)? else {
            return Ok(None);
        };
        if len < 0 {
            return Err(ProtoError::NegativeLength(len));
        }
        let len = len as usize;
        if len > MAX_FRAME_LEN {
            return Err(ProtoError::FrameTooLarge {
                len,
                limit: MAX_FRAME_LEN,
            });
        }
        if buf.len() < header + len {
            buf.reserve(header + len - buf.len());
            return Ok(None);
        }

        buf.advance(header);
        let frame = buf.split_to(len).freeze();

        let payload = match self.threshold {
            None => frame,
            Some(_) => {
                let mut cursor = &frame[..];
                let data_len = VarInt::proto_decode(&mut cursor)?.0;
                let consumed = frame.len() - cursor.len();
                if data_len < 0 {
                    return Err(ProtoError::NegativeLength(data_len));
                }
                let data_len = data_len as usize;
                if data_len == 0 {
                    frame.slice(consumed..)
                } else {
                    if data_len > MAX_FRAME_LEN {
                        return Err(ProtoError::FrameTooLarge {
                            len: data_len,
                            limit: MAX_FRAME_LEN,
                        });
                    }
                    Bytes::from(inflate(&frame[consumed..], data_len)?)
                }
            }
        };

        Packet::decode(payload).map(Some)
    }

    /// Append one framed packet to `dst`.
    pub fn encode(&self, packet: &Packet, dst: &mut BytesMut) -> Result<(), ProtoError> {
        let raw = packet.encode();

        let payload = match self.threshold {
            None => raw,
            Some(threshold) if raw.len() >= threshold => {
                let mut out = BytesMut::new();
                VarInt(raw.len() as i32).proto_encode(&mut out);
                out.put_slice(&deflate(&raw, COMPRESSION_LEVEL)?);
                out.freeze()
            }
            Some(_) => {
                let mut out = BytesMut::with_capacity(raw.len() + 1);
                VarInt(0).proto_encode(&mut out);
                out.put_slice(&raw);
                out.freeze()
            }
        };

        if payload.len() > MAX_FRAME_LEN {
            return Err(ProtoError::FrameTooLarge {
                len: payload.len(),
                limit: MAX_FRAME_LEN,
            });
        }

        VarInt(payload.len() as i32).proto_encode(dst);
        dst.put_slice(&payload);
        Ok(())
    }
}

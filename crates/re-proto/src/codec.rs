//! Traits for values with a fixed wire form, plus the VarInt-prefixed
//! string every packet uses.

use bytes::{Buf, BufMut};

use crate::error::ProtoError;
use crate::types::VarInt;

pub trait ProtoEncode {
    fn proto_encode(&self, buf: &mut impl BufMut);
}

pub trait ProtoDecode: Sized {
    fn proto_decode(buf: &mut impl Buf) -> Result<Self, ProtoError>;
}

/// The length prefix counts UTF-8 bytes, not characters.
pub fn write_string(buf: &mut impl BufMut, s: &str) {
    VarInt(s.len() as i32).proto_encode(buf);
    buf.put_slice(s.as_bytes());
}

pub fn read_string(buf: &mut impl Buf) -> Result<String, ProtoError> {
    let len = match VarInt::proto_decode(buf)? {
        VarInt(n) if n < 0 => return Err(ProtoError::NegativeLength(n)),
        VarInt(n) => n as usize,
    };
    if buf.remaining() < len {
        return Err(ProtoError::Truncated {
            needed: len,
            remaining: buf.remaining(),
        });
    }
    let data = buf.copy_to_bytes(len);
    String::from_utf8(data.to_vec()).map_err(|_| ProtoError::BadString)
}

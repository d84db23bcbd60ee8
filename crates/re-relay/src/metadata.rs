//! Partial decoding of entity metadata streams.
//!
//! A stream is a run of `index: u8, type: VarInt, value` entries closed by
//! index `0xff`. Values are never interpreted: each entry is kept as the raw
//! span from its type tag to the end of its value, so it can be written back
//! byte for byte.

use std::collections::BTreeMap;

use bytes::Bytes;
use re_proto::{PacketReader, PacketWriter};

use crate::error::PacketError;

/// Index byte that terminates a metadata stream.
pub const END_OF_METADATA: u8 = 0xff;

/// Metadata value type carrying a VarInt.
pub const TYPE_VARINT: i32 = 1;

/// Metadata entries of one entity, keyed by index.
pub type Metadata = BTreeMap<u8, Bytes>;

/// Read one entry. Returns `None` at the terminator.
pub fn read_entry(r: &mut PacketReader) -> Result<Option<(u8, Bytes)>, PacketError> {
    let index = r.read_u8()?;
    if index == END_OF_METADATA {
        return Ok(None);
    }
    let start = r.position();
    let value_type = r.read_varint()?;
    skip_value(r, value_type)?;
    Ok(Some((index, r.slice_from(start))))
}

/// Read entries up to and including the terminator, merging them into `into`.
pub fn read_stream(r: &mut PacketReader, into: &mut Metadata) -> Result<(), PacketError> {
    while let Some((index, raw)) = read_entry(r)? {
        into.insert(index, raw);
    }
    Ok(())
}

/// Write every entry followed by the terminator.
pub fn write_stream(w: &mut PacketWriter, metadata: &Metadata) {
    for (index, raw) in metadata {
        w.write_u8(*index).write_bytes(raw);
    }
    w.write_u8(END_OF_METADATA);
}

/// Advance past one value of the given type.
pub fn skip_value(r: &mut PacketReader, value_type: i32) -> Result<(), PacketError> {
    match value_type {
        // byte, boolean
        0 | 6 => r.skip(1)?,
        // varint, direction, block id
        1 | 10 | 12 => {
            r.read_varint()?;
        }
        // float
        2 => r.skip(4)?,
        // string, chat
        3 | 4 => {
            r.read_string()?;
        }
        // slot: id, then count + damage + tag unless empty
        5 => {
            if r.read_i16()? != -1 {
                r.skip(3)?;
                skip_nbt(r)?;
            }
        }
        // rotation
        7 => r.skip(12)?,
        // position
        8 => r.skip(8)?,
        // optional position
        9 => {
            if r.read_bool()? {
                r.skip(8)?;
            }
        }
        // optional uuid
        11 => {
            if r.read_bool()? {
                r.skip(16)?;
            }
        }
        13 => skip_nbt(r)?,
        other => return Err(PacketError::UnknownMetadataType(other)),
    }
    Ok(())
}

/// Advance past one embedded NBT root, decoding only its length.
pub fn skip_nbt(r: &mut PacketReader) -> Result<(), PacketError> {
    let len = re_nbt::tag_len(r.unread())?;
    r.skip(len)?;
    Ok(())
}

//! NBT (Named Binary Tag) for Minecraft Java Edition.
//!
//! Java NBT is big-endian throughout: `i16`/`i32`/`i64` numerics, `u16`
//! string lengths and `i32` array/list lengths. Item slots and entity
//! metadata embed a root tag where a single `TAG_End` byte means "no tag".

pub mod error;
mod io;
pub mod tag;

pub use error::NbtError;
pub use tag::{NbtCompound, NbtRoot, NbtTag, TagKind};

use bytes::{Buf, BufMut};

/// Read a root tag from a buffer.
pub fn read_nbt(buf: &mut impl Buf) -> Result<Option<NbtRoot>, NbtError> {
    io::read_nbt(buf)
}

/// Write a root tag (or the empty marker for `None`) to a buffer.
pub fn write_nbt(buf: &mut impl BufMut, root: Option<&NbtRoot>) {
    io::write_nbt(buf, root)
}

/// Decode a root tag from the front of `data`, returning the value and the
/// number of bytes it occupied.
pub fn decode(data: &[u8]) -> Result<(Option<NbtRoot>, usize), NbtError> {
    let mut cursor = data;
    let value = io::read_nbt(&mut cursor)?;
    Ok((value, data.len() - cursor.remaining()))
}

/// Encode a root tag to a fresh buffer.
pub fn encode(root: Option<&NbtRoot>) -> Vec<u8> {
    let mut buf = Vec::new();
    io::write_nbt(&mut buf, root);
    buf
}

/// Length in bytes of the root tag at the front of `data`, without decoding
/// its contents.
pub fn tag_len(data: &[u8]) -> Result<usize, NbtError> {
    let mut cursor = data;
    io::skip_nbt(&mut cursor)?;
    Ok(data.len() - cursor.remaining())
}

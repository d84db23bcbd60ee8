//! Java Edition tag encoding: big-endian numerics, `u16`-prefixed strings
//! and `i32`-prefixed arrays and lists.

use bytes::{Buf, BufMut};

use crate::error::NbtError;
use crate::tag::{NbtCompound, NbtRoot, NbtTag, TagKind};

/// Compounds and lists may nest this deep before decoding gives up.
const MAX_DEPTH: usize = 512;

/// Walks tags off a buffer, tracking nesting depth on the way down.
struct Decoder<'a, B> {
    buf: &'a mut B,
    depth: usize,
}

impl<'a, B: Buf> Decoder<'a, B> {
    fn new(buf: &'a mut B) -> Self {
        Self { buf, depth: 0 }
    }

    fn need(&self, needed: usize) -> Result<(), NbtError> {
        let available = self.buf.remaining();
        if available < needed {
            return Err(NbtError::Truncated { needed, available });
        }
        Ok(())
    }

    fn kind(&mut self) -> Result<TagKind, NbtError> {
        self.need(1)?;
        TagKind::from_id(self.buf.get_u8())
    }

    fn len(&mut self) -> Result<usize, NbtError> {
        self.need(4)?;
        match self.buf.get_i32() {
            n if n < 0 => Err(NbtError::NegativeLength(n)),
            n => Ok(n as usize),
        }
    }

    fn string(&mut self) -> Result<String, NbtError> {
        self.need(2)?;
        let len = self.buf.get_u16() as usize;
        self.need(len)?;
        let raw = self.buf.copy_to_bytes(len);
        String::from_utf8(raw.to_vec()).map_err(|_| NbtError::BadString)
    }

    fn descend(&mut self) -> Result<(), NbtError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(NbtError::TooDeep(MAX_DEPTH));
        }
        Ok(())
    }

    fn root(&mut self) -> Result<Option<(String, TagKind)>, NbtError> {
        match self.kind()? {
            TagKind::End => Ok(None),
            TagKind::Compound => Ok(Some((self.string()?, TagKind::Compound))),
            other => Err(NbtError::RootNotCompound(other.id())),
        }
    }

    fn value(&mut self, kind: TagKind) -> Result<NbtTag, NbtError> {
        if let Some(width) = kind.width() {
            if is_array(kind) {
                return self.array(kind, width);
            }
            self.need(width)?;
        }
        Ok(match kind {
            TagKind::Byte => NbtTag::Byte(self.buf.get_i8()),
            TagKind::Short => NbtTag::Short(self.buf.get_i16()),
            TagKind::Int => NbtTag::Int(self.buf.get_i32()),
            TagKind::Long => NbtTag::Long(self.buf.get_i64()),
            TagKind::Float => NbtTag::Float(self.buf.get_f32()),
            TagKind::Double => NbtTag::Double(self.buf.get_f64()),
            TagKind::String => NbtTag::String(self.string()?),
            TagKind::List => {
                self.descend()?;
                let element = self.kind()?;
                let len = self.len()?;
                let mut items = Vec::with_capacity(len.min(self.buf.remaining()));
                for _ in 0..len {
                    items.push(self.value(element)?);
                }
                self.depth -= 1;
                NbtTag::List(items)
            }
            TagKind::Compound => {
                self.descend()?;
                let map = self.compound()?;
                self.depth -= 1;
                NbtTag::Compound(map)
            }
            TagKind::End | TagKind::ByteArray | TagKind::IntArray | TagKind::LongArray => {
                return Err(NbtError::BadTagKind(kind.id()))
            }
        })
    }

    fn array(&mut self, kind: TagKind, width: usize) -> Result<NbtTag, NbtError> {
        let len = self.len()?;
        self.need(len.saturating_mul(width))?;
        let buf = &mut *self.buf;
        Ok(match kind {
            TagKind::ByteArray => NbtTag::ByteArray((0..len).map(|_| buf.get_i8()).collect()),
            TagKind::IntArray => NbtTag::IntArray((0..len).map(|_| buf.get_i32()).collect()),
            _ => NbtTag::LongArray((0..len).map(|_| buf.get_i64()).collect()),
        })
    }

    fn compound(&mut self) -> Result<NbtCompound, NbtError> {
        let mut map = NbtCompound::new();
        loop {
            let kind = self.kind()?;
            if kind == TagKind::End {
                return Ok(map);
            }
            let name = self.string()?;
            map.insert(name, self.value(kind)?);
        }
    }

    fn skip_value(&mut self, kind: TagKind) -> Result<(), NbtError> {
        let bytes = match kind {
            array if is_array(array) => {
                let width = array.width().unwrap_or(1);
                self.len()?.saturating_mul(width)
            }
            TagKind::String => {
                self.need(2)?;
                self.buf.get_u16() as usize
            }
            TagKind::List => {
                self.descend()?;
                let element = self.kind()?;
                for _ in 0..self.len()? {
                    self.skip_value(element)?;
                }
                self.depth -= 1;
                return Ok(());
            }
            TagKind::Compound => {
                self.descend()?;
                loop {
                    let inner = self.kind()?;
                    if inner == TagKind::End {
                        break;
                    }
                    self.skip_value(TagKind::String)?;
                    self.skip_value(inner)?;
                }
                self.depth -= 1;
                return Ok(());
            }
            TagKind::End => return Err(NbtError::BadTagKind(0)),
            scalar => scalar.width().unwrap_or(0),
        };
        self.need(bytes)?;
        self.buf.advance(bytes);
        Ok(())
    }
}

fn is_array(kind: TagKind) -> bool {
    matches!(
        kind,
        TagKind::ByteArray | TagKind::IntArray | TagKind::LongArray
    )
}

/// Read a root tag. A lone end byte stands for "no tag" and yields `None`.
pub(crate) fn read_nbt(buf: &mut impl Buf) -> Result<Option<NbtRoot>, NbtError> {
    let mut de = Decoder::new(buf);
    match de.root()? {
        None => Ok(None),
        Some((name, _)) => Ok(Some(NbtRoot::new(name, de.compound()?))),
    }
}

/// Advance past one root tag without building it.
pub(crate) fn skip_nbt(buf: &mut impl Buf) -> Result<(), NbtError> {
    let mut de = Decoder::new(buf);
    match de.root()? {
        None => Ok(()),
        Some((_, kind)) => de.skip_value(kind),
    }
}

pub(crate) fn write_nbt(buf: &mut impl BufMut, root: Option<&NbtRoot>) {
    let Some(root) = root else {
        buf.put_u8(TagKind::End.id());
        return;
    };
    buf.put_u8(TagKind::Compound.id());
    put_str(buf, &root.name);
    put_compound(buf, &root.compound);
}

fn put_value(buf: &mut impl BufMut, tag: &NbtTag) {
    match tag {
        NbtTag::Byte(v) => buf.put_i8(*v),
        NbtTag::Short(v) => buf.put_i16(*v),
        NbtTag::Int(v) => buf.put_i32(*v),
        NbtTag::Long(v) => buf.put_i64(*v),
        NbtTag::Float(v) => buf.put_f32(*v),
        NbtTag::Double(v) => buf.put_f64(*v),
        NbtTag::String(s) => put_str(buf, s),
        NbtTag::Compound(map) => put_compound(buf, map),
        NbtTag::List(items) => {
            // Empty lists are written with the end kind, as vanilla does.
            let element = items.first().map_or(TagKind::End, NbtTag::kind);
            buf.put_u8(element.id());
            buf.put_i32(items.len() as i32);
            items.iter().for_each(|item| put_value(buf, item));
        }
        NbtTag::ByteArray(values) => {
            buf.put_i32(values.len() as i32);
            values.iter().for_each(|&v| buf.put_i8(v));
        }
        NbtTag::IntArray(values) => {
            buf.put_i32(values.len() as i32);
            values.iter().for_each(|&v| buf.put_i32(v));
        }
        NbtTag::LongArray(values) => {
            buf.put_i32(values.len() as i32);
            values.iter().for_each(|&v| buf.put_i64(v));
        }
    }
}

fn put_compound(buf: &mut impl BufMut, map: &NbtCompound) {
    for (name, tag) in map {
        buf.put_u8(tag.kind().id());
        put_str(buf, name);
        put_value(buf, tag);
    }
    buf.put_u8(TagKind::End.id());
}

fn put_str(buf: &mut impl BufMut, s: &str) {
    buf.put_u16(s.len() as u16);
    buf.put_slice(s.as_bytes());
}

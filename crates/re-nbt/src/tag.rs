use std::collections::BTreeMap;

use crate::error::NbtError;

/// Named children of a compound, kept sorted so that encoding is
/// deterministic regardless of the order the upstream sent them in.
pub type NbtCompound = BTreeMap<String, NbtTag>;

/// Wire identifier of a tag. `End` terminates compounds and doubles as the
/// "no tag" marker at the root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TagKind {
    End = 0,
    Byte = 1,
    Short = 2,
    Int = 3,
    Long = 4,
    Float = 5,
    Double = 6,
    ByteArray = 7,
    String = 8,
    List = 9,
    Compound = 10,
    IntArray = 11,
    LongArray = 12,
}

impl TagKind {
    pub fn from_id(id: u8) -> Result<Self, NbtError> {
        Ok(match id {
            0 => Self::End,
            1 => Self::Byte,
            2 => Self::Short,
            3 => Self::Int,
            4 => Self::Long,
            5 => Self::Float,
            6 => Self::Double,
            7 => Self::ByteArray,
            8 => Self::String,
            9 => Self::List,
            10 => Self::Compound,
            11 => Self::IntArray,
            12 => Self::LongArray,
            other => return Err(NbtError::BadTagKind(other)),
        })
    }

    pub fn id(self) -> u8 {
        self as u8
    }

    /// Payload width of scalar kinds, or of one element of an array kind.
    pub(crate) fn width(self) -> Option<usize> {
        match self {
            Self::Byte | Self::ByteArray => Some(1),
            Self::Short => Some(2),
            Self::Int | Self::Float | Self::IntArray => Some(4),
            Self::Long | Self::Double | Self::LongArray => Some(8),
            Self::End | Self::String | Self::List | Self::Compound => None,
        }
    }
}

/// The value carried by an item slot or a metadata entry: an outer compound
/// with a (usually empty) name.
#[derive(Debug, Clone, PartialEq)]
pub struct NbtRoot {
    pub name: String,
    pub compound: NbtCompound,
}

impl NbtRoot {
    pub fn new(name: impl Into<String>, compound: NbtCompound) -> Self {
        Self {
            name: name.into(),
            compound,
        }
    }

    pub fn get(&self, key: &str) -> Option<&NbtTag> {
        self.compound.get(key)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NbtTag {
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    ByteArray(Vec<i8>),
    String(String),
    List(Vec<NbtTag>),
    Compound(NbtCompound),
    IntArray(Vec<i32>),
    LongArray(Vec<i64>),
}

impl NbtTag {
    pub fn kind(&self) -> TagKind {
        match self {
            NbtTag::Byte(_) => TagKind::Byte,
            NbtTag::Short(_) => TagKind::Short,
            NbtTag::Int(_) => TagKind::Int,
            NbtTag::Long(_) => TagKind::Long,
            NbtTag::Float(_) => TagKind::Float,
            NbtTag::Double(_) => TagKind::Double,
            NbtTag::ByteArray(_) => TagKind::ByteArray,
            NbtTag::String(_) => TagKind::String,
            NbtTag::List(_) => TagKind::List,
            NbtTag::Compound(_) => TagKind::Compound,
            NbtTag::IntArray(_) => TagKind::IntArray,
            NbtTag::LongArray(_) => TagKind::LongArray,
        }
    }
}

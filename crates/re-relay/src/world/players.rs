//! Tab-list (player list item) entries.

use re_proto::{PacketReader, PacketWriter};

use crate::error::PacketError;

/// `add player` action: full entry follows.
pub const ACTION_ADD: i32 = 0;
pub const ACTION_UPDATE_GAME_MODE: i32 = 1;
pub const ACTION_UPDATE_LATENCY: i32 = 2;
pub const ACTION_UPDATE_DISPLAY_NAME: i32 = 3;
pub const ACTION_REMOVE: i32 = 4;

/// A signed profile property (usually `textures`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileProperty {
    pub name: String,
    pub value: String,
    pub signature: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerListEntry {
    pub name: String,
    pub properties: Vec<ProfileProperty>,
    pub game_mode: i32,
    pub ping: i32,
    pub display_name: Option<String>,
}

impl PlayerListEntry {
    /// Read the body of an `add player` entry (everything after the uuid).
    pub fn read(r: &mut PacketReader) -> Result<Self, PacketError> {
        let name = r.read_string()?;
        let count = r.read_varint()?;
        let mut properties = Vec::with_capacity(count.clamp(0, 16) as usize);
        for _ in 0..count {
            let name = r.read_string()?;
            let value = r.read_string()?;
            let signature = read_optional_string(r)?;
            properties.push(ProfileProperty {
                name,
                value,
                signature,
            });
        }
        let game_mode = r.read_varint()?;
        let ping = r.read_varint()?;
        let display_name = read_optional_string(r)?;
        Ok(Self {
            name,
            properties,
            game_mode,
            ping,
            display_name,
        })
    }

    /// Write the body of an `add player` entry.
    pub fn write(&self, w: &mut PacketWriter) {
        w.write_string(&self.name)
            .write_varint(self.properties.len() as i32);
        for property in &self.properties {
            w.write_string(&property.name).write_string(&property.value);
            write_optional_string(w, property.signature.as_deref());
        }
        w.write_varint(self.game_mode).write_varint(self.ping);
        write_optional_string(w, self.display_name.as_deref());
    }
}

pub(crate) fn read_optional_string(r: &mut PacketReader) -> Result<Option<String>, PacketError> {
    Ok(if r.read_bool()? {
        Some(r.read_string()?)
    } else {
        None
    })
}

pub(crate) fn write_optional_string(w: &mut PacketWriter, value: Option<&str>) {
    w.write_bool(value.is_some());
    if let Some(value) = value {
        w.write_string(value);
    }
}

//! Scoreboard teams.

use std::collections::BTreeSet;

use re_proto::{PacketReader, PacketWriter};

use crate::error::PacketError;

pub const MODE_CREATE: i8 = 0;
pub const MODE_REMOVE: i8 = 1;
pub const MODE_UPDATE_INFO: i8 = 2;
pub const MODE_ADD_MEMBERS: i8 = 3;
pub const MODE_REMOVE_MEMBERS: i8 = 4;

/// Everything an update-info packet replaces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamInfo {
    pub display_name: String,
    pub prefix: String,
    pub suffix: String,
    pub flags: u8,
    pub name_tag_visibility: String,
    pub collision_rule: String,
    pub color: i8,
}

impl TeamInfo {
    pub fn read(r: &mut PacketReader) -> Result<Self, PacketError> {
        Ok(Self {
            display_name: r.read_string()?,
            prefix: r.read_string()?,
            suffix: r.read_string()?,
            flags: r.read_u8()?,
            name_tag_visibility: r.read_string()?,
            collision_rule: r.read_string()?,
            color: r.read_i8()?,
        })
    }

    pub fn write(&self, w: &mut PacketWriter) {
        w.write_string(&self.display_name)
            .write_string(&self.prefix)
            .write_string(&self.suffix)
            .write_u8(self.flags)
            .write_string(&self.name_tag_visibility)
            .write_string(&self.collision_rule)
            .write_i8(self.color);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Team {
    pub info: TeamInfo,
    pub members: BTreeSet<String>,
}

/// Read a `VarInt count + strings` member list.
pub fn read_members(r: &mut PacketReader) -> Result<Vec<String>, PacketError> {
    let count = r.read_varint()?;
    let mut members = Vec::with_capacity(count.clamp(0, 64) as usize);
    for _ in 0..count {
        members.push(r.read_string()?);
    }
    Ok(members)
}

pub fn write_members<'a>(w: &mut PacketWriter, members: impl ExactSizeIterator<Item = &'a String>) {
    w.write_varint(members.len() as i32);
    for member in members {
        w.write_string(member);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info() -> TeamInfo {
        TeamInfo {
            display_name: "Red".into(),
            prefix: "§c".into(),
            suffix: String::new(),
            flags: 0x03,
            name_tag_visibility: "always".into(),
            collision_rule: "never".into(),
            color: 12,
        }
    }

    #[test]
    fn info_write_read() {
        let mut w = PacketWriter::new(0x44);
        info().write(&mut w);
        let mut r = w.finish().reader();
        assert_eq!(TeamInfo::read(&mut r).unwrap(), info());
        assert!(r.is_empty());
    }

    #[test]
    fn members_write_read() {
        let members: BTreeSet<String> = ["a", "b"].into_iter().map(String::from).collect();
        let mut w = PacketWriter::new(0x44);
        write_members(&mut w, members.iter());
        let mut r = w.finish().reader();
        assert_eq!(read_members(&mut r).unwrap(), vec!["a", "b"]);
    }
}

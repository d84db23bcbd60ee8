//! Boss bars.

use re_proto::{PacketReader, PacketWriter};

use crate::error::PacketError;

pub const ACTION_ADD: i32 = 0;
pub const ACTION_REMOVE: i32 = 1;
pub const ACTION_UPDATE_HEALTH: i32 = 2;
pub const ACTION_UPDATE_TITLE: i32 = 3;
pub const ACTION_UPDATE_STYLE: i32 = 4;
pub const ACTION_UPDATE_FLAGS: i32 = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct BossBar {
    pub title: String,
    pub health: f32,
    pub color: i32,
    pub division: i32,
    pub flags: u8,
}

impl BossBar {
    /// Read the body of an `add` action.
    pub fn read(r: &mut PacketReader) -> Result<Self, PacketError> {
        Ok(Self {
            title: r.read_string()?,
            health: r.read_f32()?,
            color: r.read_varint()?,
            division: r.read_varint()?,
            flags: r.read_u8()?,
        })
    }

    /// Apply any action other than `add` and `remove`.
    pub fn update(&mut self, action: i32, r: &mut PacketReader) -> Result<(), PacketError> {
        match action {
            ACTION_UPDATE_HEALTH => self.health = r.read_f32()?,
            ACTION_UPDATE_TITLE => self.title = r.read_string()?,
            ACTION_UPDATE_STYLE => {
                self.color = r.read_varint()?;
                self.division = r.read_varint()?;
            }
            ACTION_UPDATE_FLAGS => self.flags = r.read_u8()?,
            _ => {}
        }
        Ok(())
    }

    /// Write the body of an `add` action.
    pub fn write(&self, w: &mut PacketWriter) {
        w.write_string(&self.title)
            .write_f32(self.health)
            .write_varint(self.color)
            .write_varint(self.division)
            .write_u8(self.flags);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar() -> BossBar {
        BossBar {
            title: "{\"text\":\"Wither\"}".into(),
            health: 1.0,
            color: 5,
            division: 0,
            flags: 0,
        }
    }

    #[test]
    fn add_write_read() {
        let mut w = PacketWriter::new(0x0C);
        bar().write(&mut w);
        let mut r = w.finish().reader();
        assert_eq!(BossBar::read(&mut r).unwrap(), bar());
    }

    #[test]
    fn updates_touch_single_fields() {
        let mut b = bar();
        let mut w = PacketWriter::new(0x0C);
        w.write_f32(0.25);
        b.update(ACTION_UPDATE_HEALTH, &mut w.finish().reader()).unwrap();
        assert_eq!(b.health, 0.25);

        let mut w = PacketWriter::new(0x0C);
        w.write_varint(2).write_varint(4);
        b.update(ACTION_UPDATE_STYLE, &mut w.finish().reader()).unwrap();
        assert_eq!((b.color, b.division), (2, 4));

        let mut w = PacketWriter::new(0x0C);
        w.write_u8(0x01);
        b.update(ACTION_UPDATE_FLAGS, &mut w.finish().reader()).unwrap();
        assert_eq!(b.flags, 0x01);
        assert_eq!(b.title, bar().title);
    }
}

//! Player inventory (window 0).

use std::collections::BTreeMap;

use re_nbt::NbtRoot;
use re_proto::{PacketReader, PacketWriter};

use crate::error::PacketError;

/// Slots in the player window: crafting, armor, main, hotbar, offhand.
pub const PLAYER_WINDOW_SLOTS: i16 = 46;

/// Item id marking an empty slot.
pub const EMPTY_ITEM: i16 = -1;

#[derive(Debug, Clone, PartialEq)]
pub struct Slot {
    pub id: i16,
    pub count: i8,
    pub damage: i16,
    pub tag: Option<NbtRoot>,
}

impl Slot {
    /// Read slot data. `None` for the empty sentinel.
    pub fn read(r: &mut PacketReader) -> Result<Option<Self>, PacketError> {
        let id = r.read_i16()?;
        if id == EMPTY_ITEM {
            return Ok(None);
        }
        let count = r.read_i8()?;
        let damage = r.read_i16()?;
        let (tag, len) = re_nbt::decode(r.unread())?;
        r.skip(len)?;
        Ok(Some(Self {
            id,
            count,
            damage,
            tag,
        }))
    }

    pub fn write(slot: Option<&Self>, w: &mut PacketWriter) {
        match slot {
            None => {
                w.write_i16(EMPTY_ITEM);
            }
            Some(slot) => {
                w.write_i16(slot.id)
                    .write_i8(slot.count)
                    .write_i16(slot.damage)
                    .write_bytes(&re_nbt::encode(slot.tag.as_ref()));
            }
        }
    }
}

/// Occupied slots by index; absent means empty.
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    slots: BTreeMap<i16, Slot>,
}

impl Inventory {
    pub fn get(&self, index: i16) -> Option<&Slot> {
        self.slots.get(&index)
    }

    /// Store or clear a slot.
    pub fn set(&mut self, index: i16, slot: Option<Slot>) {
        match slot {
            Some(slot) => {
                self.slots.insert(index, slot);
            }
            None => {
                self.slots.remove(&index);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

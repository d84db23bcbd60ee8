//! Upstream packet builders shared by the unit tests.

use re_proto::types::{BlockPos, Uuid};
use re_proto::{Packet, PacketWriter};

use crate::metadata::END_OF_METADATA;
use crate::world::players::write_optional_string;

pub fn uuid_for(eid: i32) -> Uuid {
    let mut bytes = [0; 16];
    bytes[12..].copy_from_slice(&eid.to_be_bytes());
    Uuid(bytes)
}

pub fn join_game(eid: i32) -> Packet {
    let mut w = PacketWriter::new(0x23);
    w.write_i32(eid)
        .write_u8(1)
        .write_i32(0)
        .write_u8(2)
        .write_u8(20)
        .write_string("flat")
        .write_bool(false);
    w.finish()
}

pub fn respawn(dimension: i32) -> Packet {
    let mut w = PacketWriter::new(0x35);
    w.write_i32(dimension)
        .write_u8(2)
        .write_u8(1)
        .write_string("flat");
    w.finish()
}

pub fn spawn_object(eid: i32, object_type: i8, (x, y, z): (f64, f64, f64), data: i32) -> Packet {
    let mut w = PacketWriter::new(0x00);
    w.write_varint(eid)
        .write_uuid(uuid_for(eid))
        .write_i8(object_type)
        .write_f64(x)
        .write_f64(y)
        .write_f64(z)
        .write_i8(0)
        .write_i8(0)
        .write_i32(data)
        .write_i16(100)
        .write_i16(-100)
        .write_i16(50);
    w.finish()
}

pub fn spawn_orb(eid: i32, (x, y, z): (f64, f64, f64), count: i16) -> Packet {
    let mut w = PacketWriter::new(0x01);
    w.write_varint(eid)
        .write_f64(x)
        .write_f64(y)
        .write_f64(z)
        .write_i16(count);
    w.finish()
}

pub fn spawn_mob(eid: i32, (x, y, z): (f64, f64, f64)) -> Packet {
    let mut w = PacketWriter::new(0x03);
    w.write_varint(eid)
        .write_uuid(uuid_for(eid))
        .write_varint(54)
        .write_f64(x)
        .write_f64(y)
        .write_f64(z)
        .write_i8(1)
        .write_i8(2)
        .write_i8(3)
        .write_i16(0)
        .write_i16(0)
        .write_i16(0);
    // flags byte, then health float
    w.write_u8(0).write_varint(0).write_u8(0);
    w.write_u8(7).write_varint(2).write_f32(20.0);
    w.write_u8(END_OF_METADATA);
    w.finish()
}

pub fn spawn_painting(eid: i32) -> Packet {
    let mut w = PacketWriter::new(0x04);
    w.write_varint(eid)
        .write_uuid(uuid_for(eid))
        .write_string("Kebab")
        .write_position(BlockPos::new(1, 65, 1))
        .write_u8(2);
    w.finish()
}

pub fn spawn_player(eid: i32, (x, y, z): (f64, f64, f64)) -> Packet {
    let mut w = PacketWriter::new(0x05);
    w.write_varint(eid)
        .write_uuid(uuid_for(eid))
        .write_f64(x)
        .write_f64(y)
        .write_f64(z)
        .write_i8(0)
        .write_i8(0);
    w.write_u8(0).write_varint(0).write_u8(0);
    w.write_u8(END_OF_METADATA);
    w.finish()
}

pub fn look_and_move(eid: i32, dx: i16, dy: i16, dz: i16, yaw: i8, pitch: i8) -> Packet {
    let mut w = PacketWriter::new(0x27);
    w.write_varint(eid)
        .write_i16(dx)
        .write_i16(dy)
        .write_i16(dz)
        .write_i8(yaw)
        .write_i8(pitch)
        .write_bool(true);
    w.finish()
}

pub fn velocity(eid: i32, vx: i16, vy: i16, vz: i16) -> Packet {
    let mut w = PacketWriter::new(0x3E);
    w.write_varint(eid).write_i16(vx).write_i16(vy).write_i16(vz);
    w.finish()
}

pub fn destroy(eids: &[i32]) -> Packet {
    let mut w = PacketWriter::new(0x32);
    w.write_varint(eids.len() as i32);
    for &eid in eids {
        w.write_varint(eid);
    }
    w.finish()
}

pub fn entity_metadata_byte(eid: i32, index: u8, value: u8) -> Packet {
    let mut w = PacketWriter::new(0x3C);
    w.write_varint(eid)
        .write_u8(index)
        .write_varint(0)
        .write_u8(value)
        .write_u8(END_OF_METADATA);
    w.finish()
}

/// Metadata entry `index` of type VarInt.
pub fn entity_metadata_varint(eid: i32, index: u8, value: i32) -> Packet {
    let mut w = PacketWriter::new(0x3C);
    w.write_varint(eid)
        .write_u8(index)
        .write_varint(1)
        .write_varint(value)
        .write_u8(END_OF_METADATA);
    w.finish()
}

pub fn entity_properties(eid: i32, key: &str, value: f64, modifiers: i32) -> Packet {
    let mut w = PacketWriter::new(0x4E);
    w.write_varint(eid)
        .write_i32(1)
        .write_string(key)
        .write_f64(value)
        .write_varint(modifiers);
    for _ in 0..modifiers {
        w.write_bytes(&[0xAB; 16]).write_f64(0.1).write_u8(0);
    }
    w.finish()
}

pub fn passengers(vehicle: i32, riders: &[i32]) -> Packet {
    let mut w = PacketWriter::new(0x43);
    w.write_varint(vehicle).write_varint(riders.len() as i32);
    for &eid in riders {
        w.write_varint(eid);
    }
    w.finish()
}

pub fn vehicle_move((x, y, z): (f64, f64, f64)) -> Packet {
    let mut w = PacketWriter::new(0x29);
    w.write_f64(x)
        .write_f64(y)
        .write_f64(z)
        .write_f32(0.0)
        .write_f32(0.0);
    w.finish()
}

pub fn block_change(pos: BlockPos) -> Packet {
    let mut w = PacketWriter::new(0x0B);
    w.write_position(pos).write_varint(1 << 4);
    w.finish()
}

/// Sign text update with an empty tag.
pub fn update_block_entity(pos: BlockPos) -> Packet {
    let mut w = PacketWriter::new(0x09);
    w.write_position(pos).write_u8(9).write_u8(0);
    w.finish()
}

pub fn multi_block_change(x: i32, z: i32) -> Packet {
    let mut w = PacketWriter::new(0x10);
    w.write_i32(x).write_i32(z).write_varint(0);
    w.finish()
}

pub fn explosion(x: f32, y: f32, z: f32) -> Packet {
    let mut w = PacketWriter::new(0x1C);
    w.write_f32(x)
        .write_f32(y)
        .write_f32(z)
        .write_f32(4.0)
        .write_i32(0)
        .write_f32(0.0)
        .write_f32(0.0)
        .write_f32(0.0);
    w.finish()
}

pub fn chunk_data(x: i32, z: i32, full: bool) -> Packet {
    let mut w = PacketWriter::new(0x20);
    w.write_i32(x)
        .write_i32(z)
        .write_bool(full)
        .write_varint(0)
        .write_varint(0)
        .write_varint(0);
    w.finish()
}

pub fn unload_chunk(x: i32, z: i32) -> Packet {
    let mut w = PacketWriter::new(0x1D);
    w.write_i32(x).write_i32(z);
    w.finish()
}

fn team_info(w: &mut PacketWriter, display_name: &str) {
    w.write_string(display_name)
        .write_string("")
        .write_string("")
        .write_u8(0)
        .write_string("always")
        .write_string("always")
        .write_i8(-1);
}

fn team_member_list(w: &mut PacketWriter, members: &[&str]) {
    w.write_varint(members.len() as i32);
    for member in members {
        w.write_string(member);
    }
}

pub fn team_create(name: &str, members: &[&str]) -> Packet {
    let mut w = PacketWriter::new(0x44);
    w.write_string(name).write_i8(0);
    team_info(&mut w, name);
    team_member_list(&mut w, members);
    w.finish()
}

pub fn team_update(name: &str, display_name: &str) -> Packet {
    let mut w = PacketWriter::new(0x44);
    w.write_string(name).write_i8(2);
    team_info(&mut w, display_name);
    w.finish()
}

pub fn team_members(name: &str, mode: i8, members: &[&str]) -> Packet {
    let mut w = PacketWriter::new(0x44);
    w.write_string(name).write_i8(mode);
    team_member_list(&mut w, members);
    w.finish()
}

pub fn team_remove(name: &str) -> Packet {
    let mut w = PacketWriter::new(0x44);
    w.write_string(name).write_i8(1);
    w.finish()
}

pub fn boss_bar_add(id: Uuid, title: &str) -> Packet {
    let mut w = PacketWriter::new(0x0C);
    w.write_uuid(id)
        .write_varint(0)
        .write_string(title)
        .write_f32(1.0)
        .write_varint(0)
        .write_varint(0)
        .write_u8(0);
    w.finish()
}

pub fn boss_bar_health(id: Uuid, health: f32) -> Packet {
    let mut w = PacketWriter::new(0x0C);
    w.write_uuid(id).write_varint(2).write_f32(health);
    w.finish()
}

pub fn boss_bar_title(id: Uuid, title: &str) -> Packet {
    let mut w = PacketWriter::new(0x0C);
    w.write_uuid(id).write_varint(3).write_string(title);
    w.finish()
}

pub fn boss_bar_remove(id: Uuid) -> Packet {
    let mut w = PacketWriter::new(0x0C);
    w.write_uuid(id).write_varint(1);
    w.finish()
}

pub fn player_list_add(id: Uuid, name: &str) -> Packet {
    let mut w = PacketWriter::new(0x2E);
    w.write_varint(0)
        .write_varint(1)
        .write_uuid(id)
        .write_string(name)
        .write_varint(1)
        .write_string("textures")
        .write_string("e30=")
        .write_bool(false)
        .write_varint(0)
        .write_varint(35)
        .write_bool(false);
    w.finish()
}

pub fn player_list_game_mode(id: Uuid, game_mode: i32) -> Packet {
    let mut w = PacketWriter::new(0x2E);
    w.write_varint(1)
        .write_varint(1)
        .write_uuid(id)
        .write_varint(game_mode);
    w.finish()
}

pub fn player_list_ping(id: Uuid, ping: i32) -> Packet {
    let mut w = PacketWriter::new(0x2E);
    w.write_varint(2)
        .write_varint(1)
        .write_uuid(id)
        .write_varint(ping);
    w.finish()
}

pub fn player_list_display_name(id: Uuid, name: Option<&str>) -> Packet {
    let mut w = PacketWriter::new(0x2E);
    w.write_varint(3).write_varint(1).write_uuid(id);
    write_optional_string(&mut w, name);
    w.finish()
}

pub fn player_list_remove(id: Uuid) -> Packet {
    let mut w = PacketWriter::new(0x2E);
    w.write_varint(4).write_varint(1).write_uuid(id);
    w.finish()
}

pub fn map_patch(id: i32, cols: u8, rows: u8, x: u8, z: u8, data: &[u8]) -> Packet {
    let mut w = PacketWriter::new(0x24);
    w.write_varint(id)
        .write_u8(0)
        .write_bool(true)
        .write_varint(0)
        .write_u8(cols)
        .write_u8(rows)
        .write_u8(x)
        .write_u8(z)
        .write_varint(data.len() as i32)
        .write_bytes(data);
    w.finish()
}

pub fn map_icons(id: i32, scale: u8, icons: &[[u8; 3]]) -> Packet {
    let mut w = PacketWriter::new(0x24);
    w.write_varint(id)
        .write_u8(scale)
        .write_bool(true)
        .write_varint(icons.len() as i32);
    for icon in icons {
        w.write_bytes(icon);
    }
    w.write_u8(0);
    w.finish()
}

pub fn window_items(window: u8, slots: &[Option<i16>]) -> Packet {
    let mut w = PacketWriter::new(0x14);
    w.write_u8(window).write_u16(slots.len() as u16);
    for slot in slots {
        write_slot(&mut w, *slot);
    }
    w.finish()
}

pub fn set_slot(window: i8, index: i16, item: Option<i16>) -> Packet {
    let mut w = PacketWriter::new(0x16);
    w.write_i8(window).write_i16(index);
    write_slot(&mut w, item);
    w.finish()
}

fn write_slot(w: &mut PacketWriter, item: Option<i16>) {
    match item {
        // id, count, damage, empty NBT
        Some(id) => {
            w.write_i16(id).write_i8(1).write_i16(0).write_u8(0);
        }
        None => {
            w.write_i16(-1);
        }
    }
}

pub fn position_and_look((x, y, z): (f64, f64, f64), flags: u8, teleport_id: i32) -> Packet {
    let mut w = PacketWriter::new(0x2F);
    w.write_f64(x)
        .write_f64(y)
        .write_f64(z)
        .write_f32(0.0)
        .write_f32(0.0)
        .write_u8(flags)
        .write_varint(teleport_id);
    w.finish()
}

pub fn keep_alive(id: i64) -> Packet {
    let mut w = PacketWriter::new(0x1F);
    w.write_i64(id);
    w.finish()
}

pub fn change_game_state(reason: u8, value: f32) -> Packet {
    let mut w = PacketWriter::new(0x1E);
    w.write_u8(reason).write_f32(value);
    w.finish()
}

pub fn held_item(slot: i8) -> Packet {
    let mut w = PacketWriter::new(0x3A);
    w.write_i8(slot);
    w.finish()
}

//! The snapshot builder: turns the world state back into packets.
//!
//! Order matters. A receiver must never see an entity, team or chunk
//! referenced before it exists, so the sequence is: world init, own
//! position, chunk logs, player list, teams, boss bars, inventory, held item,
//! cached blobs, weather, entities (spawn, metadata, properties), passengers
//! and finally maps.

use re_proto::packets::Clientbound;
use re_proto::{Packet, PacketWriter};
use tracing::debug;

use crate::error::PacketError;
use crate::metadata::{self, Metadata};
use crate::world::entity::{Entity, EntityKind};
use crate::world::inventory::{Slot, PLAYER_WINDOW_SLOTS};
use crate::world::map::MAP_SIZE;
use crate::world::{boss_bar, players};
use crate::world::team::{self, write_members};
use crate::world::WorldState;

/// Change-game-state reasons replayed for weather.
const BEGIN_RAINING: u8 = 2;
const FADE_VALUE: u8 = 7;
const FADE_TIME: u8 = 8;

impl WorldState {
    /// Build the packet sequence that brings a blank client up to date.
    ///
    /// With `first_join` the world is introduced by a join-game packet,
    /// otherwise by a respawn (for a client that is already in a world).
    pub fn snapshot(&self, first_join: bool) -> Vec<Packet> {
        let mut packets = Vec::new();

        packets.push(self.world_init(first_join));
        packets.push(self.position_and_look());

        for (_, log) in self.chunks.iter() {
            packets.extend(log.iter().cloned());
        }

        packets.push(self.player_list());

        for (name, entry) in &self.teams {
            let mut w = PacketWriter::new(Clientbound::Teams.id());
            w.write_string(name).write_i8(team::MODE_CREATE);
            entry.info.write(&mut w);
            write_members(&mut w, entry.members.iter());
            packets.push(w.finish());
        }

        for (uuid, bar) in &self.boss_bars {
            let mut w = PacketWriter::new(Clientbound::BossBar.id());
            w.write_uuid(*uuid)
                .write_varint(boss_bar::ACTION_ADD);
            bar.write(&mut w);
            packets.push(w.finish());
        }

        packets.push(self.window_items());

        if self.held_item != 0 {
            let mut w = PacketWriter::new(Clientbound::HeldItemChange.id());
            w.write_i8(self.held_item);
            packets.push(w.finish());
        }

        packets.extend(self.blobs.iter().cloned());

        if self.raining {
            packets.push(game_state(BEGIN_RAINING, 0.0));
        }
        if self.fade_value != 0.0 {
            packets.push(game_state(FADE_VALUE, self.fade_value));
        }
        if self.fade_time != 0.0 {
            packets.push(game_state(FADE_TIME, self.fade_time));
        }

        for (&eid, entity) in &self.entities {
            packets.push(spawn_packet(eid, entity));

            let has_spawn_metadata = matches!(entity.kind, EntityKind::Mob | EntityKind::Player);
            if let (Some(meta), false) = (&entity.metadata, has_spawn_metadata) {
                let mut w = PacketWriter::new(Clientbound::EntityMetadata.id());
                w.write_varint(eid);
                metadata::write_stream(&mut w, meta);
                packets.push(w.finish());
            }

            if let Some(properties) = &entity.properties {
                let mut w = PacketWriter::new(Clientbound::EntityProperties.id());
                w.write_varint(eid).write_i32(properties.len() as i32);
                for (key, span) in properties {
                    w.write_string(key).write_bytes(span);
                }
                packets.push(w.finish());
            }
        }

        for (&eid, entity) in &self.entities {
            if let Some(passengers) = &entity.passengers {
                let mut w = PacketWriter::new(Clientbound::SetPassengers.id());
                w.write_varint(eid).write_varint(passengers.len() as i32);
                for &passenger in passengers {
                    w.write_varint(passenger);
                }
                packets.push(w.finish());
            }
        }

        for (&id, map) in &self.maps {
            let mut w = PacketWriter::new(Clientbound::Map.id());
            w.write_varint(id)
                .write_u8(map.scale)
                .write_bool(map.show_icons)
                .write_varint(map.icons.len() as i32);
            for icon in &map.icons {
                w.write_bytes(icon);
            }
            w.write_u8(MAP_SIZE as u8)
                .write_u8(MAP_SIZE as u8)
                .write_u8(0)
                .write_u8(0)
                .write_varint(map.data.len() as i32)
                .write_bytes(&map.data);
            packets.push(w.finish());
        }

        packets
    }

    fn world_init(&self, first_join: bool) -> Packet {
        if first_join {
            let mut w = PacketWriter::new(Clientbound::JoinGame.id());
            w.write_i32(self.self_eid)
                .write_u8(self.game_mode)
                .write_i32(self.dimension)
                .write_u8(self.difficulty)
                .write_u8(0)
                .write_string(&self.level_type)
                .write_bool(false);
            w.finish()
        } else {
            let mut w = PacketWriter::new(Clientbound::Respawn.id());
            w.write_i32(self.dimension)
                .write_u8(self.difficulty)
                .write_u8(self.game_mode & 0x7)
                .write_string(&self.level_type);
            w.finish()
        }
    }

    fn position_and_look(&self) -> Packet {
        let pos = &self.position;
        let mut w = PacketWriter::new(Clientbound::PlayerPositionAndLook.id());
        w.write_f64(pos.x)
            .write_f64(pos.y)
            .write_f64(pos.z)
            .write_f32(pos.yaw)
            .write_f32(pos.pitch)
            .write_u8(0)
            .write_varint(0);
        w.finish()
    }

    fn player_list(&self) -> Packet {
        let mut w = PacketWriter::new(Clientbound::PlayerListItem.id());
        w.write_varint(players::ACTION_ADD)
            .write_varint(self.players.len() as i32);
        for (uuid, entry) in &self.players {
            w.write_uuid(*uuid);
            entry.write(&mut w);
        }
        w.finish()
    }

    fn window_items(&self) -> Packet {
        let mut w = PacketWriter::new(Clientbound::WindowItems.id());
        w.write_u8(0).write_i16(PLAYER_WINDOW_SLOTS);
        for index in 0..PLAYER_WINDOW_SLOTS {
            Slot::write(self.inventory.get(index), &mut w);
        }
        w.finish()
    }
}

fn game_state(reason: u8, value: f32) -> Packet {
    let mut w = PacketWriter::new(Clientbound::ChangeGameState.id());
    w.write_u8(reason).write_f32(value);
    w.finish()
}

/// Re-derive an entity's spawn packet with its current position, look,
/// velocity and metadata. Falls back to the stored packet if the template
/// cannot be walked.
fn spawn_packet(eid: i32, entity: &Entity) -> Packet {
    match resynthesize(eid, entity) {
        Ok(packet) => packet,
        Err(e) => {
            debug!("Replaying stale spawn packet for entity {eid}: {e}");
            entity.spawn.clone()
        }
    }
}

fn resynthesize(eid: i32, entity: &Entity) -> Result<Packet, PacketError> {
    let mut template = entity.spawn.reader();
    template.read_varint()?;

    let mut w = PacketWriter::new(entity.spawn.id);
    match entity.kind {
        EntityKind::Object { .. } => {
            // uuid + object type
            let head = template.read_bytes(17)?;
            // position and angles
            template.skip(26)?;
            let data = template.read_i32()?;
            w.write_varint(eid)
                .write_bytes(&head)
                .write_f64(entity.x)
                .write_f64(entity.y)
                .write_f64(entity.z)
                .write_i8(entity.pitch)
                .write_i8(entity.yaw)
                .write_i32(data)
                .write_i16(entity.vx)
                .write_i16(entity.vy)
                .write_i16(entity.vz);
        }
        EntityKind::ExperienceOrb => {
            template.skip(24)?;
            let count = template.read_i16()?;
            w.write_varint(eid)
                .write_f64(entity.x)
                .write_f64(entity.y)
                .write_f64(entity.z)
                .write_i16(count);
        }
        EntityKind::Global => {
            let global_type = template.read_u8()?;
            w.write_varint(eid)
                .write_u8(global_type)
                .write_f64(entity.x)
                .write_f64(entity.y)
                .write_f64(entity.z);
        }
        EntityKind::Mob => {
            let uuid = template.read_bytes(16)?;
            let mob_type = template.read_varint()?;
            w.write_varint(eid)
                .write_bytes(&uuid)
                .write_varint(mob_type)
                .write_f64(entity.x)
                .write_f64(entity.y)
                .write_f64(entity.z)
                .write_i8(entity.yaw)
                .write_i8(entity.pitch)
                .write_i8(entity.head_pitch.unwrap_or(entity.pitch))
                .write_i16(entity.vx)
                .write_i16(entity.vy)
                .write_i16(entity.vz);
            write_spawn_metadata(&mut w, entity.metadata.as_ref());
        }
        EntityKind::Player => {
            let uuid = template.read_bytes(16)?;
            w.write_varint(eid)
                .write_bytes(&uuid)
                .write_f64(entity.x)
                .write_f64(entity.y)
                .write_f64(entity.z)
                .write_i8(entity.yaw)
                .write_i8(entity.pitch);
            write_spawn_metadata(&mut w, entity.metadata.as_ref());
        }
        EntityKind::Painting => return Ok(entity.spawn.clone()),
    }
    Ok(w.finish())
}

fn write_spawn_metadata(w: &mut PacketWriter, meta: Option<&Metadata>) {
    match meta {
        Some(meta) => metadata::write_stream(w, meta),
        None => {
            w.write_u8(metadata::END_OF_METADATA);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;
    use re_proto::types::{BlockPos, Uuid};

    fn ids(packets: &[Packet]) -> Vec<i32> {
        packets.iter().map(|p| p.id).collect()
    }

    fn populated() -> WorldState {
        let mut state = WorldState::new();
        state.ingest(&join_game(5));
        state.ingest(&chunk_data(0, 0, true));
        state.ingest(&block_change(BlockPos::new(1, 1, 1)));
        state.ingest(&player_list_add(Uuid([3; 16]), "Alex"));
        state.ingest(&team_create("T", &["Alex"]));
        state.ingest(&boss_bar_add(Uuid([4; 16]), "Wither"));
        state.ingest(&window_items(0, &[Some(1)]));
        state.ingest(&held_item(4));
        state.ingest(&Packet::new(0x47, vec![0u8; 16]));
        state.ingest(&change_game_state(2, 0.0));
        state.ingest(&spawn_object(20, 1, (0.0, 0.0, 0.0), 0));
        state.ingest(&entity_metadata_byte(20, 0, 1));
        state.ingest(&spawn_player(7, (0.0, 0.0, 0.0)));
        state.ingest(&entity_properties(7, "generic.movementSpeed", 0.1, 0));
        state.ingest(&passengers(20, &[7]));
        state.ingest(&map_patch(1, 1, 1, 0, 0, &[9]));
        state
    }

    #[test]
    fn replay_order() {
        let packets = populated().snapshot(true);
        assert_eq!(
            ids(&packets),
            vec![
                0x23, // join game
                0x2F, // position
                0x20, 0x0B, // chunk log
                0x2E, // player list
                0x44, // team
                0x0C, // boss bar
                0x14, // inventory
                0x3A, // held item
                0x47, // time blob
                0x1E, // rain
                0x05, // player 7
                0x4E, // its properties
                0x00, // boat 20
                0x3C, // its metadata
                0x43, // passengers
                0x24, // map
            ]
        );
    }

    #[test]
    fn minimal_state() {
        let packets = WorldState::new().snapshot(false);
        assert_eq!(ids(&packets), vec![0x35, 0x2F, 0x2E, 0x14]);

        let mut r = packets[3].reader();
        assert_eq!(r.read_u8().unwrap(), 0);
        assert_eq!(r.read_i16().unwrap(), 46);
        for _ in 0..46 {
            assert_eq!(r.read_i16().unwrap(), -1);
        }
        assert!(r.is_empty());
    }

    #[test]
    fn snapshot_is_idempotent() {
        let state = populated();
        assert_eq!(state.snapshot(true), state.snapshot(true));
    }

    #[test]
    fn join_game_reflects_state() {
        let mut r = populated().snapshot(true)[0].reader();
        assert_eq!(r.read_i32().unwrap(), 5);
        assert_eq!(r.read_u8().unwrap(), 1);
        assert_eq!(r.read_i32().unwrap(), 0);
        assert_eq!(r.read_u8().unwrap(), 2);
        assert_eq!(r.read_u8().unwrap(), 0);
        assert_eq!(r.read_string().unwrap(), "flat");
        assert!(!r.read_bool().unwrap());
    }

    #[test]
    fn fade_time_uses_its_own_reason() {
        let mut state = WorldState::new();
        state.ingest(&change_game_state(7, 0.25));
        state.ingest(&change_game_state(8, 3.0));
        let packets = state.snapshot(true);
        let fades: Vec<(u8, f32)> = packets
            .iter()
            .filter(|p| p.id == 0x1E)
            .map(|p| {
                let mut r = p.reader();
                (r.read_u8().unwrap(), r.read_f32().unwrap())
            })
            .collect();
        assert_eq!(fades, vec![(7, 0.25), (8, 3.0)]);
    }

    #[test]
    fn spawn_player_carries_current_position() {
        let mut state = WorldState::new();
        state.ingest(&spawn_player(7, (0.0, 0.0, 0.0)));
        state.ingest(&look_and_move(7, 4096, 0, 0, 32, 0));

        let spawn = state
            .snapshot(true)
            .into_iter()
            .find(|p| p.id == 0x05)
            .unwrap();
        let mut r = spawn.reader();
        assert_eq!(r.read_varint().unwrap(), 7);
        assert_eq!(r.read_uuid().unwrap(), uuid_for(7));
        assert_eq!(r.read_f64().unwrap(), 1.0);
        assert_eq!(r.read_f64().unwrap(), 0.0);
        assert_eq!(r.read_f64().unwrap(), 0.0);
        assert_eq!(r.read_i8().unwrap(), 32);
        assert_eq!(r.read_i8().unwrap(), 0);
        // metadata stream: flags byte, terminator
        assert_eq!(&r.read_rest()[..], &[0, 0, 0, 0xff]);
    }

    #[test]
    fn spawn_object_keeps_template_fields() {
        let mut state = WorldState::new();
        state.ingest(&spawn_object(30, 60, (1.0, 2.0, 3.0), 1234));
        state.ingest(&velocity(30, 0, 0, 0));

        let spawn = state
            .snapshot(true)
            .into_iter()
            .find(|p| p.id == 0x00)
            .unwrap();
        let mut r = spawn.reader();
        assert_eq!(r.read_varint().unwrap(), 30);
        assert_eq!(r.read_uuid().unwrap(), uuid_for(30));
        assert_eq!(r.read_i8().unwrap(), 60);
        assert_eq!(r.read_f64().unwrap(), 1.0);
        r.skip(16 + 2).unwrap();
        assert_eq!(r.read_i32().unwrap(), 1234);
        assert_eq!(r.read_i16().unwrap(), 0);
        r.skip(4).unwrap();
        assert!(r.is_empty());
    }

    #[test]
    fn unchanged_orb_and_mob_match_their_spawn() {
        let mut state = WorldState::new();
        let orb = spawn_orb(1, (1.0, 2.0, 3.0), 11);
        let mob = spawn_mob(2, (4.0, 5.0, 6.0));
        let painting = spawn_painting(3);
        state.ingest(&orb);
        state.ingest(&mob);
        state.ingest(&painting);

        let packets = state.snapshot(true);
        let spawns: Vec<&Packet> = packets.iter().filter(|p| p.id <= 0x05).collect();
        assert_eq!(spawns, vec![&orb, &mob, &painting]);
    }

    #[test]
    fn destroyed_entities_leave_the_snapshot() {
        let mut state = populated();
        state.ingest(&destroy(&[7, 20]));
        let packets = state.snapshot(true);
        assert!(packets
            .iter()
            .all(|p| ![0x00, 0x05, 0x3C, 0x4E, 0x43].contains(&p.id)));
    }

    #[test]
    fn map_is_sent_whole() {
        let packets = populated().snapshot(true);
        let map = packets.last().unwrap();
        let mut r = map.reader();
        assert_eq!(r.read_varint().unwrap(), 1);
        r.skip(2).unwrap();
        assert_eq!(r.read_varint().unwrap(), 0);
        assert_eq!(r.read_u8().unwrap(), 128);
        assert_eq!(r.read_u8().unwrap(), 128);
        assert_eq!(r.read_u8().unwrap(), 0);
        assert_eq!(r.read_u8().unwrap(), 0);
        assert_eq!(r.read_varint().unwrap(), 16384);
        let data = r.read_rest();
        assert_eq!(data.len(), 16384);
        assert_eq!(data[0], 9);
    }
}

//! The ingestion engine: applies upstream packets to the world state.
//!
//! Packets must be applied strictly in arrival order. Unknown kinds are
//! ignored, and updates aimed at something that is not tracked (an entity
//! that was never spawned, an unloaded chunk, a missing team or boss bar)
//! are dropped, counted in [`IngestStats`](crate::world::IngestStats) and
//! logged at `trace`.

use bytes::Bytes;
use re_proto::packets::{Clientbound, Serverbound};
use re_proto::types::ChunkPos;
use re_proto::{Packet, PacketReader, PacketWriter};
use tracing::{debug, trace};

use crate::error::PacketError;
use crate::metadata;
use crate::world::boss_bar::{self, BossBar};
use crate::world::entity::{Entity, EntityKind};
use crate::world::inventory::Slot;
use crate::world::map::MapData;
use crate::world::players::{self, read_optional_string, PlayerListEntry};
use crate::world::team::{self, read_members, Team, TeamInfo};
use crate::world::WorldState;

/// Change-game-state reasons the store tracks.
mod game_state {
    pub const STOP_RAIN: u8 = 1;
    pub const START_RAIN: u8 = 2;
    pub const CHANGE_GAME_MODE: u8 = 3;
    pub const FADE_VALUE: u8 = 7;
    pub const FADE_TIME: u8 = 8;
}

/// Relative-position bits of the player-position-and-look flags.
mod relative {
    pub const X: u8 = 0x01;
    pub const Y: u8 = 0x02;
    pub const Z: u8 = 0x04;
    pub const YAW: u8 = 0x08;
    pub const PITCH: u8 = 0x10;
}

/// Only the player's own window is mirrored.
const PLAYER_WINDOW: u8 = 0;

impl WorldState {
    /// Apply one upstream packet.
    ///
    /// Returns a packet that must be sent back upstream immediately, if the
    /// protocol requires one (teleport confirmation, keep-alive answer).
    pub fn ingest(&mut self, packet: &Packet) -> Option<Packet> {
        self.stats.packets += 1;
        match self.apply(packet) {
            Ok(reply) => reply,
            Err(e) => {
                self.stats.decode_failures += 1;
                debug!("Failed to apply packet 0x{:02x}: {e}", packet.id);
                None
            }
        }
    }

    fn apply(&mut self, packet: &Packet) -> Result<Option<Packet>, PacketError> {
        let mut r = packet.reader();
        match Clientbound::from_id(packet.id) {
            Clientbound::SpawnObject => self.spawn_object(&mut r, packet)?,
            Clientbound::SpawnExperienceOrb => {
                let eid = r.read_varint()?;
                let mut entity = Entity::new(EntityKind::ExperienceOrb, packet.clone());
                entity.set_position(r.read_f64()?, r.read_f64()?, r.read_f64()?);
                self.entities.insert(eid, entity);
            }
            Clientbound::SpawnGlobalEntity => {
                let eid = r.read_varint()?;
                r.skip(1)?;
                let mut entity = Entity::new(EntityKind::Global, packet.clone());
                entity.set_position(r.read_f64()?, r.read_f64()?, r.read_f64()?);
                self.entities.insert(eid, entity);
            }
            Clientbound::SpawnMob => self.spawn_mob(&mut r, packet)?,
            Clientbound::SpawnPainting => {
                let eid = r.read_varint()?;
                self.entities
                    .insert(eid, Entity::new(EntityKind::Painting, packet.clone()));
            }
            Clientbound::SpawnPlayer => self.spawn_player(&mut r, packet)?,

            Clientbound::BlockChange | Clientbound::UpdateBlockEntity => {
                let pos = r.read_position()?.chunk_pos();
                self.patch_chunk(pos, packet);
            }
            Clientbound::MultiBlockChange => {
                let pos = ChunkPos::new(r.read_i32()?, r.read_i32()?);
                self.patch_chunk(pos, packet);
            }
            Clientbound::Explosion => {
                let x = r.read_f32()?;
                let _y = r.read_f32()?;
                let z = r.read_f32()?;
                self.patch_chunk(ChunkPos::containing(x.into(), z.into()), packet);
            }
            Clientbound::ChunkData => {
                let pos = ChunkPos::new(r.read_i32()?, r.read_i32()?);
                if r.read_bool()? {
                    self.chunks.seed(pos, packet.clone());
                } else {
                    self.patch_chunk(pos, packet);
                }
            }
            Clientbound::UnloadChunk => {
                let pos = ChunkPos::new(r.read_i32()?, r.read_i32()?);
                self.chunks.unload(pos);
            }

            Clientbound::BossBar => self.boss_bar(&mut r)?,
            Clientbound::PlayerListItem => self.player_list_item(&mut r)?,
            Clientbound::Teams => self.teams(&mut r)?,
            Clientbound::Map => self.map(&mut r)?,

            Clientbound::WindowItems => {
                if r.read_u8()? == PLAYER_WINDOW {
                    let count = r.read_u16()?;
                    for index in 0..count {
                        let slot = Slot::read(&mut r)?;
                        if let Ok(index) = i16::try_from(index) {
                            self.inventory.set(index, slot);
                        }
                    }
                }
            }
            Clientbound::SetSlot => {
                if r.read_i8()? == PLAYER_WINDOW as i8 {
                    let index = r.read_i16()?;
                    let slot = Slot::read(&mut r)?;
                    self.inventory.set(index, slot);
                }
            }
            Clientbound::HeldItemChange => self.held_item = r.read_i8()?,

            Clientbound::JoinGame => {
                self.self_eid = r.read_i32()?;
                self.game_mode = r.read_u8()?;
                self.dimension = r.read_i32()?;
                self.difficulty = r.read_u8()?;
                let _max_players = r.read_u8()?;
                self.level_type = r.read_string()?;
                debug!(
                    "Joined as entity {} in dimension {}",
                    self.self_eid, self.dimension
                );
            }
            Clientbound::Respawn => self.respawn(&mut r)?,
            Clientbound::ServerDifficulty => self.difficulty = r.read_u8()?,
            Clientbound::ChangeGameState => {
                let reason = r.read_u8()?;
                let value = r.read_f32()?;
                match reason {
                    game_state::STOP_RAIN => self.raining = false,
                    game_state::START_RAIN => self.raining = true,
                    game_state::CHANGE_GAME_MODE => self.game_mode = value as u8,
                    game_state::FADE_VALUE => self.fade_value = value,
                    game_state::FADE_TIME => self.fade_time = value,
                    _ => {}
                }
            }

            Clientbound::PlayerAbilities => self.blobs.abilities = Some(packet.clone()),
            Clientbound::UpdateHealth => self.blobs.health = Some(packet.clone()),
            Clientbound::SetExperience => self.blobs.experience = Some(packet.clone()),
            Clientbound::PlayerListHeaderFooter => self.blobs.tab_list = Some(packet.clone()),
            Clientbound::TimeUpdate => self.blobs.time = Some(packet.clone()),
            Clientbound::SpawnPosition => self.blobs.spawn_position = Some(packet.clone()),

            Clientbound::EntityRelativeMove | Clientbound::EntityLookAndRelativeMove => {
                let eid = r.read_varint()?;
                if let Some(entity) = self.tracked_entity(eid, packet.id) {
                    entity.move_relative(r.read_i16()?, r.read_i16()?, r.read_i16()?);
                    if packet.id == Clientbound::EntityLookAndRelativeMove.id() {
                        entity.yaw = r.read_i8()?;
                        entity.pitch = r.read_i8()?;
                    }
                }
            }
            Clientbound::EntityLook => {
                let eid = r.read_varint()?;
                if let Some(entity) = self.tracked_entity(eid, packet.id) {
                    entity.yaw = r.read_i8()?;
                    entity.pitch = r.read_i8()?;
                }
            }
            Clientbound::EntityHeadLook => {
                let eid = r.read_varint()?;
                if let Some(entity) = self.tracked_entity(eid, packet.id) {
                    entity.head_pitch = Some(r.read_i8()?);
                }
            }
            Clientbound::EntityTeleport => {
                let eid = r.read_varint()?;
                if let Some(entity) = self.tracked_entity(eid, packet.id) {
                    entity.set_position(r.read_f64()?, r.read_f64()?, r.read_f64()?);
                    entity.yaw = r.read_i8()?;
                    entity.pitch = r.read_i8()?;
                }
            }
            Clientbound::EntityVelocity => {
                let eid = r.read_varint()?;
                if let Some(entity) = self.tracked_entity(eid, packet.id) {
                    entity.vx = r.read_i16()?;
                    entity.vy = r.read_i16()?;
                    entity.vz = r.read_i16()?;
                }
            }
            Clientbound::EntityMetadata => {
                let eid = r.read_varint()?;
                if let Some(entity) = self.tracked_entity(eid, packet.id) {
                    metadata::read_stream(&mut r, entity.metadata_mut())?;
                }
            }
            Clientbound::EntityProperties => {
                let eid = r.read_varint()?;
                if let Some(entity) = self.tracked_entity(eid, packet.id) {
                    read_properties(&mut r, entity)?;
                }
            }
            Clientbound::SetPassengers => self.set_passengers(&mut r)?,
            Clientbound::DestroyEntities => {
                let count = r.read_varint()?;
                for _ in 0..count {
                    let eid = r.read_varint()?;
                    self.entities.remove(&eid);
                    if self.riding == Some(eid) {
                        self.riding = None;
                    }
                }
            }

            Clientbound::VehicleMove => {
                let (x, y, z) = (r.read_f64()?, r.read_f64()?, r.read_f64()?);
                self.move_self_with_vehicle(x, y, z);
            }
            Clientbound::PlayerPositionAndLook => {
                return self.player_position_and_look(&mut r).map(Some);
            }
            Clientbound::KeepAlive => {
                let mut w = PacketWriter::new(Serverbound::KeepAlive.id());
                w.write_i64(r.read_i64()?);
                return Ok(Some(w.finish()));
            }

            // Only relevant to identity remapping, or not mirrored at all.
            Clientbound::Animation
            | Clientbound::BlockBreakAnimation
            | Clientbound::EntityStatus
            | Clientbound::UseBed
            | Clientbound::RemoveEntityEffect
            | Clientbound::Camera
            | Clientbound::AttachEntity
            | Clientbound::EntityEquipment
            | Clientbound::CollectItem
            | Clientbound::EntityEffect
            | Clientbound::Other(_) => {}
        }
        Ok(None)
    }

    /// Look up an entity for an update, counting the miss.
    fn tracked_entity(&mut self, eid: i32, packet_id: i32) -> Option<&mut Entity> {
        let entity = self.entities.get_mut(&eid);
        if entity.is_none() {
            self.stats.dropped_entity_updates += 1;
            trace!("Dropped packet 0x{packet_id:02x} for untracked entity {eid}");
        }
        entity
    }

    fn patch_chunk(&mut self, pos: ChunkPos, packet: &Packet) {
        if !self.chunks.append(pos, packet.clone()) {
            self.stats.dropped_chunk_patches += 1;
            trace!(
                "Dropped packet 0x{:02x} for unloaded chunk {pos}",
                packet.id
            );
        }
    }

    fn spawn_object(&mut self, r: &mut PacketReader, packet: &Packet) -> Result<(), PacketError> {
        let eid = r.read_varint()?;
        r.skip(16)?;
        let object_type = r.read_i8()?;
        let mut entity = Entity::new(EntityKind::Object { object_type }, packet.clone());
        entity.set_position(r.read_f64()?, r.read_f64()?, r.read_f64()?);
        entity.pitch = r.read_i8()?;
        entity.yaw = r.read_i8()?;
        let _data = r.read_i32()?;
        entity.vx = r.read_i16()?;
        entity.vy = r.read_i16()?;
        entity.vz = r.read_i16()?;
        self.entities.insert(eid, entity);
        Ok(())
    }

    fn spawn_mob(&mut self, r: &mut PacketReader, packet: &Packet) -> Result<(), PacketError> {
        let eid = r.read_varint()?;
        r.skip(16)?;
        let _mob_type = r.read_varint()?;
        let mut entity = Entity::new(EntityKind::Mob, packet.clone());
        entity.set_position(r.read_f64()?, r.read_f64()?, r.read_f64()?);
        entity.yaw = r.read_i8()?;
        entity.pitch = r.read_i8()?;
        entity.head_pitch = Some(r.read_i8()?);
        entity.vx = r.read_i16()?;
        entity.vy = r.read_i16()?;
        entity.vz = r.read_i16()?;
        metadata::read_stream(r, entity.metadata_mut())?;
        self.entities.insert(eid, entity);
        Ok(())
    }

    fn spawn_player(&mut self, r: &mut PacketReader, packet: &Packet) -> Result<(), PacketError> {
        let eid = r.read_varint()?;
        r.skip(16)?;
        let mut entity = Entity::new(EntityKind::Player, packet.clone());
        entity.set_position(r.read_f64()?, r.read_f64()?, r.read_f64()?);
        entity.yaw = r.read_i8()?;
        entity.pitch = r.read_i8()?;
        metadata::read_stream(r, entity.metadata_mut())?;
        self.entities.insert(eid, entity);
        Ok(())
    }

    fn boss_bar(&mut self, r: &mut PacketReader) -> Result<(), PacketError> {
        let uuid = r.read_uuid()?;
        let action = r.read_varint()?;
        if action == boss_bar::ACTION_ADD {
            self.boss_bars.insert(uuid, BossBar::read(r)?);
            return Ok(());
        }
        let Some(bar) = self.boss_bars.get_mut(&uuid) else {
            self.stats.dropped_boss_bar_updates += 1;
            trace!("Dropped action {action} for unknown boss bar {uuid}");
            return Ok(());
        };
        if action == boss_bar::ACTION_REMOVE {
            self.boss_bars.remove(&uuid);
        } else {
            bar.update(action, r)?;
        }
        Ok(())
    }

    fn player_list_item(&mut self, r: &mut PacketReader) -> Result<(), PacketError> {
        let action = r.read_varint()?;
        let count = r.read_varint()?;
        for _ in 0..count {
            let uuid = r.read_uuid()?;
            match action {
                players::ACTION_ADD => {
                    self.players.insert(uuid, PlayerListEntry::read(r)?);
                }
                players::ACTION_UPDATE_GAME_MODE => {
                    let game_mode = r.read_varint()?;
                    if let Some(entry) = self.players.get_mut(&uuid) {
                        entry.game_mode = game_mode;
                    }
                }
                players::ACTION_UPDATE_LATENCY => {
                    let ping = r.read_varint()?;
                    if let Some(entry) = self.players.get_mut(&uuid) {
                        entry.ping = ping;
                    }
                }
                players::ACTION_UPDATE_DISPLAY_NAME => {
                    let display_name = read_optional_string(r)?;
                    if let Some(entry) = self.players.get_mut(&uuid) {
                        entry.display_name = display_name;
                    }
                }
                players::ACTION_REMOVE => {
                    self.players.remove(&uuid);
                }
                _ => return Ok(()),
            }
        }
        Ok(())
    }

    fn teams(&mut self, r: &mut PacketReader) -> Result<(), PacketError> {
        let name = r.read_string()?;
        let mode = r.read_i8()?;
        match mode {
            team::MODE_CREATE => {
                let info = TeamInfo::read(r)?;
                let members = read_members(r)?.into_iter().collect();
                self.teams.insert(name, Team { info, members });
            }
            team::MODE_REMOVE => {
                self.teams.remove(&name);
            }
            team::MODE_UPDATE_INFO => {
                let info = TeamInfo::read(r)?;
                match self.teams.get_mut(&name) {
                    Some(team) => team.info = info,
                    None => self.drop_team_update(&name, mode),
                }
            }
            team::MODE_ADD_MEMBERS | team::MODE_REMOVE_MEMBERS => {
                let members = read_members(r)?;
                let Some(team) = self.teams.get_mut(&name) else {
                    self.drop_team_update(&name, mode);
                    return Ok(());
                };
                for member in members {
                    if mode == team::MODE_ADD_MEMBERS {
                        team.members.insert(member);
                    } else {
                        team.members.remove(&member);
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn drop_team_update(&mut self, name: &str, mode: i8) {
        self.stats.dropped_team_updates += 1;
        trace!("Dropped mode {mode} update for unknown team {name:?}");
    }

    fn map(&mut self, r: &mut PacketReader) -> Result<(), PacketError> {
        let id = r.read_varint()?;
        let scale = r.read_u8()?;
        let show_icons = r.read_bool()?;
        let icon_count = r.read_varint()?;
        let mut icons: Vec<Bytes> = Vec::with_capacity(icon_count.clamp(0, 64) as usize);
        for _ in 0..icon_count {
            icons.push(r.read_bytes(3)?);
        }

        let map = self
            .maps
            .entry(id)
            .or_insert_with(|| MapData::new(scale, show_icons, Vec::new()));
        map.scale = scale;
        map.show_icons = show_icons;
        map.icons = icons;

        let cols = r.read_u8()?;
        if cols == 0 {
            return Ok(());
        }
        let rows = r.read_u8()?;
        let x = r.read_u8()?;
        let z = r.read_u8()?;
        let len = r.read_varint()?;
        if len < 0 {
            return Err(re_proto::ProtoError::NegativeLength(len).into());
        }
        let data = r.read_bytes(len as usize)?;
        map.apply_patch(cols.into(), rows.into(), x.into(), z.into(), &data);
        Ok(())
    }

    fn respawn(&mut self, r: &mut PacketReader) -> Result<(), PacketError> {
        let dimension = r.read_i32()?;
        self.difficulty = r.read_u8()?;
        self.game_mode = r.read_u8()?;
        self.level_type = r.read_string()?;
        if dimension != self.dimension {
            debug!("Dimension change {} -> {dimension}", self.dimension);
            self.chunks.clear();
            self.entities.clear();
            self.riding = None;
        }
        self.dimension = dimension;
        self.maps.clear();
        Ok(())
    }

    fn set_passengers(&mut self, r: &mut PacketReader) -> Result<(), PacketError> {
        let vehicle = r.read_varint()?;
        if !self.entities.contains_key(&vehicle) {
            self.stats.dropped_entity_updates += 1;
            trace!("Dropped passengers for untracked entity {vehicle}");
            return Ok(());
        }
        let count = r.read_varint()?;
        let mut passengers = Vec::with_capacity(count.clamp(0, 16) as usize);
        for _ in 0..count {
            passengers.push(r.read_varint()?);
        }

        if self.riding == Some(vehicle) {
            self.riding = None;
        }
        if passengers.contains(&self.self_eid) {
            self.riding = Some(vehicle);
        }
        if let Some(entity) = self.entities.get_mut(&vehicle) {
            entity.passengers = Some(passengers);
        }
        Ok(())
    }

    fn player_position_and_look(&mut self, r: &mut PacketReader) -> Result<Packet, PacketError> {
        let (x, y, z) = (r.read_f64()?, r.read_f64()?, r.read_f64()?);
        let (yaw, pitch) = (r.read_f32()?, r.read_f32()?);
        let flags = r.read_u8()?;
        let teleport_id = r.read_varint()?;

        let pos = &mut self.position;
        pos.x = if flags & relative::X != 0 { pos.x + x } else { x };
        pos.y = if flags & relative::Y != 0 { pos.y + y } else { y };
        pos.z = if flags & relative::Z != 0 { pos.z + z } else { z };
        pos.yaw = if flags & relative::YAW != 0 { pos.yaw + yaw } else { yaw };
        pos.pitch = if flags & relative::PITCH != 0 {
            pos.pitch + pitch
        } else {
            pitch
        };

        let mut w = PacketWriter::new(Serverbound::TeleportConfirm.id());
        w.write_varint(teleport_id);
        Ok(w.finish())
    }
}

/// Merge an entity-properties packet body into the entity's property map.
fn read_properties(r: &mut PacketReader, entity: &mut Entity) -> Result<(), PacketError> {
    let count = r.read_i32()?;
    for _ in 0..count {
        let key = r.read_string()?;
        let start = r.position();
        r.skip(8)?;
        let modifiers = r.read_varint()?;
        // uuid + f64 amount + operation byte
        r.skip(25 * modifiers.max(0) as usize)?;
        entity.properties_mut().insert(key, r.slice_from(start));
    }
    Ok(())
}

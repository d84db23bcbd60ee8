//! The world state store: everything a freshly joined client would know.

pub mod boss_bar;
pub mod chunk;
pub mod entity;
pub mod inventory;
pub mod map;
pub mod players;
pub mod team;

use std::collections::BTreeMap;

use re_proto::types::Uuid;
use re_proto::Packet;

use self::boss_bar::BossBar;
use self::chunk::ChunkStore;
use self::entity::Entity;
use self::inventory::Inventory;
use self::map::MapData;
use self::players::PlayerListEntry;
use self::team::Team;

/// Position and look of the upstream player.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlayerPosition {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub yaw: f32,
    pub pitch: f32,
}

/// Packets whose latest copy is all a client needs. Never decoded.
#[derive(Debug, Clone, Default)]
pub struct Blobs {
    pub abilities: Option<Packet>,
    pub health: Option<Packet>,
    pub experience: Option<Packet>,
    pub tab_list: Option<Packet>,
    pub time: Option<Packet>,
    pub spawn_position: Option<Packet>,
}

impl Blobs {
    /// Replay order.
    pub fn iter(&self) -> impl Iterator<Item = &Packet> {
        [
            &self.abilities,
            &self.health,
            &self.experience,
            &self.tab_list,
            &self.time,
            &self.spawn_position,
        ]
        .into_iter()
        .flatten()
    }
}

/// Counters for packets the ingestion engine could not apply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub packets: u64,
    pub dropped_chunk_patches: u64,
    pub dropped_entity_updates: u64,
    pub dropped_team_updates: u64,
    pub dropped_boss_bar_updates: u64,
    pub decode_failures: u64,
}

/// Mirror of the upstream session's world.
#[derive(Debug, Clone)]
pub struct WorldState {
    pub self_eid: i32,
    pub game_mode: u8,
    pub dimension: i32,
    pub difficulty: u8,
    pub level_type: String,
    pub held_item: i8,
    /// Vehicle the upstream player is sitting in.
    pub riding: Option<i32>,
    pub raining: bool,
    pub fade_value: f32,
    pub fade_time: f32,
    pub position: PlayerPosition,
    pub blobs: Blobs,

    pub entities: BTreeMap<i32, Entity>,
    pub chunks: ChunkStore,
    pub players: BTreeMap<Uuid, PlayerListEntry>,
    pub teams: BTreeMap<String, Team>,
    pub boss_bars: BTreeMap<Uuid, BossBar>,
    pub maps: BTreeMap<i32, MapData>,
    pub inventory: Inventory,

    pub(crate) stats: IngestStats,
}

impl Default for WorldState {
    fn default() -> Self {
        Self::new()
    }
}

impl WorldState {
    pub fn new() -> Self {
        Self {
            self_eid: 0,
            game_mode: 0,
            dimension: 0,
            difficulty: 0,
            level_type: "default".to_string(),
            held_item: 0,
            riding: None,
            raining: false,
            fade_value: 0.0,
            fade_time: 0.0,
            position: PlayerPosition::default(),
            blobs: Blobs::default(),
            entities: BTreeMap::new(),
            chunks: ChunkStore::new(),
            players: BTreeMap::new(),
            teams: BTreeMap::new(),
            boss_bars: BTreeMap::new(),
            maps: BTreeMap::new(),
            inventory: Inventory::default(),
            stats: IngestStats::default(),
        }
    }

    pub fn stats(&self) -> IngestStats {
        self.stats
    }

    pub fn entity(&self, eid: i32) -> Option<&Entity> {
        self.entities.get(&eid)
    }

    /// Move the upstream player, dragging the ridden vehicle along.
    pub fn move_self_with_vehicle(&mut self, x: f64, y: f64, z: f64) {
        if let Some(vehicle) = self.riding.and_then(|eid| self.entities.get_mut(&eid)) {
            vehicle.set_position(x, y, z);
        }
        self.position.x = x;
        self.position.y = y;
        self.position.z = z;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use entity::EntityKind;

    #[test]
    fn defaults() {
        let state = WorldState::new();
        assert_eq!(state.level_type, "default");
        assert_eq!(state.riding, None);
        assert_eq!(state.stats(), IngestStats::default());
        assert_eq!(state.blobs.iter().count(), 0);
    }

    #[test]
    fn blobs_replay_in_fixed_order() {
        let blob = |id| Some(Packet::new(id, Bytes::new()));
        let blobs = Blobs {
            spawn_position: blob(0x46),
            health: blob(0x41),
            abilities: blob(0x2C),
            ..Blobs::default()
        };
        let ids: Vec<i32> = blobs.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![0x2C, 0x41, 0x46]);
    }

    #[test]
    fn vehicle_follows_self() {
        let mut state = WorldState::new();
        state.entities.insert(
            12,
            Entity::new(EntityKind::Object { object_type: 1 }, Packet::new(0, Bytes::new())),
        );
        state.riding = Some(12);
        state.move_self_with_vehicle(1.0, 2.0, 3.0);
        assert_eq!((state.position.x, state.position.y, state.position.z), (1.0, 2.0, 3.0));
        let boat = state.entity(12).unwrap();
        assert_eq!((boat.x, boat.y, boat.z), (1.0, 2.0, 3.0));
    }
}

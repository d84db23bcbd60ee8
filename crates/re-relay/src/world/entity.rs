//! Tracked entities.

use std::collections::BTreeMap;

use bytes::Bytes;
use re_proto::Packet;

use crate::metadata::Metadata;

/// Object type id of a firework rocket.
pub const OBJECT_FIREWORK_ROCKET: i8 = 76;

/// Relative moves are in 1/4096 of a block.
const RELATIVE_MOVE_SCALE: f64 = 4096.0;

/// Which spawn packet created the entity. Determines how it is re-synthesized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Object { object_type: i8 },
    ExperienceOrb,
    Global,
    Mob,
    Painting,
    Player,
}

/// One entity as a client would currently see it.
#[derive(Debug, Clone)]
pub struct Entity {
    pub kind: EntityKind,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub vx: i16,
    pub vy: i16,
    pub vz: i16,
    pub yaw: i8,
    pub pitch: i8,
    pub head_pitch: Option<i8>,
    /// The spawn packet as received, used as a layout template.
    pub spawn: Packet,
    pub metadata: Option<Metadata>,
    /// Property key -> raw `value + modifiers` span.
    pub properties: Option<BTreeMap<String, Bytes>>,
    pub passengers: Option<Vec<i32>>,
}

impl Entity {
    pub fn new(kind: EntityKind, spawn: Packet) -> Self {
        Self {
            kind,
            x: 0.0,
            y: 0.0,
            z: 0.0,
            vx: 0,
            vy: 0,
            vz: 0,
            yaw: 0,
            pitch: 0,
            head_pitch: None,
            spawn,
            metadata: None,
            properties: None,
            passengers: None,
        }
    }

    pub fn is_firework(&self) -> bool {
        self.kind
            == EntityKind::Object {
                object_type: OBJECT_FIREWORK_ROCKET,
            }
    }

    pub fn set_position(&mut self, x: f64, y: f64, z: f64) {
        self.x = x;
        self.y = y;
        self.z = z;
    }

    pub fn move_relative(&mut self, dx: i16, dy: i16, dz: i16) {
        self.x += f64::from(dx) / RELATIVE_MOVE_SCALE;
        self.y += f64::from(dy) / RELATIVE_MOVE_SCALE;
        self.z += f64::from(dz) / RELATIVE_MOVE_SCALE;
    }

    pub fn metadata_mut(&mut self) -> &mut Metadata {
        self.metadata.get_or_insert_with(Metadata::new)
    }

    pub fn properties_mut(&mut self) -> &mut BTreeMap<String, Bytes> {
        self.properties.get_or_insert_with(BTreeMap::new)
    }
}

//! Per-connection identity remapping.
//!
//! Every downstream is told it is entity `client_eid`. Clientbound packets
//! that mention the upstream's own entity id are rewritten to that id, and
//! serverbound entity actions are rewritten back. Serverbound movement does
//! not need rewriting: it drives the single upstream player, so it updates
//! the shared world state instead.

use re_proto::packets::{Clientbound, Serverbound};
use re_proto::{Packet, PacketReader, PacketWriter};
use tracing::debug;

use crate::error::PacketError;
use crate::metadata::{self, END_OF_METADATA, TYPE_VARINT};
use crate::world::WorldState;

/// Metadata index holding the entity that used a firework rocket.
const FIREWORK_BOOSTED_ENTITY: u8 = 7;

/// Identity rewrite context of one downstream connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Remapper {
    pub client_eid: i32,
}

impl Remapper {
    pub fn new(client_eid: i32) -> Self {
        Self { client_eid }
    }

    /// Rewrite a packet headed to the downstream.
    ///
    /// Packets that cannot be walked are passed through unchanged.
    pub fn clientbound(&self, state: &WorldState, packet: &Packet) -> Packet {
        if state.self_eid == self.client_eid {
            return packet.clone();
        }
        match self.rewrite_clientbound(state, packet) {
            Ok(Some(rewritten)) => rewritten,
            Ok(None) => packet.clone(),
            Err(e) => {
                debug!("Passing packet 0x{:02x} through unmapped: {e}", packet.id);
                packet.clone()
            }
        }
    }

    /// Apply a packet coming from the downstream and rewrite it for upstream.
    ///
    /// Movement, look and held-item packets update `state`.
    pub fn serverbound(&self, state: &mut WorldState, packet: &Packet) -> Packet {
        match self.rewrite_serverbound(state, packet) {
            Ok(Some(rewritten)) => rewritten,
            Ok(None) => packet.clone(),
            Err(e) => {
                debug!("Forwarding packet 0x{:02x} unmapped: {e}", packet.id);
                packet.clone()
            }
        }
    }

    fn to_client(&self, state: &WorldState, eid: i32) -> i32 {
        if eid == state.self_eid {
            self.client_eid
        } else {
            eid
        }
    }

    fn rewrite_clientbound(
        &self,
        state: &WorldState,
        packet: &Packet,
    ) -> Result<Option<Packet>, PacketError> {
        let mut r = packet.reader();
        let mut w = PacketWriter::new(packet.id);
        match Clientbound::from_id(packet.id) {
            Clientbound::Animation
            | Clientbound::BlockBreakAnimation
            | Clientbound::EntityRelativeMove
            | Clientbound::EntityLookAndRelativeMove
            | Clientbound::EntityLook
            | Clientbound::UseBed
            | Clientbound::RemoveEntityEffect
            | Clientbound::EntityHeadLook
            | Clientbound::Camera
            | Clientbound::EntityVelocity
            | Clientbound::EntityEquipment
            | Clientbound::EntityTeleport
            | Clientbound::EntityProperties
            | Clientbound::EntityEffect => {
                w.write_varint(self.to_client(state, r.read_varint()?));
            }
            Clientbound::EntityStatus | Clientbound::JoinGame => {
                w.write_i32(self.to_client(state, r.read_i32()?));
            }
            Clientbound::AttachEntity => {
                w.write_i32(self.to_client(state, r.read_i32()?))
                    .write_i32(self.to_client(state, r.read_i32()?));
            }
            Clientbound::CollectItem => {
                w.write_varint(self.to_client(state, r.read_varint()?))
                    .write_varint(self.to_client(state, r.read_varint()?));
            }
            Clientbound::SetPassengers => {
                let vehicle = r.read_varint()?;
                let count = r.read_varint()?;
                w.write_varint(self.to_client(state, vehicle))
                    .write_varint(count);
                for _ in 0..count {
                    w.write_varint(self.to_client(state, r.read_varint()?));
                }
            }
            Clientbound::EntityMetadata => {
                let eid = r.read_varint()?;
                w.write_varint(self.to_client(state, eid));
                if state.entity(eid).is_some_and(|e| e.is_firework()) {
                    self.rewrite_firework_metadata(state, &mut r, &mut w)?;
                }
            }

            Clientbound::SpawnObject
            | Clientbound::SpawnExperienceOrb
            | Clientbound::SpawnGlobalEntity
            | Clientbound::SpawnMob
            | Clientbound::SpawnPainting
            | Clientbound::SpawnPlayer
            | Clientbound::UpdateBlockEntity
            | Clientbound::BlockChange
            | Clientbound::BossBar
            | Clientbound::ServerDifficulty
            | Clientbound::MultiBlockChange
            | Clientbound::WindowItems
            | Clientbound::SetSlot
            | Clientbound::Explosion
            | Clientbound::UnloadChunk
            | Clientbound::ChangeGameState
            | Clientbound::KeepAlive
            | Clientbound::ChunkData
            | Clientbound::Map
            | Clientbound::VehicleMove
            | Clientbound::PlayerAbilities
            | Clientbound::PlayerListItem
            | Clientbound::PlayerPositionAndLook
            | Clientbound::DestroyEntities
            | Clientbound::Respawn
            | Clientbound::HeldItemChange
            | Clientbound::SetExperience
            | Clientbound::UpdateHealth
            | Clientbound::Teams
            | Clientbound::SpawnPosition
            | Clientbound::TimeUpdate
            | Clientbound::PlayerListHeaderFooter
            | Clientbound::Other(_) => return Ok(None),
        }
        w.write_bytes(&r.read_rest());
        Ok(Some(w.finish()))
    }

    /// Copy metadata entries up to the firework's booster field, rewriting it.
    /// Whatever follows is left for the caller to copy verbatim.
    fn rewrite_firework_metadata(
        &self,
        state: &WorldState,
        r: &mut PacketReader,
        w: &mut PacketWriter,
    ) -> Result<(), PacketError> {
        loop {
            let index = r.read_u8()?;
            w.write_u8(index);
            if index == END_OF_METADATA {
                return Ok(());
            }
            let value_type = r.read_varint()?;
            w.write_varint(value_type);
            if index == FIREWORK_BOOSTED_ENTITY && value_type == TYPE_VARINT {
                w.write_varint(self.to_client(state, r.read_varint()?));
                return Ok(());
            }
            let start = r.position();
            metadata::skip_value(r, value_type)?;
            w.write_bytes(&r.slice_from(start));
        }
    }

    fn rewrite_serverbound(
        &self,
        state: &mut WorldState,
        packet: &Packet,
    ) -> Result<Option<Packet>, PacketError> {
        let mut r = packet.reader();
        match Serverbound::from_id(packet.id) {
            Serverbound::PlayerPosition | Serverbound::PlayerPositionAndLook => {
                let pos = &mut state.position;
                pos.x = r.read_f64()?;
                pos.y = r.read_f64()?;
                pos.z = r.read_f64()?;
                if packet.id == Serverbound::PlayerPositionAndLook.id() {
                    pos.yaw = r.read_f32()?;
                    pos.pitch = r.read_f32()?;
                }
            }
            Serverbound::PlayerLook => {
                state.position.yaw = r.read_f32()?;
                state.position.pitch = r.read_f32()?;
            }
            Serverbound::VehicleMove => {
                let (x, y, z) = (r.read_f64()?, r.read_f64()?, r.read_f64()?);
                state.move_self_with_vehicle(x, y, z);
            }
            Serverbound::EntityAction => {
                let eid = r.read_varint()?;
                let eid = if eid == self.client_eid {
                    state.self_eid
                } else {
                    eid
                };
                let mut w = PacketWriter::new(packet.id);
                w.write_varint(eid).write_bytes(&r.read_rest());
                return Ok(Some(w.finish()));
            }
            Serverbound::HeldItemChange => state.held_item = r.read_i16()? as i8,
            Serverbound::TeleportConfirm | Serverbound::KeepAlive | Serverbound::Other(_) => {}
        }
        Ok(None)
    }
}

//! Chunk columns as packet patch logs.
//!
//! A column is never modelled block by block. It is the full chunk-data
//! packet that loaded it followed by every terrain mutation that touched it,
//! in arrival order; replaying the log rebuilds the column exactly.

use std::collections::BTreeMap;

use re_proto::types::ChunkPos;
use re_proto::Packet;

/// Ordered packets that rebuild one column. Always starts with a full chunk.
pub type PatchLog = Vec<Packet>;

/// Loaded columns keyed x -> z -> log. Inner maps are pruned once empty.
#[derive(Debug, Clone, Default)]
pub struct ChunkStore {
    columns: BTreeMap<i32, BTreeMap<i32, PatchLog>>,
}

impl ChunkStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, pos: ChunkPos) -> Option<&PatchLog> {
        self.columns.get(&pos.x)?.get(&pos.z)
    }

    pub fn is_loaded(&self, pos: ChunkPos) -> bool {
        self.get(pos).is_some()
    }

    /// Start (or restart) a column from a full chunk packet.
    pub fn seed(&mut self, pos: ChunkPos, full_chunk: Packet) {
        self.columns
            .entry(pos.x)
            .or_default()
            .insert(pos.z, vec![full_chunk]);
    }

    /// Append a mutation to a loaded column. Returns `false` and drops the
    /// packet if the column is not loaded.
    pub fn append(&mut self, pos: ChunkPos, patch: Packet) -> bool {
        match self
            .columns
            .get_mut(&pos.x)
            .and_then(|row| row.get_mut(&pos.z))
        {
            Some(log) => {
                log.push(patch);
                true
            }
            None => false,
        }
    }

    /// Forget a column. Returns whether it was loaded.
    pub fn unload(&mut self, pos: ChunkPos) -> bool {
        let Some(row) = self.columns.get_mut(&pos.x) else {
            return false;
        };
        let removed = row.remove(&pos.z).is_some();
        if row.is_empty() {
            self.columns.remove(&pos.x);
        }
        removed
    }

    pub fn clear(&mut self) {
        self.columns.clear();
    }

    /// Number of loaded columns.
    pub fn len(&self) -> usize {
        self.columns.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ChunkPos, &PatchLog)> {
        self.columns.iter().flat_map(|(&x, row)| {
            row.iter()
                .map(move |(&z, log)| (ChunkPos::new(x, z), log))
        })
    }
}

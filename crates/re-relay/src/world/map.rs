//! Map item pixel data.

use bytes::Bytes;

/// Maps are always 128x128 pixels.
pub const MAP_SIZE: usize = 128;

#[derive(Debug, Clone, PartialEq)]
pub struct MapData {
    pub scale: u8,
    pub show_icons: bool,
    /// Raw 3-byte icon records, replaced on every map packet.
    pub icons: Vec<Bytes>,
    /// Row-major `MAP_SIZE * MAP_SIZE` color grid.
    pub data: Box<[u8]>,
}

impl MapData {
    pub fn new(scale: u8, show_icons: bool, icons: Vec<Bytes>) -> Self {
        Self {
            scale,
            show_icons,
            icons,
            data: vec![0; MAP_SIZE * MAP_SIZE].into_boxed_slice(),
        }
    }

    /// Copy a `cols x rows` patch (row-major in `patch`) to offset `(x, z)`.
    /// Pixels falling outside the grid or the patch buffer are ignored.
    pub fn apply_patch(&mut self, cols: usize, rows: usize, x: usize, z: usize, patch: &[u8]) {
        for r in 0..rows {
            for c in 0..cols {
                let (gx, gz) = (x + c, z + r);
                if gx >= MAP_SIZE || gz >= MAP_SIZE {
                    continue;
                }
                if let Some(&color) = patch.get(r * cols + c) {
                    self.data[gz * MAP_SIZE + gx] = color;
                }
            }
        }
    }
}

// --- File: geometry.rs ---
use rayon::prelude::*;

use crate::collector::{CellRecord, CellSet};
use crate::constants::PARALLEL_PACK_THRESHOLD;
use crate::palette::{Rgba, classify};

/// Index-aligned vertex streams for one frame.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PackedGeometry {
    pub positions: Vec<[f32; 2]>,
    pub colors: Vec<Rgba>,
}

impl PackedGeometry {
    pub fn point_count(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Positions as a flat float stream, two floats per point.
    pub fn position_floats(&self) -> &[f32] {
        bytemuck::cast_slice(&self.positions)
    }

    /// Colors as a flat float stream, four floats per point.
    pub fn color_floats(&self) -> &[f32] {
        bytemuck::cast_slice(&self.colors)
    }
}

#[inline]
fn pack_one(cell: &CellRecord) -> ([f32; 2], Rgba) {
    (
        [cell.x as f32, cell.y as f32],
        classify(cell.kind, cell.activated),
    )
}

/// Flattens a cell set into positions and classified colors.
///
/// Order follows the set's iteration order, which can differ frame to frame;
/// each frame rewrites the whole buffer so that is harmless.
pub fn pack(cells: &CellSet) -> PackedGeometry {
    let (positions, colors): (Vec<[f32; 2]>, Vec<Rgba>) =
        if cells.len() >= PARALLEL_PACK_THRESHOLD {
            cells.par_iter().map(|(_, cell)| pack_one(cell)).unzip()
        } else {
            cells.values().map(pack_one).unzip()
        };
    PackedGeometry { positions, colors }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecosystem::{CellId, CellKind};
    use crate::palette::{ACTIVE_SEED_COLOR, LEAF_COLOR, ROOT_COLOR};

    fn record(x: i32, y: i32, kind: CellKind, activated: bool) -> CellRecord {
        CellRecord {
            x,
            y,
            kind,
            activated,
        }
    }

    #[test]
    fn empty_set_packs_to_zero_points() {
        let geometry = pack(&CellSet::new());
        assert_eq!(geometry.point_count(), 0);
        assert!(geometry.position_floats().is_empty());
        assert!(geometry.color_floats().is_empty());
    }

    #[test]
    fn streams_stay_index_aligned() {
        let mut cells = CellSet::new();
        cells.insert(CellId(1), record(3, 4, CellKind::Leaf, false));
        cells.insert(CellId(2), record(-1, 7, CellKind::Root, false));
        cells.insert(CellId(3), record(0, 0, CellKind::Seed, true));

        let geometry = pack(&cells);
        assert_eq!(geometry.point_count(), 3);
        assert_eq!(geometry.position_floats().len(), 6);
        assert_eq!(geometry.color_floats().len(), 12);

        for (pos, color) in geometry.positions.iter().zip(&geometry.colors) {
            let expected = if *pos == [3.0, 4.0] {
                LEAF_COLOR
            } else if *pos == [-1.0, 7.0] {
                ROOT_COLOR
            } else if *pos == [0.0, 0.0] {
                ACTIVE_SEED_COLOR
            } else {
                panic!("unexpected position {pos:?}");
            };
            assert_eq!(*color, expected);
        }
    }

    #[test]
    fn large_sets_take_the_parallel_path_with_same_result() {
        let mut cells = CellSet::new();
        for i in 0..(PARALLEL_PACK_THRESHOLD as u64 + 10) {
            let kind = if i % 2 == 0 { CellKind::Stem } else { CellKind::Leaf };
            cells.insert(CellId(i), record(i as i32, -(i as i32), kind, false));
        }
        let geometry = pack(&cells);
        assert_eq!(geometry.point_count(), cells.len());
        for (pos, color) in geometry.positions.iter().zip(&geometry.colors) {
            assert_eq!(pos[1], -pos[0]);
            let kind = if (pos[0] as u64) % 2 == 0 { CellKind::Stem } else { CellKind::Leaf };
            assert_eq!(*color, classify(kind, false));
        }
    }
}
// --- End of File: geometry.rs ---

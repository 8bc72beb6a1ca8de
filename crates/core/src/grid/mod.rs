//! The voxel grid: canonical storage of cell kinds and per-cell flag bits.
//!
//! Everything else in the crate overlays this. The bounds contract here is
//! load-bearing for every field: out-of-bounds reads return the empty value
//! (air, bare, dry), out-of-bounds writes are silent no-ops. No field does
//! its own bounds arithmetic.

pub mod field;
pub mod material;

pub use field::Field3;
pub use material::MaterialOverlay;

use crate::core_types::cell::{SURFACE_MASK, SURFACE_SHIFT, WETNESS_MASK, WETNESS_SHIFT};
use crate::core_types::{
    cell_blocks_movement, cell_is_solid, CellKind, Surface, CELL_FLAG_HAS_FLOOR, WETNESS_MAX,
};
use rustc_hash::FxHashSet;

/// Pixels per cell for agent <-> grid coordinate conversion.
pub const CELL_SIZE: f32 = 16.0;

/// Render chunks are 16x16 cells per z-level.
pub const CHUNK_SIZE: i32 = 16;

/// Dense 3-D array of cell kinds with a parallel flag-byte array.
#[derive(Debug, Clone)]
pub struct VoxelGrid {
    width: i32,
    height: i32,
    depth: i32,
    kinds: Field3<CellKind>,
    flags: Field3<u8>,
    dirty_chunks: FxHashSet<(i32, i32, i32)>,
}

impl VoxelGrid {
    /// Create an all-air grid. Dimensions are fixed for the world's lifetime.
    #[must_use]
    pub fn new(width: i32, height: i32, depth: i32) -> Self {
        let (w, h, d) = (width.max(1) as usize, height.max(1) as usize, depth.max(1) as usize);
        Self {
            width: w as i32,
            height: h as i32,
            depth: d as i32,
            kinds: Field3::new(w, h, d),
            flags: Field3::new(w, h, d),
            dirty_chunks: FxHashSet::default(),
        }
    }

    #[inline]
    #[must_use]
    pub fn width(&self) -> i32 {
        self.width
    }

    #[inline]
    #[must_use]
    pub fn height(&self) -> i32 {
        self.height
    }

    #[inline]
    #[must_use]
    pub fn depth(&self) -> i32 {
        self.depth
    }

    #[inline]
    #[must_use]
    pub fn in_bounds(&self, x: i32, y: i32, z: i32) -> bool {
        x >= 0 && x < self.width && y >= 0 && y < self.height && z >= 0 && z < self.depth
    }

    /// Cell kind at (x, y, z); air when out of bounds.
    #[inline]
    #[must_use]
    pub fn kind(&self, x: i32, y: i32, z: i32) -> CellKind {
        if self.in_bounds(x, y, z) {
            self.kinds.get(x as usize, y as usize, z as usize)
        } else {
            CellKind::Air
        }
    }

    /// Replace the cell kind. No-op out of bounds; marks the chunk dirty.
    pub fn set_kind(&mut self, x: i32, y: i32, z: i32, kind: CellKind) {
        if !self.in_bounds(x, y, z) {
            return;
        }
        self.kinds.set(x as usize, y as usize, z as usize, kind);
        self.mark_chunk_dirty(x, y, z);
    }

    #[inline]
    #[must_use]
    pub fn has_flag(&self, x: i32, y: i32, z: i32, flag: u8) -> bool {
        self.in_bounds(x, y, z) && self.flags.get(x as usize, y as usize, z as usize) & flag != 0
    }

    pub fn set_flag(&mut self, x: i32, y: i32, z: i32, flag: u8) {
        if !self.in_bounds(x, y, z) {
            return;
        }
        *self.flags.get_mut(x as usize, y as usize, z as usize) |= flag;
        self.mark_chunk_dirty(x, y, z);
    }

    pub fn clear_flag(&mut self, x: i32, y: i32, z: i32, flag: u8) {
        if !self.in_bounds(x, y, z) {
            return;
        }
        *self.flags.get_mut(x as usize, y as usize, z as usize) &= !flag;
        self.mark_chunk_dirty(x, y, z);
    }

    /// Surface cover at the cell; bare when out of bounds.
    #[inline]
    #[must_use]
    pub fn surface(&self, x: i32, y: i32, z: i32) -> Surface {
        if !self.in_bounds(x, y, z) {
            return Surface::Bare;
        }
        let bits = self.flags.get(x as usize, y as usize, z as usize);
        Surface::from_bits((bits & SURFACE_MASK) >> SURFACE_SHIFT)
    }

    pub fn set_surface(&mut self, x: i32, y: i32, z: i32, surface: Surface) {
        if !self.in_bounds(x, y, z) {
            return;
        }
        let cell = self.flags.get_mut(x as usize, y as usize, z as usize);
        let updated = (*cell & !SURFACE_MASK) | ((surface as u8) << SURFACE_SHIFT);
        if updated != *cell {
            *cell = updated;
            self.mark_chunk_dirty(x, y, z);
        }
    }

    /// Wetness 0..3; dry when out of bounds.
    #[inline]
    #[must_use]
    pub fn wetness(&self, x: i32, y: i32, z: i32) -> u8 {
        if !self.in_bounds(x, y, z) {
            return 0;
        }
        (self.flags.get(x as usize, y as usize, z as usize) & WETNESS_MASK) >> WETNESS_SHIFT
    }

    pub fn set_wetness(&mut self, x: i32, y: i32, z: i32, wetness: u8) {
        if !self.in_bounds(x, y, z) {
            return;
        }
        let clamped = wetness.min(WETNESS_MAX);
        let cell = self.flags.get_mut(x as usize, y as usize, z as usize);
        let updated = (*cell & !WETNESS_MASK) | (clamped << WETNESS_SHIFT);
        if updated != *cell {
            *cell = updated;
            self.mark_chunk_dirty(x, y, z);
        }
    }

    /// A cell is walkable when it is open itself and supported from below:
    /// not solid, not movement-blocking, and either carrying a constructed
    /// floor or sitting on a solid cell.
    #[must_use]
    pub fn is_walkable_at(&self, x: i32, y: i32, z: i32) -> bool {
        if !self.in_bounds(x, y, z) {
            return false;
        }
        let kind = self.kind(x, y, z);
        if cell_is_solid(kind) || cell_blocks_movement(kind) {
            return false;
        }
        if self.has_flag(x, y, z, CELL_FLAG_HAS_FLOOR) {
            return true;
        }
        z > 0 && cell_is_solid(self.kind(x, y, z - 1))
    }

    /// True when nothing above the cell blocks fluids, all the way to the sky.
    #[must_use]
    pub fn is_exposed_to_sky(&self, x: i32, y: i32, z: i32) -> bool {
        if !self.in_bounds(x, y, z) {
            return false;
        }
        for cz in (z + 1)..self.depth {
            let kind = self.kind(x, y, cz);
            if crate::core_types::cell_blocks_fluids(kind) || cell_is_solid(kind) {
                return false;
            }
        }
        true
    }

    /// Record that the render chunk containing (x, y, z) changed. The only
    /// mutation-visible side channel the simulation exposes.
    pub fn mark_chunk_dirty(&mut self, x: i32, y: i32, z: i32) {
        if self.in_bounds(x, y, z) {
            self.dirty_chunks.insert((x / CHUNK_SIZE, y / CHUNK_SIZE, z));
        }
    }

    /// Drain the dirty-chunk set; called by the renderer once per frame.
    pub fn take_dirty_chunks(&mut self) -> FxHashSet<(i32, i32, i32)> {
        std::mem::take(&mut self.dirty_chunks)
    }

    // Raw access for persistence.
    pub(crate) fn kinds(&self) -> &Field3<CellKind> {
        &self.kinds
    }

    pub(crate) fn flags(&self) -> &Field3<u8> {
        &self.flags
    }

    pub(crate) fn restore(&mut self, kinds: Field3<CellKind>, flags: Field3<u8>) {
        self.kinds = kinds;
        self.flags = flags;
        self.dirty_chunks.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_types::CELL_FLAG_BURNED;

    #[test]
    fn out_of_bounds_reads_are_empty() {
        let grid = VoxelGrid::new(4, 4, 2);
        assert_eq!(grid.kind(-1, 0, 0), CellKind::Air);
        assert_eq!(grid.kind(0, 0, 99), CellKind::Air);
        assert_eq!(grid.wetness(99, 0, 0), 0);
        assert_eq!(grid.surface(0, -5, 0), Surface::Bare);
        assert!(!grid.has_flag(4, 0, 0, CELL_FLAG_BURNED));
    }

    #[test]
    fn out_of_bounds_writes_are_noops() {
        let mut grid = VoxelGrid::new(4, 4, 2);
        grid.set_kind(-1, 0, 0, CellKind::Wall);
        grid.set_wetness(0, 0, 7, 3);
        grid.set_flag(9, 9, 0, CELL_FLAG_BURNED);
        assert!(grid.take_dirty_chunks().is_empty());
    }

    #[test]
    fn surface_and_wetness_share_a_byte() {
        let mut grid = VoxelGrid::new(4, 4, 2);
        grid.set_surface(1, 1, 0, Surface::TallGrass);
        grid.set_wetness(1, 1, 0, 2);
        grid.set_flag(1, 1, 0, CELL_FLAG_BURNED);
        assert_eq!(grid.surface(1, 1, 0), Surface::TallGrass);
        assert_eq!(grid.wetness(1, 1, 0), 2);
        assert!(grid.has_flag(1, 1, 0, CELL_FLAG_BURNED));
        grid.set_wetness(1, 1, 0, 9);
        assert_eq!(grid.wetness(1, 1, 0), WETNESS_MAX, "wetness clamps to soaked");
        assert_eq!(grid.surface(1, 1, 0), Surface::TallGrass);
    }

    #[test]
    fn walkability_needs_support() {
        let mut grid = VoxelGrid::new(4, 4, 3);
        grid.set_kind(1, 1, 0, CellKind::Dirt);
        assert!(grid.is_walkable_at(1, 1, 1), "air above dirt is walkable");
        assert!(!grid.is_walkable_at(1, 1, 2), "no support two levels up");
        assert!(!grid.is_walkable_at(1, 1, 0), "the dirt itself is not");
        // A constructed floor supports without solid ground below
        grid.set_flag(2, 2, 2, CELL_FLAG_HAS_FLOOR);
        assert!(grid.is_walkable_at(2, 2, 2));
    }

    #[test]
    fn sky_exposure_stops_at_solid_cover() {
        let mut grid = VoxelGrid::new(2, 2, 4);
        assert!(grid.is_exposed_to_sky(0, 0, 0));
        grid.set_kind(0, 0, 2, CellKind::Wall);
        assert!(!grid.is_exposed_to_sky(0, 0, 0));
        assert!(grid.is_exposed_to_sky(0, 0, 3));
    }

    #[test]
    fn dirty_chunks_collapse_to_chunk_coords() {
        let mut grid = VoxelGrid::new(40, 40, 2);
        grid.set_kind(0, 0, 0, CellKind::Dirt);
        grid.set_kind(15, 15, 0, CellKind::Dirt);
        grid.set_kind(16, 0, 0, CellKind::Dirt);
        let dirty = grid.take_dirty_chunks();
        assert_eq!(dirty.len(), 2);
        assert!(dirty.contains(&(0, 0, 0)));
        assert!(dirty.contains(&(1, 0, 0)));
        assert!(grid.take_dirty_chunks().is_empty(), "draining clears the set");
    }
}

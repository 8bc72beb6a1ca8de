//! Floor dirt: movers track soil onto constructed floors.
//!
//! Each mover's previous cell is remembered; when a transition goes from
//! natural soil onto a constructed floor, dirt accumulates there, more
//! from mud and less onto stone. Cleaning jobs call
//! [`SimulationWorld::clean_floor_dirt`].

use crate::core_types::{cell_is_solid, CELL_FLAG_HAS_FLOOR};
use crate::grid::Field3;
use crate::simulation::SimulationWorld;
use rustc_hash::FxHashMap;

/// Dirt ceiling per floor cell.
pub const DIRT_MAX: u8 = 255;

#[derive(Debug)]
pub(crate) struct FloorDirtState {
    pub(crate) dirt: Field3<u8>,
    /// Last cell seen per mover id.
    pub(crate) prev_cells: FxHashMap<u32, (i32, i32, i32)>,
}

impl FloorDirtState {
    pub(crate) fn new(w: usize, h: usize, d: usize) -> Self {
        Self { dirt: Field3::new(w, h, d), prev_cells: FxHashMap::default() }
    }

    #[inline]
    fn in_bounds(&self, x: i32, y: i32, z: i32) -> bool {
        x >= 0
            && (x as usize) < self.dirt.width()
            && y >= 0
            && (y as usize) < self.dirt.height()
            && z >= 0
            && (z as usize) < self.dirt.depth()
    }
}

impl SimulationWorld {
    /// Tracked dirt on a floor cell, 0..255.
    #[must_use]
    pub fn get_floor_dirt(&self, x: i32, y: i32, z: i32) -> u8 {
        if self.floor_dirt.in_bounds(x, y, z) {
            self.floor_dirt.dirt.get(x as usize, y as usize, z as usize)
        } else {
            0
        }
    }

    pub fn set_floor_dirt(&mut self, x: i32, y: i32, z: i32, value: i32) {
        if !self.floor_dirt.in_bounds(x, y, z) {
            return;
        }
        let old = self.floor_dirt.dirt.get(x as usize, y as usize, z as usize);
        let new = value.clamp(0, i32::from(DIRT_MAX)) as u8;
        self.floor_dirt.dirt.set(x as usize, y as usize, z as usize, new);
        if old == 0 && new > 0 {
            self.counts.dirt_active_cells += 1;
        } else if old > 0 && new == 0 {
            self.counts.dirt_active_cells = self.counts.dirt_active_cells.saturating_sub(1);
        }
    }

    /// Scrub some dirt off a floor; returns what remains.
    pub fn clean_floor_dirt(&mut self, x: i32, y: i32, z: i32, amount: i32) -> u8 {
        let old = i32::from(self.get_floor_dirt(x, y, z));
        self.set_floor_dirt(x, y, z, old - amount);
        self.get_floor_dirt(x, y, z)
    }

    /// Zero all tracked dirt and forget every mover position.
    pub fn clear_floor_dirt(&mut self) {
        self.floor_dirt.dirt.clear();
        self.floor_dirt.prev_cells.clear();
        self.counts.dirt_active_cells = 0;
    }

    /// Forget all mover positions; call after teleports or load.
    pub fn reset_mover_dirt_tracking(&mut self) {
        self.floor_dirt.prev_cells.clear();
    }

    /// Natural loose soil a mover can pick dirt up from, at the cell or the
    /// ground directly below it.
    #[must_use]
    pub fn is_dirt_source(&self, x: i32, y: i32, z: i32) -> bool {
        if !self.grid.in_bounds(x, y, z) {
            return false;
        }
        for cz in [z, z - 1] {
            if cz < 0 {
                continue;
            }
            if cell_is_solid(self.grid.kind(x, y, cz))
                && self.materials.is_wall_natural(x, y, cz)
                && self.materials.wall_material(x, y, cz).is_soil()
            {
                return true;
            }
        }
        false
    }

    /// A constructed floor dirt can be deposited on: an explicit floor
    /// flag, or walking on top of a constructed solid block.
    #[must_use]
    pub fn is_dirt_target(&self, x: i32, y: i32, z: i32) -> bool {
        if !self.grid.in_bounds(x, y, z) {
            return false;
        }
        if self.grid.has_flag(x, y, z, CELL_FLAG_HAS_FLOOR) {
            return true;
        }
        z > 0
            && cell_is_solid(self.grid.kind(x, y, z - 1))
            && self.materials.wall_material(x, y, z - 1) != crate::core_types::Material::None
            && !self.materials.is_wall_natural(x, y, z - 1)
    }

    /// Per-cell-transition callback from the mover system. Deposits dirt
    /// when the previous cell was soil and this one is a constructed floor.
    pub fn mover_track_dirt(&mut self, mover_idx: u32, x: i32, y: i32, z: i32) {
        if !self.config.floor_dirt_enabled {
            return;
        }
        let prev = self.floor_dirt.prev_cells.insert(mover_idx, (x, y, z));
        let Some((px, py, pz)) = prev else { return };
        if (px, py, pz) == (x, y, z) {
            return;
        }
        self.track_floor_dirt(px, py, pz, x, y, z);
    }

    fn track_floor_dirt(&mut self, sx: i32, sy: i32, sz: i32, dx: i32, dy: i32, dz: i32) {
        if !self.is_dirt_source(sx, sy, sz) || !self.is_dirt_target(dx, dy, dz) {
            return;
        }

        let mut amount = i32::from(self.config.dirt_track_amount);

        // Mud clings: find the actual ground cell under the source
        let mut ground_z = sz;
        if ground_z > 0 && !cell_is_solid(self.grid.kind(sx, sy, ground_z)) {
            ground_z -= 1;
        }
        if self.is_muddy(sx, sy, ground_z) {
            amount *= 3;
        }

        // Stone floors shed most of it
        let floor_mat = if self.grid.has_flag(dx, dy, dz, CELL_FLAG_HAS_FLOOR) {
            self.materials.floor_material(dx, dy, dz)
        } else {
            self.materials.wall_material(dx, dy, dz - 1)
        };
        if floor_mat.is_stone() {
            amount = (amount * i32::from(self.config.dirt_stone_multiplier) / 100).max(1);
        }

        let current = i32::from(self.get_floor_dirt(dx, dy, dz));
        self.set_floor_dirt(dx, dy, dz, current + amount);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_types::{CellKind, Material, Surface};

    /// Dirt ground on the west half, a brick platform on the east half.
    fn tracked_world() -> SimulationWorld {
        let mut world = SimulationWorld::new(8, 2, 3, 33);
        world.config.weather_enabled = false;
        for y in 0..2 {
            for x in 0..4 {
                world.grid.set_kind(x, y, 0, CellKind::Dirt);
                world.grid.set_surface(x, y, 0, Surface::Grass);
            }
            for x in 4..8 {
                world.grid.set_kind(x, y, 0, CellKind::Wall);
            }
        }
        world.sync_materials_to_terrain(Material::Granite);
        for y in 0..2 {
            for x in 4..8 {
                world.materials.set_wall_material(x, y, 0, Material::Brick);
                world.materials.set_wall_natural(x, y, 0, false);
            }
        }
        world
    }

    #[test]
    fn classification_of_sources_and_targets() {
        let world = tracked_world();
        assert!(world.is_dirt_source(1, 0, 1), "standing on natural dirt");
        assert!(!world.is_dirt_source(5, 0, 1), "brick is not soil");
        assert!(world.is_dirt_target(5, 0, 1), "constructed block top");
        assert!(!world.is_dirt_target(1, 0, 1), "bare ground is no floor");
    }

    #[test]
    fn soil_to_floor_transition_deposits_dirt() {
        let mut world = tracked_world();
        world.mover_track_dirt(0, 3, 0, 1); // first sighting, no deposit
        world.mover_track_dirt(0, 4, 0, 1); // dirt -> brick
        assert_eq!(
            world.get_floor_dirt(4, 0, 1),
            world.config.dirt_track_amount,
            "one track's worth"
        );
        assert_eq!(world.counts.dirt_active_cells, 1);
    }

    #[test]
    fn repeated_sightings_of_same_cell_do_nothing() {
        let mut world = tracked_world();
        world.mover_track_dirt(0, 3, 0, 1);
        world.mover_track_dirt(0, 3, 0, 1);
        world.mover_track_dirt(0, 3, 0, 1);
        assert_eq!(world.counts.dirt_active_cells, 0);
    }

    #[test]
    fn mud_tracks_three_times_as_much() {
        let mut world = tracked_world();
        world.grid.set_wetness(3, 0, 0, 3); // soak the dirt under the source cell
        world.mover_track_dirt(7, 3, 0, 1);
        world.mover_track_dirt(7, 4, 0, 1);
        assert_eq!(
            world.get_floor_dirt(4, 0, 1),
            world.config.dirt_track_amount * 3
        );
    }

    #[test]
    fn stone_floors_shed_tracked_dirt() {
        let mut world = tracked_world();
        for y in 0..2 {
            for x in 4..8 {
                world.materials.set_wall_material(x, y, 0, Material::Granite);
            }
        }
        world.mover_track_dirt(1, 3, 0, 1);
        world.mover_track_dirt(1, 4, 0, 1);
        let expect =
            (i32::from(world.config.dirt_track_amount) * i32::from(world.config.dirt_stone_multiplier) / 100).max(1);
        assert_eq!(i32::from(world.get_floor_dirt(4, 0, 1)), expect);
    }

    #[test]
    fn cleaning_reduces_and_clamps() {
        let mut world = tracked_world();
        world.set_floor_dirt(5, 0, 1, 10);
        assert_eq!(world.clean_floor_dirt(5, 0, 1, 4), 6);
        assert_eq!(world.clean_floor_dirt(5, 0, 1, 100), 0);
        assert_eq!(world.counts.dirt_active_cells, 0);
    }

    #[test]
    fn dirt_saturates_at_cap() {
        let mut world = tracked_world();
        world.set_floor_dirt(5, 0, 1, 9_999);
        assert_eq!(world.get_floor_dirt(5, 0, 1), DIRT_MAX);
    }
}

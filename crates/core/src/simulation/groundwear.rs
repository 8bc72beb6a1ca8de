//! Ground wear: trampled grass becomes paths, paths heal when left alone.
//!
//! Wear accumulates on natural dirt under foot traffic and maps to the
//! surface overlay through fixed thresholds. Recovery runs on a game-hour
//! interval scaled by the season (nothing regrows in winter), doubles as
//! the wetness-drying pass, and can sprout saplings on long-untouched
//! grass.

use crate::core_types::{cell_is_solid, BiomePreset, CellKind, Material, Surface};
use crate::grid::Field3;
use crate::simulation::{ActivityCounts, SimulationWorld};
use crate::weather::WeatherSystem;
use rand::Rng;

#[derive(Debug)]
pub(crate) struct WearState {
    pub(crate) wear: Field3<i32>,
    pub(crate) recovery_accum: f32,
}

impl WearState {
    pub(crate) fn new(w: usize, h: usize, d: usize) -> Self {
        Self { wear: Field3::new(w, h, d), recovery_accum: 0.0 }
    }

    #[inline]
    fn in_bounds(&self, x: i32, y: i32, z: i32) -> bool {
        x >= 0
            && (x as usize) < self.wear.width()
            && y >= 0
            && (y as usize) < self.wear.height()
            && z >= 0
            && (z as usize) < self.wear.depth()
    }

    #[inline]
    pub(crate) fn get(&self, x: i32, y: i32, z: i32) -> i32 {
        if self.in_bounds(x, y, z) {
            self.wear.get(x as usize, y as usize, z as usize)
        } else {
            0
        }
    }

    pub(crate) fn set(&mut self, counts: &mut ActivityCounts, x: i32, y: i32, z: i32, value: i32) {
        if !self.in_bounds(x, y, z) {
            return;
        }
        let old = self.wear.get(x as usize, y as usize, z as usize);
        let new = value.max(0);
        self.wear.set(x as usize, y as usize, z as usize, new);
        if old == 0 && new > 0 {
            counts.wear_active_cells += 1;
        } else if old > 0 && new == 0 {
            counts.wear_active_cells = counts.wear_active_cells.saturating_sub(1);
        }
    }

    /// Slam wear to the configured maximum; used when ground burns over.
    pub(crate) fn set_wear_max(
        &mut self,
        counts: &mut ActivityCounts,
        x: i32,
        y: i32,
        z: i32,
        wear_max: i32,
    ) {
        self.set(counts, x, y, z, wear_max);
    }
}

/// Surface cover implied by a wear value.
fn surface_for_wear(config: &crate::config::SimConfig, wear: i32) -> Surface {
    if wear >= config.wear_grass_to_dirt {
        Surface::Bare
    } else if wear >= config.wear_normal_to_trampled {
        Surface::Trampled
    } else if wear >= config.wear_tall_to_normal {
        Surface::Grass
    } else {
        Surface::TallGrass
    }
}

impl SimulationWorld {
    /// Accumulated wear at a cell, 0 when out of bounds.
    #[must_use]
    pub fn get_ground_wear(&self, x: i32, y: i32, z: i32) -> i32 {
        self.wear.get(x, y, z).min(self.config.wear_max)
    }

    /// Natural soil soaked enough to count as mud.
    #[must_use]
    pub fn is_muddy(&self, x: i32, y: i32, z: i32) -> bool {
        self.materials.is_wall_natural(x, y, z)
            && self.materials.wall_material(x, y, z).is_soil()
            && self.grid.wetness(x, y, z) >= 2
    }

    /// A mover stepped here: wear down the dirt underfoot, or damage a
    /// sapling in the cell.
    pub fn trample_ground(&mut self, x: i32, y: i32, z: i32) {
        if !self.config.ground_wear_enabled || !self.grid.in_bounds(x, y, z) {
            return;
        }

        // Saplings survive casual traffic and die to sustained trampling
        if self.grid.kind(x, y, z) == CellKind::Sapling {
            let wear = self.wear.get(x, y, z);
            self.wear.set(&mut self.counts, x, y, z, (wear + 1).min(self.config.wear_max));
            if self.wear.get(x, y, z) >= self.config.wear_max / 2 {
                self.grid.set_kind(x, y, z, CellKind::Air);
                self.materials.set_wall_material(x, y, z, Material::None);
                self.materials.set_wall_natural(x, y, z, false);
                self.wear.set(&mut self.counts, x, y, z, 0);
                self.counts.tree_active_cells = self.counts.tree_active_cells.saturating_sub(1);
            }
            return;
        }

        // Find the dirt being walked on: the cell itself, or the ground
        // directly below when standing on it
        let target_z = if self.is_natural_dirt(x, y, z) {
            z
        } else if z > 0 && self.is_natural_dirt(x, y, z - 1) {
            z - 1
        } else {
            return;
        };

        let wear = self.wear.get(x, y, target_z);
        let new = (wear + self.config.wear_trample_amount).min(self.config.wear_max);
        self.wear.set(&mut self.counts, x, y, target_z, new);
        let surface = surface_for_wear(&self.config, new);
        self.grid.set_surface(x, y, target_z, surface);
    }

    fn is_natural_dirt(&self, x: i32, y: i32, z: i32) -> bool {
        cell_is_solid(self.grid.kind(x, y, z))
            && self.materials.is_wall_natural(x, y, z)
            && self.materials.wall_material(x, y, z) == Material::Dirt
    }

    /// Zero all wear and its presence counter.
    pub fn clear_ground_wear(&mut self) {
        self.wear.wear.clear();
        self.wear.recovery_accum = 0.0;
        self.counts.wear_active_cells = 0;
    }

    /// Reset the recovery accumulator; call after restoring from a save.
    pub fn reset_wear_accumulators(&mut self) {
        self.wear.recovery_accum = 0.0;
    }

    /// Wear decay, wetness drying, and sapling regrowth, on the recovery
    /// interval.
    pub fn update_ground_wear(&mut self) {
        if !self.config.ground_wear_enabled {
            return;
        }
        if self.counts.wear_active_cells == 0
            && !self.config.sapling_regrowth_enabled
            && self.counts.water_active_cells == 0
        {
            return;
        }

        self.wear.recovery_accum += self.clock.game_delta;
        let interval = self
            .clock
            .game_hours_to_seconds(self.config.wear_recovery_interval_hours);
        if self.wear.recovery_accum < interval {
            return;
        }
        self.wear.recovery_accum -= interval;

        let growth_rate = WeatherSystem::seasonal_growth_rate(&self.clock, &self.config);
        let windy = self.weather.wind_strength > 0.5;

        for z in 0..self.grid.depth() {
            for y in 0..self.grid.height() {
                for x in 0..self.grid.width() {
                    let kind = self.grid.kind(x, y, z);
                    if !cell_is_solid(kind) || !self.materials.is_wall_natural(x, y, z) {
                        continue;
                    }
                    // Burning ground neither heals nor regrows
                    if self.fire.cell(x, y, z).level() > 0 {
                        continue;
                    }
                    let soil = self.materials.wall_material(x, y, z);
                    let is_dirt = soil == Material::Dirt;

                    if is_dirt {
                        let decay = (self.config.wear_decay_rate as f32 * growth_rate) as i32;
                        let wear = self.wear.get(x, y, z);
                        if decay > 0 && wear > 0 {
                            self.wear.set(&mut self.counts, x, y, z, (wear - decay).max(0));
                        }
                        let surface = surface_for_wear(&self.config, self.wear.get(x, y, z));
                        self.grid.set_surface(x, y, z, surface);
                    }

                    if self.config.sapling_regrowth_enabled && self.wear.get(x, y, z) == 0 {
                        self.try_regrow_sapling(x, y, z, is_dirt, soil);
                    }

                    self.dry_wetness(x, y, z, soil, windy);
                }
            }
        }
    }

    /// Regrowth roll: untouched grass occasionally sprouts a sapling of the
    /// species its soil favors, away from existing trees.
    fn try_regrow_sapling(&mut self, x: i32, y: i32, z: i32, is_dirt: bool, soil: Material) {
        if is_dirt && self.grid.surface(x, y, z) != Surface::TallGrass {
            return;
        }
        if z + 1 >= self.grid.depth() || self.grid.kind(x, y, z + 1) != CellKind::Air {
            return;
        }
        if self.rng.random_range(0..10_000) >= self.config.sapling_regrowth_chance {
            return;
        }
        if self.has_nearby_tree(x, y, z, self.config.sapling_min_tree_distance) {
            return;
        }
        let species = BiomePreset::tree_for_soil(soil);
        self.grid.set_kind(x, y, z + 1, CellKind::Sapling);
        self.materials.set_wall_material(x, y, z + 1, species);
        self.materials.set_wall_natural(x, y, z + 1, true);
        self.counts.tree_active_cells += 1;
    }

    fn has_nearby_tree(&self, x: i32, y: i32, z: i32, dist: i32) -> bool {
        for dz in -1..=dist {
            let cz = z + dz;
            for dy in -dist..=dist {
                for dx in -dist..=dist {
                    let kind = self.grid.kind(x + dx, y + dy, cz);
                    if matches!(kind, CellKind::Sapling | CellKind::TreeTrunk | CellKind::TreeLeaves)
                    {
                        return true;
                    }
                }
            }
        }
        false
    }

    /// Wet soil dries out between rains, faster in wind; a random roll per
    /// cell keeps the mud from vanishing everywhere on the same pass.
    fn dry_wetness(&mut self, x: i32, y: i32, z: i32, soil: Material, windy: bool) {
        let wetness = self.grid.wetness(x, y, z);
        if wetness == 0 || !soil.is_soil() {
            return;
        }
        let water_present = self.water.cell(x, y, z).level() > 0
            || self.water.cell(x, y, z + 1).level() > 0;
        if water_present {
            return;
        }
        if self.rng.random_range(0..100) < 50 {
            self.grid.set_wetness(x, y, z, wetness - 1);
        }
        if windy && self.grid.is_exposed_to_sky(x, y, z) {
            let current = self.grid.wetness(x, y, z);
            let chance = (self.config.wind_drying_multiplier * 10.0) as i32;
            if current > 0 && self.rng.random_range(0..100) < chance {
                self.grid.set_wetness(x, y, z, current - 1);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dirt_world() -> SimulationWorld {
        let mut world = SimulationWorld::new(10, 4, 3, 21);
        world.config.weather_enabled = false;
        for y in 0..4 {
            for x in 0..10 {
                world.grid.set_kind(x, y, 0, CellKind::Dirt);
                world.grid.set_surface(x, y, 0, Surface::TallGrass);
            }
        }
        world.sync_materials_to_terrain(Material::Granite);
        world
    }

    #[test]
    fn trample_is_monotonic_until_decay() {
        let mut world = dirt_world();
        let mut last = 0;
        for _ in 0..50 {
            world.trample_ground(3, 1, 1);
            let wear = world.get_ground_wear(3, 1, 0);
            assert!(wear >= last);
            last = wear;
        }
        assert_eq!(last, 50 * world.config.wear_trample_amount);
    }

    #[test]
    fn trampling_from_above_finds_the_dirt_below() {
        let mut world = dirt_world();
        world.trample_ground(2, 2, 1);
        assert!(world.get_ground_wear(2, 2, 0) > 0, "wear lands on the z-1 dirt");
        assert_eq!(world.get_ground_wear(2, 2, 1), 0);
    }

    #[test]
    fn wear_thresholds_map_to_surfaces() {
        let mut world = dirt_world();
        world.config.wear_trample_amount = 100;
        // 2 tramples = 200 → short grass
        world.trample_ground(5, 1, 1);
        world.trample_ground(5, 1, 1);
        assert_eq!(world.grid.surface(5, 1, 0), Surface::Grass);
        // 6 total = 600 → trampled
        for _ in 0..4 {
            world.trample_ground(5, 1, 1);
        }
        assert_eq!(world.grid.surface(5, 1, 0), Surface::Trampled);
        // 10 total = 1000 → bare dirt
        for _ in 0..4 {
            world.trample_ground(5, 1, 1);
        }
        assert_eq!(world.grid.surface(5, 1, 0), Surface::Bare);
    }

    #[test]
    fn wear_caps_at_max() {
        let mut world = dirt_world();
        world.config.wear_trample_amount = world.config.wear_max;
        world.trample_ground(1, 1, 1);
        world.trample_ground(1, 1, 1);
        assert_eq!(world.get_ground_wear(1, 1, 0), world.config.wear_max);
    }

    #[test]
    fn worn_path_heals_in_summer() {
        let mut world = dirt_world();
        world.clock.day_number = 10; // mid-summer, growth rate 1.0
        world.config.wear_trample_amount = 700;
        world.trample_ground(4, 1, 1);
        assert_eq!(world.grid.surface(4, 1, 0), Surface::Trampled);
        // A day of game time passes many recovery intervals
        world.run_game_seconds(world.clock.day_length);
        let wear = world.get_ground_wear(4, 1, 0);
        assert!(wear < 700, "wear decayed, got {wear}");
    }

    #[test]
    fn nothing_heals_in_winter() {
        let mut world = dirt_world();
        world.clock.day_number = 24; // mid-winter
        world.config.wear_trample_amount = 700;
        world.trample_ground(4, 1, 1);
        world.run_game_seconds(world.clock.day_length / 2.0);
        assert_eq!(world.get_ground_wear(4, 1, 0), 700);
    }

    #[test]
    fn sapling_dies_only_to_repeated_trampling() {
        let mut world = dirt_world();
        world.grid.set_kind(6, 1, 1, CellKind::Sapling);
        world.counts.tree_active_cells += 1;
        let needed = world.config.wear_max / 2;
        for _ in 0..(needed - 1) {
            world.trample_ground(6, 1, 1);
        }
        assert_eq!(world.grid.kind(6, 1, 1), CellKind::Sapling);
        world.trample_ground(6, 1, 1);
        assert_eq!(world.grid.kind(6, 1, 1), CellKind::Air, "sapling destroyed");
        assert_eq!(world.counts.tree_active_cells, 0);
        assert_eq!(world.get_ground_wear(6, 1, 1), 0, "wear resets with the sapling");
    }

    #[test]
    fn mud_needs_wet_natural_soil() {
        let mut world = dirt_world();
        assert!(!world.is_muddy(2, 1, 0));
        world.grid.set_wetness(2, 1, 0, 2);
        assert!(world.is_muddy(2, 1, 0));
        world.grid.set_wetness(2, 1, 0, 1);
        assert!(!world.is_muddy(2, 1, 0), "damp is not mud");
    }

    #[test]
    fn wet_soil_dries_without_standing_water() {
        let mut world = dirt_world();
        world.grid.set_wetness(3, 2, 0, 3);
        world.counts.wear_active_cells += 1; // keep the pass running
        world.clock.day_number = 10;
        world.run_game_seconds(world.clock.day_length * 2.0);
        assert_eq!(world.grid.wetness(3, 2, 0), 0, "mud dried out");
        world.counts.wear_active_cells = 0;
        world.rebuild_activity_counts();
    }
}

//! Fire: per-cell combustion with fuel depletion, probabilistic spread,
//! burnout transforms, and source pinning.
//!
//! Fuel comes from the constructed wall material if there is one, else from
//! the cell kind, with a grass overlay adding a quick-burning topping. A
//! burning cell pushes heat and smoke into the other fields every tick;
//! burnout marks the cell BURNED (which suppresses re-ignition) and applies
//! the kind's burns-into transform.

use crate::core_types::{
    cell_blocks_fluids, cell_burns_into, cell_fuel, CellKind, Surface, CELL_FLAG_BURNED,
};
use crate::grid::{Field3, MaterialOverlay, VoxelGrid};
use crate::simulation::smoke::generate_smoke_from_fire_internal;
use crate::simulation::temperature::apply_fire_heat_internal;
use crate::simulation::{
    groundwear::WearState, smoke::SmokeState, temperature::TemperatureState, water::WaterState,
    ActivityCounts, SimulationWorld, ORTHO_4,
};
use crate::core_types::{FireCell, Material, MAX_LEVEL};
use rand::seq::SliceRandom;
use rand::Rng;
use rand_chacha::ChaCha8Rng;

/// Minimum intensity a fire needs before it can jump to a neighbor; also
/// the level newly ignited spread fires start at.
pub const FIRE_MIN_SPREAD_LEVEL: u8 = 2;

/// Fuel the grass overlay contributes on dirt or exposed ground.
const GRASS_FUEL: u8 = 16;

/// Snow this deep smothers a fire outright.
const SNOW_EXTINGUISH_LEVEL: u8 = 2;

const FIRE_MAX_UPDATES_PER_TICK: u32 = 16384;

#[derive(Debug)]
pub(crate) struct FireState {
    pub(crate) cells: Field3<FireCell>,
    pub(crate) spread_accum: f32,
    pub(crate) fuel_accum: f32,
    pub(crate) update_count: u32,
}

impl FireState {
    pub(crate) fn new(w: usize, h: usize, d: usize) -> Self {
        Self { cells: Field3::new(w, h, d), spread_accum: 0.0, fuel_accum: 0.0, update_count: 0 }
    }

    #[inline]
    fn in_bounds(&self, x: i32, y: i32, z: i32) -> bool {
        x >= 0
            && (x as usize) < self.cells.width()
            && y >= 0
            && (y as usize) < self.cells.height()
            && z >= 0
            && (z as usize) < self.cells.depth()
    }

    #[inline]
    pub(crate) fn cell(&self, x: i32, y: i32, z: i32) -> FireCell {
        if self.in_bounds(x, y, z) {
            self.cells.get(x as usize, y as usize, z as usize)
        } else {
            FireCell::default()
        }
    }

    /// Clear the stable bit on the cell, its four lateral neighbors, and
    /// the cell above (smoke goes up).
    fn destabilize(&mut self, x: i32, y: i32, z: i32) {
        const OFFSETS: [(i32, i32, i32); 6] =
            [(0, 0, 0), (-1, 0, 0), (1, 0, 0), (0, -1, 0), (0, 1, 0), (0, 0, 1)];
        for (dx, dy, dz) in OFFSETS {
            let (nx, ny, nz) = (x + dx, y + dy, z + dz);
            if self.in_bounds(nx, ny, nz) {
                self.cells
                    .get_mut(nx as usize, ny as usize, nz as usize)
                    .set_stable(false);
            }
        }
    }

    /// Level write with presence-counter upkeep; destabilizes on change.
    fn set_level(&mut self, counts: &mut ActivityCounts, x: i32, y: i32, z: i32, level: u8) {
        if !self.in_bounds(x, y, z) {
            return;
        }
        let cell = self.cells.get_mut(x as usize, y as usize, z as usize);
        let old = cell.level();
        let was_active = cell.is_active();
        cell.set_level(level.min(MAX_LEVEL));
        let new = cell.level();
        let is_active = cell.is_active();
        if !was_active && is_active {
            counts.fire_active_cells += 1;
        } else if was_active && !is_active {
            counts.fire_active_cells = counts.fire_active_cells.saturating_sub(1);
        }
        if old != new {
            self.destabilize(x, y, z);
        }
    }
}

/// Fuel available at a position: constructed wall material first, then the
/// cell kind, then the grass overlay.
fn fuel_at(grid: &VoxelGrid, materials: &MaterialOverlay, x: i32, y: i32, z: i32) -> u8 {
    let kind = grid.kind(x, y, z);
    let mut fuel = cell_fuel(kind);

    let mat = materials.wall_material(x, y, z);
    if mat != Material::None && !materials.is_wall_natural(x, y, z) {
        fuel = mat.fuel();
    }

    if matches!(kind, CellKind::Dirt | CellKind::Air) && grid.surface(x, y, z).is_grass() {
        fuel = GRASS_FUEL;
    }

    fuel
}

/// Whether a cell can catch fire: in bounds, not already burned out, fuel
/// present, and nothing sealing it from above.
fn can_burn_at(grid: &VoxelGrid, materials: &MaterialOverlay, x: i32, y: i32, z: i32) -> bool {
    if !grid.in_bounds(x, y, z) {
        return false;
    }
    if grid.has_flag(x, y, z, CELL_FLAG_BURNED) {
        return false;
    }
    if z + 1 < grid.depth() && cell_blocks_fluids(grid.kind(x, y, z + 1)) {
        return false;
    }
    fuel_at(grid, materials, x, y, z) > 0
}

impl SimulationWorld {
    /// Fire intensity 0..7; 0 when out of bounds.
    #[must_use]
    pub fn get_fire_level(&self, x: i32, y: i32, z: i32) -> u8 {
        self.fire.cell(x, y, z).level()
    }

    #[must_use]
    pub fn has_fire(&self, x: i32, y: i32, z: i32) -> bool {
        self.get_fire_level(x, y, z) > 0
    }

    /// Remaining fuel in the cell's fire record.
    #[must_use]
    pub fn get_cell_fuel(&self, x: i32, y: i32, z: i32) -> u8 {
        self.fire.cell(x, y, z).fuel()
    }

    #[must_use]
    pub fn is_fire_source_at(&self, x: i32, y: i32, z: i32) -> bool {
        self.fire.cell(x, y, z).is_source()
    }

    /// Fuel a fire would find at this position right now.
    #[must_use]
    pub fn get_fuel_at(&self, x: i32, y: i32, z: i32) -> u8 {
        fuel_at(&self.grid, &self.materials, x, y, z)
    }

    #[must_use]
    pub fn can_burn(&self, x: i32, y: i32, z: i32) -> bool {
        can_burn_at(&self.grid, &self.materials, x, y, z)
    }

    /// Set the fire level directly, initializing fuel on first ignition.
    pub fn set_fire_level(&mut self, x: i32, y: i32, z: i32, level: u8) {
        if !self.grid.in_bounds(x, y, z) {
            return;
        }
        let cell = self.fire.cell(x, y, z);
        if cell.level() == 0 && level > 0 && cell.fuel() == 0 {
            let fuel = fuel_at(&self.grid, &self.materials, x, y, z);
            self.fire
                .cells
                .get_mut(x as usize, y as usize, z as usize)
                .set_fuel(fuel);
        }
        self.fire.set_level(&mut self.counts, x, y, z, level);
    }

    /// Ignite at full intensity if the cell can burn.
    pub fn ignite_cell(&mut self, x: i32, y: i32, z: i32) {
        if !self.can_burn(x, y, z) {
            return;
        }
        let fuel = fuel_at(&self.grid, &self.materials, x, y, z);
        self.fire
            .cells
            .get_mut(x as usize, y as usize, z as usize)
            .set_fuel(fuel);
        self.fire.set_level(&mut self.counts, x, y, z, MAX_LEVEL);
    }

    pub fn extinguish_cell(&mut self, x: i32, y: i32, z: i32) {
        if self.has_fire(x, y, z) {
            self.fire.set_level(&mut self.counts, x, y, z, 0);
        }
    }

    /// Permanent fire (torch, lava): pinned at full level, never consumes
    /// fuel, and doubles as a heat source.
    pub fn set_fire_source(&mut self, x: i32, y: i32, z: i32, is_source: bool) {
        if !self.grid.in_bounds(x, y, z) {
            return;
        }
        {
            let cell = self.fire.cells.get_mut(x as usize, y as usize, z as usize);
            let was_active = cell.is_active();
            cell.set_source(is_source);
            if is_source {
                cell.set_level(MAX_LEVEL);
                cell.set_fuel(15);
            }
            let is_active = cell.is_active();
            if !was_active && is_active {
                self.counts.fire_active_cells += 1;
            } else if was_active && !is_active {
                self.counts.fire_active_cells = self.counts.fire_active_cells.saturating_sub(1);
            }
        }
        if is_source {
            self.fire.destabilize(x, y, z);
        }
        self.set_heat_source(x, y, z, is_source);
    }

    pub fn destabilize_fire(&mut self, x: i32, y: i32, z: i32) {
        self.fire.destabilize(x, y, z);
    }

    /// Empty the whole fire field and zero its share of the presence
    /// registry. Heat sources registered by fire sources are untouched;
    /// callers clearing a world wholesale clear temperature too.
    pub fn clear_fire(&mut self) {
        self.fire.cells.clear();
        self.fire.spread_accum = 0.0;
        self.fire.fuel_accum = 0.0;
        self.fire.update_count = 0;
        self.counts.fire_active_cells = 0;
    }

    /// Reset interval accumulators and destabilize everything; call after
    /// restoring the fire grid from a save.
    pub fn reset_fire_accumulators(&mut self) {
        self.fire.spread_accum = 0.0;
        self.fire.fuel_accum = 0.0;
        for cell in self.fire.cells.as_mut_slice() {
            cell.set_stable(false);
        }
    }

    /// Main fire tick.
    pub fn update_fire(&mut self) {
        let SimulationWorld {
            grid,
            materials,
            fire,
            smoke,
            temperature,
            water,
            wear,
            snow,
            counts,
            rng,
            clock,
            config,
            ..
        } = self;
        if !config.fire_enabled {
            return;
        }
        if counts.fire_active_cells == 0 {
            fire.update_count = 0;
            return;
        }
        fire.update_count = 0;

        fire.spread_accum += clock.game_delta;
        fire.fuel_accum += clock.game_delta;
        let do_spread = fire.spread_accum >= config.fire_spread_interval;
        let do_fuel = fire.fuel_accum >= config.fire_fuel_interval;
        if do_spread {
            fire.spread_accum -= config.fire_spread_interval;
        }
        if do_fuel {
            fire.fuel_accum -= config.fire_fuel_interval;
        }

        'scan: for z in 0..grid.depth() {
            for y in 0..grid.height() {
                for x in 0..grid.width() {
                    let cell = fire.cells.get(x as usize, y as usize, z as usize);
                    if cell.is_stable() && !cell.is_source() {
                        continue;
                    }
                    process_fire_cell(
                        grid, materials, fire, smoke, temperature, water, wear, snow, counts, rng,
                        config, x, y, z, do_spread, do_fuel,
                    );
                    fire.update_count += 1;
                    if fire.update_count >= FIRE_MAX_UPDATES_PER_TICK {
                        break 'scan;
                    }
                }
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn process_fire_cell(
    grid: &mut VoxelGrid,
    materials: &MaterialOverlay,
    fire: &mut FireState,
    smoke: &mut SmokeState,
    temperature: &mut TemperatureState,
    water: &WaterState,
    wear: &mut WearState,
    snow: &Field3<u8>,
    counts: &mut ActivityCounts,
    rng: &mut ChaCha8Rng,
    config: &crate::config::SimConfig,
    x: i32,
    y: i32,
    z: i32,
    do_spread: bool,
    do_fuel: bool,
) {
    let cell = fire.cell(x, y, z);

    // Sources burn at full level forever, spreading and emitting like any
    // other fire but never consuming fuel.
    if cell.is_source() {
        if cell.level() < MAX_LEVEL {
            fire.set_level(counts, x, y, z, MAX_LEVEL);
        }
        if do_spread {
            try_spread(grid, materials, fire, water, counts, rng, config, x, y, z);
        }
        generate_smoke_from_fire_internal(
            smoke,
            counts,
            grid,
            x,
            y,
            z,
            MAX_LEVEL,
            config.smoke_generation_rate,
        );
        apply_fire_heat_internal(temperature, counts, x, y, z, MAX_LEVEL);
        return;
    }

    if cell.level() == 0 {
        fire.cells.get_mut(x as usize, y as usize, z as usize).set_stable(true);
        return;
    }

    // Water in the cell kills the fire outright
    if water.cell(x, y, z).level() > 0 {
        fire.set_level(counts, x, y, z, 0);
        fire.cells.get_mut(x as usize, y as usize, z as usize).set_fuel(0);
        return;
    }

    // So does a real covering of snow, here or settling from above
    let snowed = snow.get(x as usize, y as usize, z as usize) >= SNOW_EXTINGUISH_LEVEL
        || (grid.in_bounds(x, y, z + 1)
            && snow.get(x as usize, y as usize, (z + 1) as usize) >= SNOW_EXTINGUISH_LEVEL);
    if snowed {
        fire.set_level(counts, x, y, z, 0);
        fire.cells.get_mut(x as usize, y as usize, z as usize).set_fuel(0);
        return;
    }

    if do_fuel {
        let fuel = fire.cell(x, y, z).fuel();
        if fuel > 0 {
            fire.cells
                .get_mut(x as usize, y as usize, z as usize)
                .set_fuel(fuel - 1);
            if fuel - 1 == 0 {
                burn_out(grid, fire, wear, counts, config.wear_max, x, y, z);
                return;
            }
            if fuel - 1 <= 2 {
                // Guttering: low fuel caps the intensity
                let slot = fire.cells.get_mut(x as usize, y as usize, z as usize);
                if slot.level() > 3 {
                    slot.set_level(3);
                }
            }
        }
    }

    // Well-fed fires grow hotter
    let cell = fire.cell(x, y, z);
    if cell.fuel() > 2 && cell.level() < MAX_LEVEL && rng.random_range(0..3) == 0 {
        fire.set_level(counts, x, y, z, cell.level() + 1);
    }

    if do_spread {
        try_spread(grid, materials, fire, water, counts, rng, config, x, y, z);
    }

    let level = fire.cell(x, y, z).level();
    if level > 0 {
        generate_smoke_from_fire_internal(
            smoke,
            counts,
            grid,
            x,
            y,
            z,
            level,
            config.smoke_generation_rate,
        );
        apply_fire_heat_internal(temperature, counts, x, y, z, level);
        // Burning cells keep processing for fuel consumption
        fire.cells.get_mut(x as usize, y as usize, z as usize).set_stable(false);
    }
}

/// Fuel ran dry: kill the fire, mark the cell burned, and transform it.
fn burn_out(
    grid: &mut VoxelGrid,
    fire: &mut FireState,
    wear: &mut WearState,
    counts: &mut ActivityCounts,
    wear_max: i32,
    x: i32,
    y: i32,
    z: i32,
) {
    fire.set_level(counts, x, y, z, 0);

    let kind = grid.kind(x, y, z);
    let result = cell_burns_into(kind);
    if result != kind {
        grid.set_kind(x, y, z, result);
        if result == CellKind::Dirt {
            wear.set_wear_max(counts, x, y, z, wear_max);
            grid.set_surface(x, y, z, Surface::Bare);
        }
    } else if kind == CellKind::Dirt {
        // Scorched earth: the grass is gone and takes a long time to return
        wear.set_wear_max(counts, x, y, z, wear_max);
        grid.set_surface(x, y, z, Surface::Bare);
    }

    grid.set_flag(x, y, z, CELL_FLAG_BURNED);
}

/// Probabilistic spread to orthogonal neighbors in shuffled order.
#[allow(clippy::too_many_arguments)]
fn try_spread(
    grid: &VoxelGrid,
    materials: &MaterialOverlay,
    fire: &mut FireState,
    water: &WaterState,
    counts: &mut ActivityCounts,
    rng: &mut ChaCha8Rng,
    config: &crate::config::SimConfig,
    x: i32,
    y: i32,
    z: i32,
) -> bool {
    let cell = fire.cell(x, y, z);
    if cell.level() < FIRE_MIN_SPREAD_LEVEL {
        return false;
    }

    let mut order = [0usize, 1, 2, 3];
    order.shuffle(rng);

    let mut spread = false;
    for dir in order {
        let (dx, dy) = ORTHO_4[dir];
        let (nx, ny) = (x + dx, y + dy);
        if !can_burn_at(grid, materials, nx, ny, z) {
            continue;
        }
        if fire.cell(nx, ny, z).level() > 0 {
            continue;
        }

        let mut percent =
            config.fire_spread_base + i32::from(cell.level()) * config.fire_spread_per_level;
        if has_adjacent_water(water, nx, ny, z) {
            percent = (percent * config.fire_water_reduction / 100).max(5);
        }

        if rng.random_range(0..100) < percent {
            let fuel = fuel_at(grid, materials, nx, ny, z);
            fire.cells
                .get_mut(nx as usize, ny as usize, z as usize)
                .set_fuel(fuel);
            fire.set_level(counts, nx, ny, z, FIRE_MIN_SPREAD_LEVEL);
            spread = true;
        }
    }
    spread
}

fn has_adjacent_water(water: &WaterState, x: i32, y: i32, z: i32) -> bool {
    ORTHO_4
        .iter()
        .any(|&(dx, dy)| water.cell(x + dx, y + dy, z).level() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grass_world() -> SimulationWorld {
        let mut world = SimulationWorld::new(8, 8, 2, 1234);
        world.config.weather_enabled = false;
        for y in 0..8 {
            for x in 0..8 {
                world.grid.set_kind(x, y, 0, CellKind::Dirt);
                world.grid.set_surface(x, y, 0, Surface::Grass);
            }
        }
        world.sync_materials_to_terrain(Material::Granite);
        world
    }

    #[test]
    fn grass_overlay_supplies_fuel() {
        let world = grass_world();
        assert_eq!(world.get_fuel_at(3, 3, 0), GRASS_FUEL);
        assert!(world.can_burn(3, 3, 0));
    }

    #[test]
    fn constructed_wood_wall_burns_hotter_than_its_kind() {
        let mut world = grass_world();
        world.grid.set_kind(2, 2, 0, CellKind::Wall);
        world.materials.set_wall_material(2, 2, 0, Material::Oak);
        world.materials.set_wall_natural(2, 2, 0, false);
        assert_eq!(world.get_fuel_at(2, 2, 0), Material::Oak.fuel());
    }

    #[test]
    fn ignite_starts_at_full_level_with_fuel() {
        let mut world = grass_world();
        world.ignite_cell(4, 4, 0);
        assert_eq!(world.get_fire_level(4, 4, 0), 7);
        assert_eq!(world.get_cell_fuel(4, 4, 0), GRASS_FUEL);
        assert_eq!(world.counts.fire_active_cells, 1);
    }

    #[test]
    fn burned_cells_do_not_reignite() {
        let mut world = grass_world();
        world.grid.set_flag(4, 4, 0, CELL_FLAG_BURNED);
        world.ignite_cell(4, 4, 0);
        assert_eq!(world.get_fire_level(4, 4, 0), 0);
    }

    #[test]
    fn water_extinguishes_immediately() {
        let mut world = grass_world();
        world.ignite_cell(4, 4, 0);
        world.set_water_level(4, 4, 0, 2);
        world.tick();
        assert_eq!(world.get_fire_level(4, 4, 0), 0);
        assert_eq!(world.get_cell_fuel(4, 4, 0), 0);
    }

    #[test]
    fn fire_burns_out_to_bare_burned_dirt() {
        let mut world = grass_world();
        world.ignite_cell(4, 4, 0);
        world.run_game_seconds(30.0);
        assert_eq!(world.get_fire_level(4, 4, 0), 0);
        assert!(world.grid.has_flag(4, 4, 0, CELL_FLAG_BURNED));
        assert_eq!(world.grid.surface(4, 4, 0), Surface::Bare);
        assert_eq!(world.get_ground_wear(4, 4, 0), world.config.wear_max);
    }

    #[test]
    fn burning_emits_smoke_and_heat() {
        let mut world = grass_world();
        world.ignite_cell(4, 4, 0);
        world.tick();
        assert!(world.counts.smoke_active_cells > 0, "fire makes smoke");
        assert!(world.get_temperature(4, 4, 0) > 20, "fire makes heat");
    }

    #[test]
    fn source_never_runs_dry() {
        let mut world = grass_world();
        world.set_fire_source(4, 4, 0, true);
        assert!(world.is_heat_source(4, 4, 0), "fire source doubles as heat source");
        world.run_game_seconds(10.0);
        assert_eq!(world.get_fire_level(4, 4, 0), 7);
        world.set_fire_source(4, 4, 0, false);
        assert!(!world.is_heat_source(4, 4, 0));
    }

    #[test]
    fn spread_eventually_reaches_a_neighbor() {
        let mut world = grass_world();
        world.ignite_cell(4, 4, 0);
        let mut spread = false;
        for _ in 0..600 {
            world.tick();
            let neighbors = [(3, 4), (5, 4), (4, 3), (4, 5)];
            if neighbors.iter().any(|&(x, y)| {
                world.has_fire(x, y, 0) || world.grid.has_flag(x, y, 0, CELL_FLAG_BURNED)
            }) {
                spread = true;
                break;
            }
        }
        assert!(spread, "a level-7 grass fire should jump within ten seconds");
    }
}

//! Water: DF-style 1-7 levels with gravity, equalization, pressure,
//! freezing and evaporation.
//!
//! Flow per tick, per unstable cell, scanned bottom-up: fall as far as space
//! permits, equalize with orthogonal neighbors (shuffled, wind-biased),
//! then push through a bounded pressure search when the cell is full and
//! pressurized. Sources refill to 7 and stamp the pressure trail; drains
//! bleed one unit per tick. Freezing and boiling run in a separate pass
//! right after temperature so phase changes see this tick's heat.

use crate::core_types::{cell_allows_fluids, WaterCell, MAX_LEVEL};
use crate::grid::{Field3, VoxelGrid};
use crate::simulation::{ActivityCounts, SimulationWorld, ORTHO_4};
use crate::weather::WeatherSystem;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;

/// Water level that blocks walking; movers can wade through 1-3.
pub(crate) const WATER_BLOCKS_MOVEMENT: u8 = 4;

/// Water at or below this temperature freezes solid.
pub const TEMP_WATER_FREEZES: i32 = 0;

/// Max cells examined when tracing pressure.
const WATER_PRESSURE_SEARCH_LIMIT: usize = 64;

/// Cap on cells processed per tick; the stable-bit trail rolls the rest
/// over to the next tick.
const WATER_MAX_UPDATES_PER_TICK: u32 = 4096;

/// Water field state: packed cells plus accumulators and the generation
/// counter backing the pressure search's visited set.
#[derive(Debug)]
pub(crate) struct WaterState {
    pub(crate) cells: Field3<WaterCell>,
    pub(crate) evap_accum: f32,
    pub(crate) wetness_accum: f32,
    visited: Field3<u16>,
    visited_gen: u16,
    pub(crate) update_count: u32,
}

impl WaterState {
    pub(crate) fn new(w: usize, h: usize, d: usize) -> Self {
        Self {
            cells: Field3::new(w, h, d),
            evap_accum: 0.0,
            wetness_accum: 0.0,
            visited: Field3::new(w, h, d),
            visited_gen: 0,
            update_count: 0,
        }
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
    pub(crate) fn cell(&self, x: i32, y: i32, z: i32) -> WaterCell {
        if self.in_bounds(x, y, z) {
            self.cells.get(x as usize, y as usize, z as usize)
        } else {
            WaterCell::default()
        }
    }

    /// Clear the stable bit on the cell and its six face neighbors.
    pub(crate) fn destabilize(&mut self, x: i32, y: i32, z: i32) {
        const OFFSETS: [(i32, i32, i32); 7] =
            [(0, 0, 0), (-1, 0, 0), (1, 0, 0), (0, -1, 0), (0, 1, 0), (0, 0, -1), (0, 0, 1)];
        for (dx, dy, dz) in OFFSETS {
            let (nx, ny, nz) = (x + dx, y + dy, z + dz);
            if self.in_bounds(nx, ny, nz) {
                self.cells
                    .get_mut(nx as usize, ny as usize, nz as usize)
                    .set_stable(false);
            }
        }
    }

    /// Clamped level write with counter upkeep; destabilizes on change.
    pub(crate) fn set_level(&mut self, counts: &mut ActivityCounts, x: i32, y: i32, z: i32, level: i32) {
        if !self.in_bounds(x, y, z) {
            return;
        }
        let clamped = level.clamp(0, i32::from(MAX_LEVEL)) as u8;
        let cell = self.cells.get_mut(x as usize, y as usize, z as usize);
        let old = cell.level();
        let was_active = cell.is_active();
        cell.set_level(clamped);
        let is_active = cell.is_active();
        if !was_active && is_active {
            counts.water_active_cells += 1;
        } else if was_active && !is_active {
            counts.water_active_cells = counts.water_active_cells.saturating_sub(1);
        }
        if old != clamped {
            self.destabilize(x, y, z);
        }
    }
}

/// Can water flow into this cell: in bounds, fluid-permitting kind, and not
/// already frozen solid.
#[inline]
fn can_hold_water(grid: &VoxelGrid, water: &WaterState, x: i32, y: i32, z: i32) -> bool {
    grid.in_bounds(x, y, z)
        && cell_allows_fluids(grid.kind(x, y, z))
        && !water.cell(x, y, z).is_frozen()
}

impl SimulationWorld {
    #[inline]
    pub(crate) fn water_cell(&self, x: i32, y: i32, z: i32) -> WaterCell {
        self.water.cell(x, y, z)
    }

    /// Water depth 0..7; 0 when out of bounds.
    #[must_use]
    pub fn get_water_level(&self, x: i32, y: i32, z: i32) -> u8 {
        self.water.cell(x, y, z).level()
    }

    #[must_use]
    pub fn has_water(&self, x: i32, y: i32, z: i32) -> bool {
        self.get_water_level(x, y, z) > 0
    }

    #[must_use]
    pub fn is_full(&self, x: i32, y: i32, z: i32) -> bool {
        self.get_water_level(x, y, z) >= MAX_LEVEL
    }

    #[must_use]
    pub fn is_underwater(&self, x: i32, y: i32, z: i32, min_depth: u8) -> bool {
        self.get_water_level(x, y, z) >= min_depth
    }

    #[must_use]
    pub fn is_water_frozen(&self, x: i32, y: i32, z: i32) -> bool {
        self.water.cell(x, y, z).is_frozen()
    }

    #[must_use]
    pub fn is_water_source_at(&self, x: i32, y: i32, z: i32) -> bool {
        self.water.cell(x, y, z).is_source()
    }

    #[must_use]
    pub fn is_water_drain_at(&self, x: i32, y: i32, z: i32) -> bool {
        self.water.cell(x, y, z).is_drain()
    }

    #[must_use]
    pub fn has_water_pressure(&self, x: i32, y: i32, z: i32) -> bool {
        self.water.cell(x, y, z).has_pressure()
    }

    #[must_use]
    pub fn is_water_stable(&self, x: i32, y: i32, z: i32) -> bool {
        self.water.cell(x, y, z).is_stable()
    }

    /// Mover speed factor for wading: 1.0 dry or frozen, slower as depth
    /// grows.
    #[must_use]
    pub fn water_speed_multiplier(&self, x: i32, y: i32, z: i32) -> f32 {
        let cell = self.water.cell(x, y, z);
        if cell.level() == 0 || cell.is_frozen() {
            return 1.0;
        }
        match cell.level() {
            1 | 2 => self.config.water_speed_shallow,
            3 | 4 => self.config.water_speed_medium,
            _ => self.config.water_speed_deep,
        }
    }

    /// Set the water level, clamped to 0..7.
    pub fn set_water_level(&mut self, x: i32, y: i32, z: i32, level: i32) {
        self.water.set_level(&mut self.counts, x, y, z, level);
    }

    pub fn add_water(&mut self, x: i32, y: i32, z: i32, amount: i32) {
        let level = i32::from(self.water.cell(x, y, z).level());
        self.water.set_level(&mut self.counts, x, y, z, level + amount);
    }

    pub fn remove_water(&mut self, x: i32, y: i32, z: i32, amount: i32) {
        let level = i32::from(self.water.cell(x, y, z).level());
        self.water.set_level(&mut self.counts, x, y, z, level - amount);
    }

    /// Mark a cell as an infinite supply: refills to 7 and stamps the
    /// pressure trail every tick.
    pub fn set_water_source(&mut self, x: i32, y: i32, z: i32, is_source: bool) {
        if !self.grid.in_bounds(x, y, z) {
            return;
        }
        let cell = self.water.cells.get_mut(x as usize, y as usize, z as usize);
        let was_active = cell.is_active();
        cell.set_source(is_source);
        let is_active = cell.is_active();
        if !was_active && is_active {
            self.counts.water_active_cells += 1;
        } else if was_active && !is_active {
            self.counts.water_active_cells = self.counts.water_active_cells.saturating_sub(1);
        }
        if is_source {
            self.water.destabilize(x, y, z);
        }
    }

    /// Mark a cell as a drain: removes one unit per tick.
    pub fn set_water_drain(&mut self, x: i32, y: i32, z: i32, is_drain: bool) {
        if !self.grid.in_bounds(x, y, z) {
            return;
        }
        let cell = self.water.cells.get_mut(x as usize, y as usize, z as usize);
        let was_active = cell.is_active();
        cell.set_drain(is_drain);
        let is_active = cell.is_active();
        if !was_active && is_active {
            self.counts.water_active_cells += 1;
        } else if was_active && !is_active {
            self.counts.water_active_cells = self.counts.water_active_cells.saturating_sub(1);
        }
        if is_drain {
            self.water.destabilize(x, y, z);
        }
    }

    /// Freeze the water in a cell solid. Idempotent; a dry cell is left
    /// alone.
    pub fn freeze_water(&mut self, x: i32, y: i32, z: i32) {
        if !self.grid.in_bounds(x, y, z) {
            return;
        }
        let cell = self.water.cells.get_mut(x as usize, y as usize, z as usize);
        if cell.level() == 0 || cell.is_frozen() {
            return;
        }
        cell.set_frozen(true);
        self.water.destabilize(x, y, z);
        self.grid.mark_chunk_dirty(x, y, z);
    }

    /// Thaw frozen water back to liquid at its stored level. Idempotent.
    pub fn thaw_water(&mut self, x: i32, y: i32, z: i32) {
        if !self.grid.in_bounds(x, y, z) {
            return;
        }
        let cell = self.water.cells.get_mut(x as usize, y as usize, z as usize);
        if !cell.is_frozen() {
            return;
        }
        cell.set_frozen(false);
        self.water.destabilize(x, y, z);
        self.grid.mark_chunk_dirty(x, y, z);
    }

    /// Clear the stable bit on a cell and its neighbors so the next tick
    /// reconsiders them.
    pub fn destabilize_water(&mut self, x: i32, y: i32, z: i32) {
        self.water.destabilize(x, y, z);
    }

    /// Push the water out of a cell before a solid is placed there: up to
    /// neighbors with space, then above; whatever cannot be placed is lost.
    pub fn displace_water(&mut self, x: i32, y: i32, z: i32) {
        if !self.grid.in_bounds(x, y, z) {
            return;
        }
        let cell = self.water.cell(x, y, z);
        let mut remaining = i32::from(cell.level());
        if remaining == 0 && !cell.is_frozen() {
            return;
        }

        let mut targets = [(x - 1, y, z), (x + 1, y, z), (x, y - 1, z), (x, y + 1, z), (x, y, z + 1)];
        targets.shuffle(&mut self.rng);
        for (nx, ny, nz) in targets {
            if remaining == 0 {
                break;
            }
            if !can_hold_water(&self.grid, &self.water, nx, ny, nz) {
                continue;
            }
            let space = i32::from(MAX_LEVEL) - i32::from(self.water.cell(nx, ny, nz).level());
            if space <= 0 {
                continue;
            }
            let pushed = space.min(remaining);
            let level = i32::from(self.water.cell(nx, ny, nz).level());
            self.water.set_level(&mut self.counts, nx, ny, nz, level + pushed);
            remaining -= pushed;
        }

        // Clear whatever state the cell carried, spilled or not
        self.water.set_level(&mut self.counts, x, y, z, 0);
        let slot = self.water.cells.get_mut(x as usize, y as usize, z as usize);
        slot.set_frozen(false);
        slot.set_pressure(false);
        slot.set_pressure_source_z(0);
    }

    /// Empty the whole water field and zero its share of the presence
    /// registry.
    pub fn clear_water(&mut self) {
        self.water.cells.clear();
        self.water.evap_accum = 0.0;
        self.water.wetness_accum = 0.0;
        self.water.update_count = 0;
        self.counts.water_active_cells = 0;
    }

    /// Reset interval accumulators and destabilize everything; call after
    /// restoring the water grid from a save.
    pub fn reset_water_accumulators(&mut self) {
        self.water.evap_accum = 0.0;
        self.water.wetness_accum = 0.0;
        for cell in self.water.cells.as_mut_slice() {
            cell.set_stable(false);
        }
    }

    /// Main water tick.
    pub fn update_water(&mut self) {
        let SimulationWorld { grid, materials, water, counts, rng, weather, clock, config, .. } = self;
        if !config.water_enabled {
            return;
        }
        if counts.water_active_cells == 0 {
            water.update_count = 0;
            return;
        }
        water.update_count = 0;

        let mut do_evap = false;
        if config.water_evaporation_enabled {
            water.evap_accum += clock.game_delta;
            if water.evap_accum >= config.water_evap_interval {
                water.evap_accum -= config.water_evap_interval;
                do_evap = true;
            }
        }
        let raining = weather.current.is_raining();

        // Bottom-up scan so falling water lands before the layer above moves.
        'scan: for z in 0..grid.depth() {
            for y in 0..grid.height() {
                for x in 0..grid.width() {
                    let cell = water.cells.get(x as usize, y as usize, z as usize);
                    if cell.is_stable() && !cell.is_source() && !cell.is_drain() {
                        continue;
                    }
                    process_water_cell(grid, water, counts, rng, weather, x, y, z, do_evap, raining);
                    water.update_count += 1;
                    if water.update_count >= WATER_MAX_UPDATES_PER_TICK {
                        break 'scan;
                    }
                }
            }
        }

        // Standing water soaks the soil under and around it.
        water.wetness_accum += clock.game_delta;
        let sync_interval = clock.game_hours_to_seconds(config.wetness_sync_interval_hours);
        if water.wetness_accum >= sync_interval {
            water.wetness_accum -= sync_interval;
            for z in 0..grid.depth() {
                for y in 0..grid.height() {
                    for x in 0..grid.width() {
                        if !materials.is_wall_natural(x, y, z)
                            || !materials.wall_material(x, y, z).is_soil()
                        {
                            continue;
                        }
                        let wet_above = water.cell(x, y, z + 1).level() > 0
                            && !water.cell(x, y, z + 1).is_frozen();
                        if wet_above {
                            grid.set_wetness(x, y, z, crate::core_types::WETNESS_MAX);
                        }
                    }
                }
            }
        }
    }

    /// Phase-change pass, run right after temperature: freeze at or below
    /// the freezing point, thaw above it, boil into steam at the generation
    /// temperature. Frozen cells keep their level, so freeze/thaw conserves
    /// water.
    pub fn update_water_freezing(&mut self) {
        if !self.config.water_enabled
            || !self.config.temperature_enabled
            || self.counts.water_active_cells == 0
        {
            return;
        }
        let boil_temp = self.config.steam_generation_temp;
        for z in 0..self.grid.depth() {
            for y in 0..self.grid.height() {
                for x in 0..self.grid.width() {
                    let cell = self.water.cell(x, y, z);
                    if cell.level() == 0 {
                        continue;
                    }
                    let temp = self.get_temperature(x, y, z);
                    if cell.is_frozen() {
                        if temp > TEMP_WATER_FREEZES {
                            self.thaw_water(x, y, z);
                        }
                    } else if temp <= TEMP_WATER_FREEZES {
                        self.freeze_water(x, y, z);
                    } else if temp >= boil_temp {
                        self.remove_water(x, y, z, 1);
                        self.generate_steam_from_boiling_water(x, y, z, 1);
                    }
                }
            }
        }
    }
}

/// One cell's water tick: refill sources, drain drains, fall, equalize,
/// pressure-push, evaporate, then settle.
#[allow(clippy::too_many_arguments)]
fn process_water_cell(
    grid: &mut VoxelGrid,
    water: &mut WaterState,
    counts: &mut ActivityCounts,
    rng: &mut ChaCha8Rng,
    weather: &WeatherSystem,
    x: i32,
    y: i32,
    z: i32,
    do_evap: bool,
    raining: bool,
) {
    let mut moved = false;

    let cell = water.cell(x, y, z);
    if cell.is_source() {
        if cell.level() < MAX_LEVEL {
            water.set_level(counts, x, y, z, i32::from(MAX_LEVEL));
            moved = true;
        }
        let slot = water.cells.get_mut(x as usize, y as usize, z as usize);
        slot.set_pressure(true);
        slot.set_pressure_source_z(z);
    }

    let cell = water.cell(x, y, z);
    if cell.is_drain() && cell.level() > 0 {
        water.set_level(counts, x, y, z, i32::from(cell.level()) - 1);
        moved = true;
    }

    // Frozen water sits where it is; flow treats it as a solid block.
    if water.cell(x, y, z).is_frozen() {
        if !moved {
            water
                .cells
                .get_mut(x as usize, y as usize, z as usize)
                .set_stable(true);
        }
        return;
    }

    if water.cell(x, y, z).level() > 0 && try_fall(water, counts, grid, x, y, z) {
        moved = true;
    }
    if water.cell(x, y, z).level() > 0 && try_equalize(water, counts, grid, rng, weather, x, y, z) {
        moved = true;
    }
    {
        let cell = water.cell(x, y, z);
        if cell.level() >= MAX_LEVEL
            && cell.has_pressure()
            && can_hold_water(grid, water, x, y, z + 1)
            && try_pressure_push(water, counts, grid, x, y, z)
        {
            moved = true;
        }
    }

    // Shallow exposed water evaporates between rains, dampening the ground
    // beneath it.
    if do_evap && !raining {
        let cell = water.cell(x, y, z);
        if cell.level() == 1
            && !cell.is_source()
            && grid.is_exposed_to_sky(x, y, z)
        {
            water.set_level(counts, x, y, z, 0);
            if z > 0 {
                let wet = grid.wetness(x, y, z - 1);
                grid.set_wetness(x, y, z - 1, wet + 1);
            }
            moved = true;
        }
    }

    let cell = water.cells.get_mut(x as usize, y as usize, z as usize);
    if cell.level() < MAX_LEVEL {
        cell.set_pressure(false);
    }
    if !moved && !cell.is_source() && !cell.is_drain() {
        cell.set_stable(true);
    }
}

/// Gravity: move as much water down as the cell below has room for.
fn try_fall(
    water: &mut WaterState,
    counts: &mut ActivityCounts,
    grid: &VoxelGrid,
    x: i32,
    y: i32,
    z: i32,
) -> bool {
    if z == 0 || !can_hold_water(grid, water, x, y, z - 1) {
        return false;
    }
    let src = water.cell(x, y, z);
    let below = water.cell(x, y, z - 1);
    let space = i32::from(MAX_LEVEL) - i32::from(below.level());
    let flow = space.min(i32::from(src.level()));
    if flow <= 0 {
        return false;
    }
    water.set_level(counts, x, y, z, i32::from(src.level()) - flow);
    water.set_level(counts, x, y, z - 1, i32::from(below.level()) + flow);
    if src.has_pressure() {
        let dst = water.cells.get_mut(x as usize, y as usize, (z - 1) as usize);
        dst.set_pressure(true);
        dst.set_pressure_source_z(src.pressure_source_z());
    }
    true
}

/// Lateral equalization with the four orthogonal neighbors, shuffled and
/// downwind-first in strong wind.
fn try_equalize(
    water: &mut WaterState,
    counts: &mut ActivityCounts,
    grid: &VoxelGrid,
    rng: &mut ChaCha8Rng,
    weather: &WeatherSystem,
    x: i32,
    y: i32,
    z: i32,
) -> bool {
    let mut order = [0usize, 1, 2, 3];
    order.shuffle(rng);
    if weather.wind_strength > 0.5 {
        order.sort_by(|&a, &b| {
            let da = weather.wind_dot(ORTHO_4[a].0, ORTHO_4[a].1);
            let db = weather.wind_dot(ORTHO_4[b].0, ORTHO_4[b].1);
            db.partial_cmp(&da).unwrap_or(std::cmp::Ordering::Equal)
        });
    }

    let mut moved = false;
    for dir in order {
        let (dx, dy) = ORTHO_4[dir];
        let (nx, ny) = (x + dx, y + dy);
        if !can_hold_water(grid, water, nx, ny, z) {
            continue;
        }
        let level = i32::from(water.cell(x, y, z).level());
        let neighbor = i32::from(water.cell(nx, ny, z).level());
        let diff = level - neighbor;
        if diff >= 2 {
            transfer_one(water, counts, x, y, z, nx, ny);
            moved = true;
            if level - 1 <= 1 {
                break;
            }
        } else if diff == 1 && level > 1 {
            // A one-step slope only feeds a single neighbor per tick
            transfer_one(water, counts, x, y, z, nx, ny);
            moved = true;
            break;
        }
    }
    moved
}

fn transfer_one(
    water: &mut WaterState,
    counts: &mut ActivityCounts,
    x: i32,
    y: i32,
    z: i32,
    nx: i32,
    ny: i32,
) {
    let src = water.cell(x, y, z);
    let dst = water.cell(nx, ny, z);
    water.set_level(counts, x, y, z, i32::from(src.level()) - 1);
    water.set_level(counts, nx, ny, z, i32::from(dst.level()) + 1);
    if src.has_pressure() {
        let slot = water.cells.get_mut(nx as usize, ny as usize, z as usize);
        slot.set_pressure(true);
        slot.set_pressure_source_z(src.pressure_source_z());
    }
}

/// U-tube pressure: breadth-first through fully-filled cells for a non-full
/// cell strictly below the pressure source's z, and push one unit there.
/// The visited set is a generation-stamped array so the reset is O(1).
fn try_pressure_push(
    water: &mut WaterState,
    counts: &mut ActivityCounts,
    grid: &VoxelGrid,
    x: i32,
    y: i32,
    z: i32,
) -> bool {
    let source = water.cell(x, y, z);
    let psz = source.pressure_source_z();
    if psz <= 0 {
        return false;
    }

    water.visited_gen = water.visited_gen.wrapping_add(1);
    if water.visited_gen == 0 {
        water.visited.clear();
        water.visited_gen = 1;
    }
    let generation = water.visited_gen;

    const DIRS: [(i32, i32, i32); 6] =
        [(0, 0, 1), (0, 0, -1), (-1, 0, 0), (1, 0, 0), (0, -1, 0), (0, 1, 0)];

    let mut queue: Vec<(i32, i32, i32)> = Vec::with_capacity(WATER_PRESSURE_SEARCH_LIMIT);
    let mut head = 0;
    water.visited.set(x as usize, y as usize, z as usize, generation);
    for (dx, dy, dz) in DIRS {
        let (nx, ny, nz) = (x + dx, y + dy, z + dz);
        if !can_hold_water(grid, water, nx, ny, nz) {
            continue;
        }
        if water.visited.get(nx as usize, ny as usize, nz as usize) == generation {
            continue;
        }
        water.visited.set(nx as usize, ny as usize, nz as usize, generation);
        queue.push((nx, ny, nz));
        if queue.len() >= WATER_PRESSURE_SEARCH_LIMIT {
            break;
        }
    }

    while head < queue.len() {
        let (cx, cy, cz) = queue[head];
        head += 1;
        let current = water.cell(cx, cy, cz);

        if current.level() < MAX_LEVEL {
            // Pressure only lifts water to one below its source level
            if cz >= psz {
                continue;
            }
            let src_level = i32::from(water.cell(x, y, z).level());
            if src_level == 0 {
                return false;
            }
            water.set_level(counts, x, y, z, src_level - 1);
            water.set_level(counts, cx, cy, cz, i32::from(current.level()) + 1);
            let dst = water.cells.get_mut(cx as usize, cy as usize, cz as usize);
            dst.set_pressure(true);
            dst.set_pressure_source_z(psz);
            let src = water.cells.get_mut(x as usize, y as usize, z as usize);
            if src.level() < MAX_LEVEL {
                src.set_pressure(false);
            }
            return true;
        }

        // Full cell: keep searching through it
        for (dx, dy, dz) in DIRS {
            let (nx, ny, nz) = (cx + dx, cy + dy, cz + dz);
            if !can_hold_water(grid, water, nx, ny, nz) {
                continue;
            }
            if water.visited.get(nx as usize, ny as usize, nz as usize) == generation {
                continue;
            }
            water.visited.set(nx as usize, ny as usize, nz as usize, generation);
            if queue.len() < WATER_PRESSURE_SEARCH_LIMIT {
                queue.push((nx, ny, nz));
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_types::CellKind;

    fn open_world() -> SimulationWorld {
        let mut world = SimulationWorld::new(8, 8, 4, 99);
        world.config.weather_enabled = false;
        world.config.water_evaporation_enabled = false;
        for y in 0..8 {
            for x in 0..8 {
                world.grid.set_kind(x, y, 0, CellKind::Rock);
            }
        }
        world
    }

    #[test]
    fn set_level_clamps_and_reads_back() {
        let mut world = open_world();
        world.set_water_level(2, 2, 1, 12);
        assert_eq!(world.get_water_level(2, 2, 1), 7);
        world.set_water_level(2, 2, 1, -3);
        assert_eq!(world.get_water_level(2, 2, 1), 0);
        world.set_water_level(99, 0, 0, 5); // silent no-op
        assert_eq!(world.get_water_level(99, 0, 0), 0);
    }

    #[test]
    fn add_then_remove_round_trips_below_cap() {
        let mut world = open_world();
        world.set_water_level(1, 1, 1, 3);
        world.add_water(1, 1, 1, 2);
        world.remove_water(1, 1, 1, 2);
        assert_eq!(world.get_water_level(1, 1, 1), 3);
    }

    #[test]
    fn water_falls_to_the_floor() {
        let mut world = open_world();
        world.set_water_level(3, 3, 3, 4);
        for _ in 0..6 {
            world.tick();
        }
        assert_eq!(world.get_water_level(3, 3, 3), 0);
        assert_eq!(world.get_water_level(3, 3, 2), 0);
        let layer_total: i32 = (0..8)
            .flat_map(|y| (0..8).map(move |x| (x, y)))
            .map(|(x, y)| i32::from(world.get_water_level(x, y, 1)))
            .sum();
        assert_eq!(layer_total, 4, "everything landed on the bottom layer");
    }

    #[test]
    fn water_spreads_over_a_floor() {
        let mut world = open_world();
        world.set_water_level(4, 4, 1, 7);
        for _ in 0..40 {
            world.tick();
        }
        let total: i32 = (0..8)
            .flat_map(|y| (0..8).map(move |x| (x, y)))
            .map(|(x, y)| i32::from(world.get_water_level(x, y, 1)))
            .sum();
        assert_eq!(total, 7, "equalization conserves water");
        assert!(world.get_water_level(4, 4, 1) < 7, "the column flattened");
    }

    #[test]
    fn conservation_in_a_sealed_world() {
        let mut world = open_world();
        world.config.fire_enabled = false;
        world.set_water_level(2, 2, 2, 6);
        world.set_water_level(5, 5, 1, 3);
        let total_before: i32 = world_total(&world);
        world.run_game_seconds(5.0);
        assert_eq!(world_total(&world), total_before);
    }

    fn world_total(world: &SimulationWorld) -> i32 {
        let mut total = 0;
        for z in 0..world.grid.depth() {
            for y in 0..world.grid.height() {
                for x in 0..world.grid.width() {
                    total += i32::from(world.get_water_level(x, y, z));
                }
            }
        }
        total
    }

    #[test]
    fn drains_empty_their_cell() {
        let mut world = open_world();
        // Wall the drain in so lateral spread can't outrun it
        for (x, y) in [(0, 1), (2, 1), (1, 0), (1, 2)] {
            world.grid.set_kind(x, y, 1, CellKind::Wall);
        }
        world.set_water_level(1, 1, 1, 5);
        world.set_water_drain(1, 1, 1, true);
        for _ in 0..200 {
            world.tick();
        }
        assert_eq!(world.get_water_level(1, 1, 1), 0);
        assert!(world.counts.water_active_cells >= 1, "drain stays registered");
        world.set_water_drain(1, 1, 1, false);
        assert_eq!(world.counts.water_active_cells, 0);
    }

    #[test]
    fn sources_fill_their_basin() {
        let mut world = SimulationWorld::new(3, 3, 3, 5);
        world.config.weather_enabled = false;
        for y in 0..3 {
            for x in 0..3 {
                world.grid.set_kind(x, y, 0, CellKind::Rock);
            }
        }
        // Wall off a 1x1 shaft at (1,1)
        for (x, y) in [(0, 1), (2, 1), (1, 0), (1, 2), (0, 0), (2, 2), (0, 2), (2, 0)] {
            world.grid.set_kind(x, y, 1, CellKind::Wall);
        }
        world.set_water_source(1, 1, 1, true);
        for _ in 0..30 {
            world.tick();
        }
        assert_eq!(world.get_water_level(1, 1, 1), 7);
        assert!(world.has_water_pressure(1, 1, 1));
    }

    #[test]
    fn freeze_thaw_is_idempotent_and_conserving() {
        let mut world = open_world();
        world.config.temperature_enabled = false; // hold the phase by hand
        world.set_water_level(5, 5, 2, 3);
        world.freeze_water(5, 5, 2);
        world.freeze_water(5, 5, 2);
        assert!(world.is_water_frozen(5, 5, 2));
        assert_eq!(world.get_water_level(5, 5, 2), 3);
        // Frozen water does not fall
        for _ in 0..10 {
            world.tick();
        }
        assert_eq!(world.get_water_level(5, 5, 2), 3);
        world.thaw_water(5, 5, 2);
        world.thaw_water(5, 5, 2);
        assert!(!world.is_water_frozen(5, 5, 2));
        assert_eq!(world.get_water_level(5, 5, 2), 3);
    }

    #[test]
    fn displace_pushes_water_aside() {
        let mut world = open_world();
        world.set_water_level(3, 3, 1, 4);
        world.displace_water(3, 3, 1);
        assert_eq!(world.get_water_level(3, 3, 1), 0);
        let spilled: i32 = [(2, 3, 1), (4, 3, 1), (3, 2, 1), (3, 4, 1), (3, 3, 2)]
            .iter()
            .map(|&(x, y, z)| i32::from(world.get_water_level(x, y, z)))
            .sum();
        assert_eq!(spilled, 4, "displaced units land in the neighborhood");
    }

    #[test]
    fn speed_multiplier_tiers() {
        let mut world = open_world();
        assert_eq!(world.water_speed_multiplier(1, 1, 1), 1.0);
        world.set_water_level(1, 1, 1, 2);
        assert_eq!(world.water_speed_multiplier(1, 1, 1), world.config.water_speed_shallow);
        world.set_water_level(1, 1, 1, 4);
        assert_eq!(world.water_speed_multiplier(1, 1, 1), world.config.water_speed_medium);
        world.set_water_level(1, 1, 1, 7);
        assert_eq!(world.water_speed_multiplier(1, 1, 1), world.config.water_speed_deep);
        world.freeze_water(1, 1, 1);
        assert_eq!(world.water_speed_multiplier(1, 1, 1), 1.0, "ice is solid footing");
    }
}

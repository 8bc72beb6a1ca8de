//! Steam: a rising gas like smoke, but coupled to temperature.
//!
//! Steam carries heat upward as it climbs (three quarters of the difference
//! per rise), escapes off the top of the world, and condenses back into
//! water when the local air is below the condensation point. There is no
//! fill-down pressure phase; cooling is what empties a trapped steam
//! pocket.

use crate::core_types::{cell_allows_fluids, SteamCell, MAX_LEVEL};
use crate::grid::{Field3, VoxelGrid};
use crate::simulation::temperature::TemperatureState;
use crate::simulation::water::WaterState;
use crate::simulation::{ActivityCounts, SimulationWorld, ORTHO_4};
use rand::seq::SliceRandom;
use rand::Rng;
use rand_chacha::ChaCha8Rng;

const STEAM_MAX_UPDATES_PER_TICK: u32 = 8192;

#[derive(Debug)]
pub(crate) struct SteamState {
    pub(crate) cells: Field3<SteamCell>,
    pub(crate) rise_accum: f32,
    tick: u32,
    has_risen: Field3<u16>,
    rise_gen: u16,
    pub(crate) update_count: u32,
}

impl SteamState {
    pub(crate) fn new(w: usize, h: usize, d: usize) -> Self {
        Self {
            cells: Field3::new(w, h, d),
            rise_accum: 0.0,
            tick: 0,
            has_risen: Field3::new(w, h, d),
            rise_gen: 0,
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
    pub(crate) fn cell(&self, x: i32, y: i32, z: i32) -> SteamCell {
        if self.in_bounds(x, y, z) {
            self.cells.get(x as usize, y as usize, z as usize)
        } else {
            SteamCell::default()
        }
    }

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

    fn set_level(&mut self, counts: &mut ActivityCounts, x: i32, y: i32, z: i32, level: i32) {
        if !self.in_bounds(x, y, z) {
            return;
        }
        let clamped = level.clamp(0, i32::from(MAX_LEVEL)) as u8;
        let cell = self.cells.get_mut(x as usize, y as usize, z as usize);
        let old = cell.level();
        cell.set_level(clamped);
        if old == 0 && clamped > 0 {
            counts.steam_active_cells += 1;
        } else if old > 0 && clamped == 0 {
            counts.steam_active_cells = counts.steam_active_cells.saturating_sub(1);
        }
        if old != clamped {
            self.destabilize(x, y, z);
        }
    }
}

#[inline]
fn can_hold_steam(grid: &VoxelGrid, x: i32, y: i32, z: i32) -> bool {
    grid.in_bounds(x, y, z) && cell_allows_fluids(grid.kind(x, y, z))
}

impl SimulationWorld {
    /// Steam density 0..7; 0 when out of bounds.
    #[must_use]
    pub fn get_steam_level(&self, x: i32, y: i32, z: i32) -> u8 {
        self.steam.cell(x, y, z).level()
    }

    #[must_use]
    pub fn has_steam(&self, x: i32, y: i32, z: i32) -> bool {
        self.get_steam_level(x, y, z) > 0
    }

    pub fn set_steam_level(&mut self, x: i32, y: i32, z: i32, level: i32) {
        self.steam.set_level(&mut self.counts, x, y, z, level);
    }

    pub fn add_steam(&mut self, x: i32, y: i32, z: i32, amount: i32) {
        let level = i32::from(self.steam.cell(x, y, z).level());
        self.steam.set_level(&mut self.counts, x, y, z, level + amount);
    }

    pub fn destabilize_steam(&mut self, x: i32, y: i32, z: i32) {
        self.steam.destabilize(x, y, z);
    }

    /// Boiling water flashes to steam in its cell and the one above.
    pub fn generate_steam_from_boiling_water(&mut self, x: i32, y: i32, z: i32, amount: i32) {
        if !self.grid.in_bounds(x, y, z) || amount <= 0 {
            return;
        }
        self.add_steam(x, y, z, amount);
        if can_hold_steam(&self.grid, x, y, z + 1) {
            self.add_steam(x, y, z + 1, amount);
        }
    }

    /// Empty the whole steam field and zero its share of the presence
    /// registry.
    pub fn clear_steam(&mut self) {
        self.steam.cells.clear();
        self.steam.rise_accum = 0.0;
        self.steam.update_count = 0;
        self.counts.steam_active_cells = 0;
    }

    /// Reset interval accumulators and destabilize everything; call after
    /// restoring the steam grid from a save.
    pub fn reset_steam_accumulators(&mut self) {
        self.steam.rise_accum = 0.0;
        for cell in self.steam.cells.as_mut_slice() {
            cell.set_stable(false);
        }
    }

    /// Main steam tick, bottom-to-top with alternating x/y direction.
    pub fn update_steam(&mut self) {
        let SimulationWorld {
            grid,
            steam,
            water,
            temperature,
            counts,
            rng,
            clock,
            config,
            ..
        } = self;
        if !config.steam_enabled {
            return;
        }
        if counts.steam_active_cells == 0 {
            steam.update_count = 0;
            return;
        }
        steam.update_count = 0;
        steam.tick = steam.tick.wrapping_add(1);

        steam.rise_accum += clock.game_delta;
        let do_rise = steam.rise_accum >= config.steam_rise_interval;
        if do_rise {
            steam.rise_accum -= config.steam_rise_interval;
            steam.rise_gen = steam.rise_gen.wrapping_add(1);
            if steam.rise_gen == 0 {
                steam.has_risen.clear();
                steam.rise_gen = 1;
            }
        }

        let reverse_x = steam.tick & 1 != 0;
        let reverse_y = steam.tick & 2 != 0;

        'scan: for z in 0..grid.depth() {
            for yi in 0..grid.height() {
                let y = if reverse_y { grid.height() - 1 - yi } else { yi };
                for xi in 0..grid.width() {
                    let x = if reverse_x { grid.width() - 1 - xi } else { xi };
                    let cell = steam.cells.get(x as usize, y as usize, z as usize);
                    if cell.is_stable() {
                        continue;
                    }
                    process_steam_cell(
                        grid, steam, water, temperature, counts, rng, config, x, y, z, do_rise,
                    );
                    steam.update_count += 1;
                    if steam.update_count >= STEAM_MAX_UPDATES_PER_TICK {
                        break 'scan;
                    }
                }
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn process_steam_cell(
    grid: &VoxelGrid,
    steam: &mut SteamState,
    water: &mut WaterState,
    temperature: &mut TemperatureState,
    counts: &mut ActivityCounts,
    rng: &mut ChaCha8Rng,
    config: &crate::config::SimConfig,
    x: i32,
    y: i32,
    z: i32,
    do_rise: bool,
) {
    if steam.cell(x, y, z).level() == 0 {
        steam.cells.get_mut(x as usize, y as usize, z as usize).set_stable(true);
        return;
    }

    let mut moved = false;

    if do_rise && try_rise(grid, steam, temperature, counts, config, x, y, z) {
        moved = true;
    }

    if steam.cell(x, y, z).level() > 0 && try_spread(grid, steam, counts, rng, x, y, z) {
        moved = true;
    }

    if steam.cell(x, y, z).level() > 0
        && try_condense(grid, steam, water, temperature, counts, rng, config, x, y, z)
    {
        moved = true;
    }

    let cell = steam.cells.get_mut(x as usize, y as usize, z as usize);
    if !moved && cell.level() == 0 {
        cell.set_stable(true);
    }
}

/// One rise step: climb into the cell above, carrying most of the heat
/// difference with it, or vent off the top of the map.
fn try_rise(
    grid: &VoxelGrid,
    steam: &mut SteamState,
    temperature: &mut TemperatureState,
    counts: &mut ActivityCounts,
    config: &crate::config::SimConfig,
    x: i32,
    y: i32,
    z: i32,
) -> bool {
    let src = steam.cell(x, y, z);
    if src.level() == 0 {
        return false;
    }

    // Top of the world: the sky takes it
    if z >= grid.depth() - 1 {
        steam.set_level(counts, x, y, z, i32::from(src.level()) - 1);
        return true;
    }

    if !can_hold_steam(grid, x, y, z + 1) {
        return false;
    }
    if steam.has_risen.get(x as usize, y as usize, z as usize) == steam.rise_gen {
        return false;
    }

    let dst = steam.cell(x, y, z + 1);
    let space = i32::from(MAX_LEVEL) - i32::from(dst.level());
    if space <= 0 {
        return false;
    }

    let flow = i32::from(config.steam_rise_flow)
        .min(i32::from(src.level()))
        .min(space);
    if flow <= 0 {
        return false;
    }

    steam.set_level(counts, x, y, z, i32::from(src.level()) - flow);
    steam.set_level(counts, x, y, z + 1, i32::from(dst.level()) + flow);
    steam
        .has_risen
        .set(x as usize, y as usize, (z + 1) as usize, steam.rise_gen);

    // Steam is a heat elevator: most of the temperature difference moves up
    let src_temp = temperature.cell(x, y, z).current();
    let dst_temp = temperature.cell(x, y, z + 1).current();
    if src_temp > dst_temp {
        let transfer = (src_temp - dst_temp) * 3 / 4;
        if transfer > 0 {
            temperature
                .cells
                .get_mut(x as usize, y as usize, (z + 1) as usize)
                .set_current(dst_temp + transfer);
            temperature.destabilize(counts, x, y, z + 1);
        }
    }

    true
}

/// Horizontal equalization; steam stays cohesive like smoke but ignores
/// the wind (it hugs whatever room it boiled into).
fn try_spread(
    grid: &VoxelGrid,
    steam: &mut SteamState,
    counts: &mut ActivityCounts,
    rng: &mut ChaCha8Rng,
    x: i32,
    y: i32,
    z: i32,
) -> bool {
    let mut order = [0usize, 1, 2, 3];
    order.shuffle(rng);

    let mut moved = false;
    for dir in order {
        let (dx, dy) = ORTHO_4[dir];
        let (nx, ny) = (x + dx, y + dy);
        if !can_hold_steam(grid, nx, ny, z) {
            continue;
        }
        let level = i32::from(steam.cell(x, y, z).level());
        let neighbor = i32::from(steam.cell(nx, ny, z).level());
        let diff = level - neighbor;
        if diff >= 2 {
            steam.set_level(counts, x, y, z, level - 1);
            steam.set_level(counts, nx, ny, z, neighbor + 1);
            moved = true;
            if level - 1 <= 1 {
                break;
            }
        } else if diff == 1 && level > 1 {
            steam.set_level(counts, x, y, z, level - 1);
            steam.set_level(counts, nx, ny, z, neighbor + 1);
            moved = true;
            break;
        }
    }
    moved
}

/// Cold steam turns back into water, which falls straight down to the first
/// occupied or blocked cell.
#[allow(clippy::too_many_arguments)]
fn try_condense(
    grid: &VoxelGrid,
    steam: &mut SteamState,
    water: &mut WaterState,
    temperature: &mut TemperatureState,
    counts: &mut ActivityCounts,
    rng: &mut ChaCha8Rng,
    config: &crate::config::SimConfig,
    x: i32,
    y: i32,
    z: i32,
) -> bool {
    let cell = steam.cell(x, y, z);
    if cell.level() == 0 {
        return false;
    }
    if config.steam_condensation_chance > 1
        && rng.random_range(0..config.steam_condensation_chance) != 0
    {
        return false;
    }

    let temp = temperature.cell(x, y, z).current();
    if temp >= config.steam_condensation_temp {
        return false;
    }

    // The droplet falls until it meets water or solid ground
    let mut water_z = z;
    while water_z > 0
        && can_hold_steam(grid, x, y, water_z - 1)
        && water.cell(x, y, water_z - 1).level() == 0
    {
        water_z -= 1;
    }

    let level = i32::from(water.cell(x, y, water_z).level());
    water.set_level(counts, x, y, water_z, level + 1);
    steam.set_level(counts, x, y, z, i32::from(cell.level()) - 1);
    true
}

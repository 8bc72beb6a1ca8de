//! Temperature: heat diffusion with source pinning, insulation tiers, and
//! decay toward the z-level ambient.
//!
//! Values are signed Celsius clamped to the i8 range. Heat and cold sources
//! are pinned each step and keep their neighborhood unstable, so rooms near
//! a forge never fall fully quiescent; everything else settles back to
//! ambient and flips its stable bit.

use crate::core_types::{cell_def, Material, TempCell};
use crate::grid::{Field3, MaterialOverlay, VoxelGrid};
use crate::simulation::{ActivityCounts, SimulationWorld};
use crate::weather::WeatherSystem;

pub const TEMP_MIN: i32 = -128;
pub const TEMP_MAX: i32 = 127;

// Threshold bands (Celsius)
pub const TEMP_DEEP_FREEZE: i32 = -40;
pub const TEMP_COLD_STORAGE: i32 = 5;
pub const TEMP_COMFORTABLE_MIN: i32 = 15;
pub const TEMP_COMFORTABLE_MAX: i32 = 25;
pub const TEMP_HOT: i32 = 40;
/// Minimum temperature an open flame pushes its cell toward.
pub const TEMP_FIRE_MIN: i32 = 80;
/// Additional degrees per fire level above the minimum.
const TEMP_FIRE_PER_LEVEL: i32 = 5;

const TEMP_MAX_UPDATES_PER_TICK: u32 = 4096;

const OFFSETS: [(i32, i32, i32); 7] =
    [(0, 0, 0), (-1, 0, 0), (1, 0, 0), (0, -1, 0), (0, 1, 0), (0, 0, -1), (0, 0, 1)];

const FACES: [(i32, i32, i32); 6] =
    [(-1, 0, 0), (1, 0, 0), (0, -1, 0), (0, 1, 0), (0, 0, -1), (0, 0, 1)];

#[derive(Debug)]
pub(crate) struct TemperatureState {
    pub(crate) cells: Field3<TempCell>,
    pub(crate) update_count: u32,
}

impl TemperatureState {
    pub(crate) fn new(w: usize, h: usize, d: usize) -> Self {
        Self { cells: Field3::new(w, h, d), update_count: 0 }
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
    pub(crate) fn cell(&self, x: i32, y: i32, z: i32) -> TempCell {
        if self.in_bounds(x, y, z) {
            self.cells.get(x as usize, y as usize, z as usize)
        } else {
            TempCell::default()
        }
    }

    fn make_unstable(&mut self, counts: &mut ActivityCounts, x: i32, y: i32, z: i32) {
        if !self.in_bounds(x, y, z) {
            return;
        }
        let cell = self.cells.get_mut(x as usize, y as usize, z as usize);
        if cell.is_stable() {
            cell.set_stable(false);
            counts.temp_unstable_cells += 1;
        }
    }

    fn make_stable(&mut self, counts: &mut ActivityCounts, x: i32, y: i32, z: i32) {
        if !self.in_bounds(x, y, z) {
            return;
        }
        let cell = self.cells.get_mut(x as usize, y as usize, z as usize);
        if !cell.is_stable() {
            cell.set_stable(true);
            counts.temp_unstable_cells = counts.temp_unstable_cells.saturating_sub(1);
        }
    }

    /// Clear the stable bit on the cell and its six face neighbors.
    pub(crate) fn destabilize(&mut self, counts: &mut ActivityCounts, x: i32, y: i32, z: i32) {
        for (dx, dy, dz) in OFFSETS {
            self.make_unstable(counts, x + dx, y + dy, z + dz);
        }
    }
}

/// Heat pushed into a cell by an open flame, shared by fire and sources.
pub(crate) fn apply_fire_heat_internal(
    temperature: &mut TemperatureState,
    counts: &mut ActivityCounts,
    x: i32,
    y: i32,
    z: i32,
    fire_level: u8,
) {
    if !temperature.in_bounds(x, y, z) || fire_level == 0 {
        return;
    }
    let target = TEMP_FIRE_MIN + i32::from(fire_level) * TEMP_FIRE_PER_LEVEL;
    let current = temperature.cell(x, y, z).current();
    if current >= target {
        return;
    }
    // Ramp up over a few steps rather than snapping to the flame temperature
    let step = ((target - current) / 4).max(1);
    temperature
        .cells
        .get_mut(x as usize, y as usize, z as usize)
        .set_current(current + step);
    temperature.destabilize(counts, x, y, z);
}

/// Transfer rate (percent) for an insulation tier.
fn tier_rate(tier: u8, tier1: i32, tier2: i32) -> i32 {
    match tier {
        0 => 100,
        1 => tier1,
        _ => tier2,
    }
}

/// Insulation tier of a cell: the wall material decides, air is tier 0.
fn insulation_tier(grid: &VoxelGrid, materials: &MaterialOverlay, x: i32, y: i32, z: i32) -> u8 {
    let mat = materials.wall_material(x, y, z);
    if mat != Material::None {
        return mat.insulation_tier();
    }
    cell_def(grid.kind(x, y, z)).insulation_tier
}

impl SimulationWorld {
    /// Equilibrium temperature for a z-level: the weather-driven surface
    /// value, decayed per level underground.
    #[must_use]
    pub fn ambient_temperature(&self, z: i32) -> i32 {
        let surface = WeatherSystem::ambient_surface_temp(&self.clock, &self.config).round() as i32;
        let depth = (self.config.surface_z - z).max(0);
        (surface - depth * self.config.ambient_depth_decay).clamp(TEMP_MIN, TEMP_MAX)
    }

    /// Current temperature in Celsius; out-of-bounds reads 0.
    #[must_use]
    pub fn get_temperature(&self, x: i32, y: i32, z: i32) -> i32 {
        self.temperature.cell(x, y, z).current()
    }

    /// Write a temperature directly, saturating to the i8 range.
    pub fn set_temperature(&mut self, x: i32, y: i32, z: i32, temp: i32) {
        if !self.grid.in_bounds(x, y, z) {
            return;
        }
        let cell = self.temperature.cells.get_mut(x as usize, y as usize, z as usize);
        let old = cell.current();
        cell.set_current(temp);
        if cell.current() != old {
            self.temperature.destabilize(&mut self.counts, x, y, z);
        }
    }

    #[must_use]
    pub fn is_heat_source(&self, x: i32, y: i32, z: i32) -> bool {
        self.temperature.cell(x, y, z).is_heat_source()
    }

    #[must_use]
    pub fn is_cold_source(&self, x: i32, y: i32, z: i32) -> bool {
        self.temperature.cell(x, y, z).is_cold_source()
    }

    /// Pin a cell as a permanent heat emitter at `heat_source_temp`.
    pub fn set_heat_source(&mut self, x: i32, y: i32, z: i32, is_source: bool) {
        if !self.grid.in_bounds(x, y, z) {
            return;
        }
        let cell = self.temperature.cells.get_mut(x as usize, y as usize, z as usize);
        let was_source = cell.is_source();
        cell.set_heat_source(is_source);
        let now_source = cell.is_source();
        if !was_source && now_source {
            self.counts.temp_source_count += 1;
        } else if was_source && !now_source {
            self.counts.temp_source_count = self.counts.temp_source_count.saturating_sub(1);
        }
        self.temperature.destabilize(&mut self.counts, x, y, z);
    }

    /// Pin a cell as a permanent cold emitter at `cold_source_temp`.
    pub fn set_cold_source(&mut self, x: i32, y: i32, z: i32, is_source: bool) {
        if !self.grid.in_bounds(x, y, z) {
            return;
        }
        let cell = self.temperature.cells.get_mut(x as usize, y as usize, z as usize);
        let was_source = cell.is_source();
        cell.set_cold_source(is_source);
        let now_source = cell.is_source();
        if !was_source && now_source {
            self.counts.temp_source_count += 1;
        } else if was_source && !now_source {
            self.counts.temp_source_count = self.counts.temp_source_count.saturating_sub(1);
        }
        self.temperature.destabilize(&mut self.counts, x, y, z);
    }

    /// Clear both source roles from a cell.
    pub fn remove_temperature_source(&mut self, x: i32, y: i32, z: i32) {
        self.set_heat_source(x, y, z, false);
        self.set_cold_source(x, y, z, false);
    }

    #[must_use]
    pub fn is_freezing(&self, x: i32, y: i32, z: i32) -> bool {
        self.get_temperature(x, y, z) <= super::water::TEMP_WATER_FREEZES
    }

    #[must_use]
    pub fn is_cold_storage(&self, x: i32, y: i32, z: i32) -> bool {
        self.get_temperature(x, y, z) <= TEMP_COLD_STORAGE
    }

    #[must_use]
    pub fn is_comfortable(&self, x: i32, y: i32, z: i32) -> bool {
        let t = self.get_temperature(x, y, z);
        (TEMP_COMFORTABLE_MIN..=TEMP_COMFORTABLE_MAX).contains(&t)
    }

    #[must_use]
    pub fn is_hot(&self, x: i32, y: i32, z: i32) -> bool {
        self.get_temperature(x, y, z) >= TEMP_HOT
    }

    /// Fire pushes heat into its cell; public hook for the fire field and
    /// external igniters.
    pub fn apply_fire_heat(&mut self, x: i32, y: i32, z: i32, fire_level: u8) {
        apply_fire_heat_internal(&mut self.temperature, &mut self.counts, x, y, z, fire_level);
    }

    pub fn destabilize_temperature(&mut self, x: i32, y: i32, z: i32) {
        self.temperature.destabilize(&mut self.counts, x, y, z);
    }

    /// Reset the whole field to ambient, dropping all sources.
    pub fn clear_temperature(&mut self) {
        for cell in self.temperature.cells.as_mut_slice() {
            *cell = TempCell::default();
        }
        self.counts.temp_source_count = 0;
        self.counts.temp_unstable_cells = 0;
        self.init_temperature_to_ambient();
    }

    /// Fill the grid with per-level ambient and mark everything stable.
    /// Runs at world creation and when clearing the field.
    pub(crate) fn init_temperature_to_ambient(&mut self) {
        for z in 0..self.grid.depth() {
            let ambient = self.ambient_temperature(z);
            for y in 0..self.grid.height() {
                for x in 0..self.grid.width() {
                    let cell = self.temperature.cells.get_mut(x as usize, y as usize, z as usize);
                    cell.set_current(ambient);
                    cell.set_stable(true);
                }
            }
        }
        self.counts.temp_unstable_cells = 0;
    }

    /// Temperature step: pin sources, diffuse across unstable cells with
    /// insulation-weighted neighbor averaging, then decay toward ambient.
    pub fn update_temperature(&mut self) {
        let SimulationWorld { grid, materials, temperature, counts, clock, config, .. } = self;
        if !config.temperature_enabled {
            return;
        }
        if counts.temp_source_count == 0 && counts.temp_unstable_cells == 0 {
            temperature.update_count = 0;
            return;
        }
        temperature.update_count = 0;

        let surface = WeatherSystem::ambient_surface_temp(clock, config).round() as i32;

        'scan: for z in 0..grid.depth() {
            let depth = (config.surface_z - z).max(0);
            let ambient = (surface - depth * config.ambient_depth_decay).clamp(TEMP_MIN, TEMP_MAX);
            for y in 0..grid.height() {
                for x in 0..grid.width() {
                    let cell = temperature.cells.get(x as usize, y as usize, z as usize);
                    if cell.is_stable() && !cell.is_source() {
                        continue;
                    }

                    if cell.is_source() {
                        let pinned = if cell.is_heat_source() {
                            config.heat_source_temp
                        } else {
                            config.cold_source_temp
                        };
                        temperature
                            .cells
                            .get_mut(x as usize, y as usize, z as usize)
                            .set_current(pinned);
                        // Sources keep their neighborhood live so heat keeps
                        // radiating outward
                        temperature.destabilize(counts, x, y, z);
                        temperature.update_count += 1;
                        if temperature.update_count >= TEMP_MAX_UPDATES_PER_TICK {
                            break 'scan;
                        }
                        continue;
                    }

                    let current = cell.current();
                    let own_rate = tier_rate(
                        insulation_tier(grid, materials, x, y, z),
                        config.insulation_tier1_rate,
                        config.insulation_tier2_rate,
                    );

                    // Weighted average with the six face neighbors; each
                    // pair transfers at the worse of the two insulation
                    // rates.
                    let mut sum = current * 100;
                    let mut weight = 100;
                    for (dx, dy, dz) in FACES {
                        let (nx, ny, nz) = (x + dx, y + dy, z + dz);
                        if !grid.in_bounds(nx, ny, nz) {
                            continue;
                        }
                        let n_rate = tier_rate(
                            insulation_tier(grid, materials, nx, ny, nz),
                            config.insulation_tier1_rate,
                            config.insulation_tier2_rate,
                        );
                        let w = own_rate.min(n_rate);
                        sum += temperature.cell(nx, ny, nz).current() * w;
                        weight += w;
                    }
                    let average = (sum + weight / 2).div_euclid(weight);

                    let mut next = current;
                    let delta = average - current;
                    if delta != 0 {
                        let mut step = delta * config.heat_transfer_speed / 100;
                        if step == 0 {
                            step = delta.signum();
                        }
                        next += step;
                    }

                    // Everything relaxes toward the z-level ambient
                    let drift = ambient - next;
                    if drift != 0 {
                        let mut step = drift * config.temp_decay_rate / 100;
                        if step == 0 {
                            step = drift.signum();
                        }
                        next += step;
                    }
                    let next = next.clamp(TEMP_MIN, TEMP_MAX);

                    if next != current {
                        temperature
                            .cells
                            .get_mut(x as usize, y as usize, z as usize)
                            .set_current(next);
                        temperature.destabilize(counts, x, y, z);
                    } else if next == ambient {
                        temperature.make_stable(counts, x, y, z);
                    }

                    temperature.update_count += 1;
                    if temperature.update_count >= TEMP_MAX_UPDATES_PER_TICK {
                        break 'scan;
                    }
                }
            }
        }
    }
}

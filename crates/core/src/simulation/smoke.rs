//! Smoke: a 1-7 gas field that rises, equalizes, fills down when trapped,
//! and fades out.
//!
//! Rise is rate-limited by a "has risen this generation" stamp so a plume
//! climbs one z-level per rise interval instead of teleporting to the
//! ceiling in a single tick. Trapped full cells pressurize and push their
//! smoke through a bounded downward search, never below the z the smoke
//! originally climbed from. Rain and mist keep smoke low and lingering.

use crate::core_types::{cell_allows_fluids, SmokeCell, MAX_LEVEL};
use crate::grid::{Field3, VoxelGrid};
use crate::simulation::{ActivityCounts, SimulationWorld, ORTHO_4};
use crate::weather::{WeatherKind, WeatherSystem};
use rand::seq::SliceRandom;
use rand::Rng;
use rand_chacha::ChaCha8Rng;

const SMOKE_MAX_UPDATES_PER_TICK: u32 = 65536;
const SMOKE_PRESSURE_SEARCH_LIMIT: usize = 64;

#[derive(Debug)]
pub(crate) struct SmokeState {
    pub(crate) cells: Field3<SmokeCell>,
    pub(crate) rise_accum: f32,
    pub(crate) dissipation_accum: f32,
    tick: u32,
    /// Generation stamps marking cells that received risen smoke this
    /// rise interval; a stamped cell will not pass its smoke on.
    has_risen: Field3<u16>,
    rise_gen: u16,
    visited: Field3<u16>,
    visited_gen: u16,
    pub(crate) update_count: u32,
}

impl SmokeState {
    pub(crate) fn new(w: usize, h: usize, d: usize) -> Self {
        Self {
            cells: Field3::new(w, h, d),
            rise_accum: 0.0,
            dissipation_accum: 0.0,
            tick: 0,
            has_risen: Field3::new(w, h, d),
            rise_gen: 0,
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
    pub(crate) fn cell(&self, x: i32, y: i32, z: i32) -> SmokeCell {
        if self.in_bounds(x, y, z) {
            self.cells.get(x as usize, y as usize, z as usize)
        } else {
            SmokeCell::default()
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
            counts.smoke_active_cells += 1;
        } else if old > 0 && clamped == 0 {
            counts.smoke_active_cells = counts.smoke_active_cells.saturating_sub(1);
        }
        if old != clamped {
            self.destabilize(x, y, z);
        }
    }
}

#[inline]
fn can_hold_smoke(grid: &VoxelGrid, x: i32, y: i32, z: i32) -> bool {
    grid.in_bounds(x, y, z) && cell_allows_fluids(grid.kind(x, y, z))
}

/// Smoke emitted by a burning cell: scaled by fire level, multiplied on wet
/// fuel (smoldering), placed in the cell and the one above it.
pub(crate) fn generate_smoke_from_fire_internal(
    smoke: &mut SmokeState,
    counts: &mut ActivityCounts,
    grid: &VoxelGrid,
    x: i32,
    y: i32,
    z: i32,
    fire_level: u8,
    generation_rate: u8,
) {
    if !smoke.in_bounds(x, y, z) || fire_level == 0 {
        return;
    }
    let mut amount = i32::from(fire_level / generation_rate.max(1));
    if amount < 1 {
        amount = 1;
    }
    match grid.wetness(x, y, z) {
        0 => {}
        1 => amount *= 2,
        _ => amount *= 3,
    }

    let level = i32::from(smoke.cell(x, y, z).level());
    smoke.set_level(counts, x, y, z, level + amount);

    if can_hold_smoke(grid, x, y, z + 1) {
        let above = i32::from(smoke.cell(x, y, z + 1).level());
        smoke.set_level(counts, x, y, z + 1, above + amount);
        smoke
            .cells
            .get_mut(x as usize, y as usize, (z + 1) as usize)
            .set_pressure_source_z(z);
    }
}

impl SimulationWorld {
    /// Smoke density 0..7; 0 when out of bounds.
    #[must_use]
    pub fn get_smoke_level(&self, x: i32, y: i32, z: i32) -> u8 {
        self.smoke.cell(x, y, z).level()
    }

    #[must_use]
    pub fn has_smoke(&self, x: i32, y: i32, z: i32) -> bool {
        self.get_smoke_level(x, y, z) > 0
    }

    pub fn set_smoke_level(&mut self, x: i32, y: i32, z: i32, level: i32) {
        self.smoke.set_level(&mut self.counts, x, y, z, level);
    }

    pub fn add_smoke(&mut self, x: i32, y: i32, z: i32, amount: i32) {
        let level = i32::from(self.smoke.cell(x, y, z).level());
        self.smoke.set_level(&mut self.counts, x, y, z, level + amount);
    }

    pub fn destabilize_smoke(&mut self, x: i32, y: i32, z: i32) {
        self.smoke.destabilize(x, y, z);
    }

    /// Public hook for the fire field and external burners.
    pub fn generate_smoke_from_fire(&mut self, x: i32, y: i32, z: i32, fire_level: u8) {
        let rate = self.config.smoke_generation_rate;
        generate_smoke_from_fire_internal(
            &mut self.smoke,
            &mut self.counts,
            &self.grid,
            x,
            y,
            z,
            fire_level,
            rate,
        );
    }

    /// Empty the whole smoke field and zero its share of the presence
    /// registry.
    pub fn clear_smoke(&mut self) {
        self.smoke.cells.clear();
        self.smoke.rise_accum = 0.0;
        self.smoke.dissipation_accum = 0.0;
        self.smoke.update_count = 0;
        self.counts.smoke_active_cells = 0;
    }

    /// Reset interval accumulators and destabilize everything; call after
    /// restoring the smoke grid from a save.
    pub fn reset_smoke_accumulators(&mut self) {
        self.smoke.rise_accum = 0.0;
        self.smoke.dissipation_accum = 0.0;
        for cell in self.smoke.cells.as_mut_slice() {
            cell.set_stable(false);
        }
    }

    /// Main smoke tick, bottom-to-top with alternating x/y direction.
    pub fn update_smoke(&mut self) {
        let SimulationWorld { grid, smoke, counts, rng, weather, clock, config, .. } = self;
        if !config.smoke_enabled {
            return;
        }
        if counts.smoke_active_cells == 0 {
            smoke.update_count = 0;
            return;
        }
        smoke.update_count = 0;
        smoke.tick = smoke.tick.wrapping_add(1);

        smoke.rise_accum += clock.game_delta;
        smoke.dissipation_accum += clock.game_delta;

        let mut rise_interval = clock.game_hours_to_seconds(config.smoke_rise_interval_hours);
        let mut dissipation_interval = clock
            .game_hours_to_seconds(config.smoke_dissipation_hours)
            / f32::from(MAX_LEVEL);

        // Humid air holds smoke down and keeps it around
        match weather.current {
            WeatherKind::HeavyRain | WeatherKind::Thunderstorm => {
                rise_interval *= 2.0;
                dissipation_interval *= 1.5;
            }
            WeatherKind::Rain => {
                rise_interval *= 1.5;
                dissipation_interval *= 1.5;
            }
            WeatherKind::Mist => {
                dissipation_interval *= 1.5;
            }
            _ => {}
        }

        let do_rise = smoke.rise_accum >= rise_interval;
        if do_rise {
            smoke.rise_accum -= rise_interval;
            smoke.rise_gen = smoke.rise_gen.wrapping_add(1);
            if smoke.rise_gen == 0 {
                smoke.has_risen.clear();
                smoke.rise_gen = 1;
            }
        }
        let do_dissipate = smoke.dissipation_accum >= dissipation_interval;
        if do_dissipate {
            smoke.dissipation_accum -= dissipation_interval;
        }

        let reverse_x = smoke.tick & 1 != 0;
        let reverse_y = smoke.tick & 2 != 0;

        'scan: for z in 0..grid.depth() {
            for yi in 0..grid.height() {
                let y = if reverse_y { grid.height() - 1 - yi } else { yi };
                for xi in 0..grid.width() {
                    let x = if reverse_x { grid.width() - 1 - xi } else { xi };
                    let cell = smoke.cells.get(x as usize, y as usize, z as usize);
                    if cell.is_stable() && cell.level() == 0 {
                        continue;
                    }
                    process_smoke_cell(grid, smoke, counts, rng, weather, x, y, z, do_rise, do_dissipate);
                    smoke.update_count += 1;
                    if smoke.update_count >= SMOKE_MAX_UPDATES_PER_TICK {
                        break 'scan;
                    }
                }
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn process_smoke_cell(
    grid: &VoxelGrid,
    smoke: &mut SmokeState,
    counts: &mut ActivityCounts,
    rng: &mut ChaCha8Rng,
    weather: &WeatherSystem,
    x: i32,
    y: i32,
    z: i32,
    do_rise: bool,
    do_dissipate: bool,
) {
    if smoke.cell(x, y, z).level() == 0 {
        let cell = smoke.cells.get_mut(x as usize, y as usize, z as usize);
        cell.set_stable(true);
        cell.set_pressure(false);
        return;
    }

    let mut moved = false;

    if do_rise && try_rise(grid, smoke, counts, x, y, z) {
        moved = true;
    }

    if smoke.cell(x, y, z).level() > 0 && try_spread(grid, smoke, counts, rng, weather, x, y, z) {
        moved = true;
    }

    {
        let cell = smoke.cell(x, y, z);
        if cell.level() >= MAX_LEVEL
            && cell.has_pressure()
            && try_fill_down(grid, smoke, counts, x, y, z)
        {
            moved = true;
        }
    }

    // Fade, unless the smoke only just arrived from below this interval
    let just_rose =
        smoke.has_risen.get(x as usize, y as usize, z as usize) == smoke.rise_gen;
    let cell = smoke.cell(x, y, z);
    if do_dissipate && cell.level() > 0 && !just_rose {
        let trapped = cell.has_pressure() || (z > 0 && !can_hold_smoke(grid, x, y, z + 1));
        if !trapped || rng.random_range(0..3) == 0 {
            smoke.set_level(counts, x, y, z, i32::from(cell.level()) - 1);
            if smoke.cell(x, y, z).level() == 0 {
                let slot = smoke.cells.get_mut(x as usize, y as usize, z as usize);
                slot.set_pressure(false);
                slot.set_pressure_source_z(0);
            }
            moved = true;
        }
    }

    let cell = smoke.cells.get_mut(x as usize, y as usize, z as usize);
    if cell.level() < MAX_LEVEL {
        cell.set_pressure(false);
    }
    if !moved && cell.level() == 0 {
        cell.set_stable(true);
    }
}

/// One unit up per rise interval, pressure when the ceiling of smoke is
/// already full.
fn try_rise(
    grid: &VoxelGrid,
    smoke: &mut SmokeState,
    counts: &mut ActivityCounts,
    x: i32,
    y: i32,
    z: i32,
) -> bool {
    if z >= grid.depth() - 1 {
        return false;
    }
    if !can_hold_smoke(grid, x, y, z + 1) {
        return false;
    }
    let src = smoke.cell(x, y, z);
    if src.level() == 0 {
        return false;
    }
    // Smoke that just arrived here waits a full interval before climbing on
    if smoke.has_risen.get(x as usize, y as usize, z as usize) == smoke.rise_gen {
        return false;
    }

    let dst = smoke.cell(x, y, z + 1);
    if dst.level() >= MAX_LEVEL {
        let slot = smoke.cells.get_mut(x as usize, y as usize, z as usize);
        slot.set_pressure(true);
        if slot.pressure_source_z() == 0 {
            slot.set_pressure_source_z(z);
        }
        return false;
    }

    smoke.set_level(counts, x, y, z, i32::from(src.level()) - 1);
    smoke.set_level(counts, x, y, z + 1, i32::from(dst.level()) + 1);
    smoke
        .has_risen
        .set(x as usize, y as usize, (z + 1) as usize, smoke.rise_gen);

    let slot = smoke.cells.get_mut(x as usize, y as usize, (z + 1) as usize);
    if slot.pressure_source_z() == 0 || slot.pressure_source_z() > z {
        slot.set_pressure_source_z(z);
    }
    if slot.level() >= MAX_LEVEL {
        slot.set_pressure(true);
    }
    true
}

/// Horizontal equalization, shuffled and wind-biased like water.
fn try_spread(
    grid: &VoxelGrid,
    smoke: &mut SmokeState,
    counts: &mut ActivityCounts,
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
        if !can_hold_smoke(grid, nx, ny, z) {
            continue;
        }
        let level = i32::from(smoke.cell(x, y, z).level());
        let neighbor = i32::from(smoke.cell(nx, ny, z).level());
        let diff = level - neighbor;
        if diff >= 2 {
            smoke.set_level(counts, x, y, z, level - 1);
            smoke.set_level(counts, nx, ny, z, neighbor + 1);
            moved = true;
            if level - 1 <= 1 {
                break;
            }
        } else if diff == 1 && level > 1 {
            smoke.set_level(counts, x, y, z, level - 1);
            smoke.set_level(counts, nx, ny, z, neighbor + 1);
            moved = true;
            break;
        }
    }
    moved
}

/// Trapped smoke pushes down and sideways through full cells to the nearest
/// cell with room, but never below the z it originally climbed from.
fn try_fill_down(
    grid: &VoxelGrid,
    smoke: &mut SmokeState,
    counts: &mut ActivityCounts,
    x: i32,
    y: i32,
    z: i32,
) -> bool {
    let cell = smoke.cell(x, y, z);
    let mut min_z = cell.pressure_source_z();
    if min_z >= z {
        min_z = 0;
    }

    smoke.visited_gen = smoke.visited_gen.wrapping_add(1);
    if smoke.visited_gen == 0 {
        smoke.visited.clear();
        smoke.visited_gen = 1;
    }
    let generation = smoke.visited_gen;

    // Down first, then the lateral directions
    const DIRS: [(i32, i32, i32); 5] =
        [(0, 0, -1), (0, 1, 0), (0, -1, 0), (1, 0, 0), (-1, 0, 0)];

    let mut queue: Vec<(i32, i32, i32)> = Vec::with_capacity(SMOKE_PRESSURE_SEARCH_LIMIT);
    let mut head = 0;
    smoke.visited.set(x as usize, y as usize, z as usize, generation);
    for (dx, dy, dz) in DIRS {
        let (nx, ny, nz) = (x + dx, y + dy, z + dz);
        if nz < min_z || !can_hold_smoke(grid, nx, ny, nz) {
            continue;
        }
        if smoke.visited.get(nx as usize, ny as usize, nz as usize) == generation {
            continue;
        }
        smoke.visited.set(nx as usize, ny as usize, nz as usize, generation);
        queue.push((nx, ny, nz));
        if queue.len() >= SMOKE_PRESSURE_SEARCH_LIMIT {
            break;
        }
    }

    while head < queue.len() {
        let (cx, cy, cz) = queue[head];
        head += 1;
        let current = smoke.cell(cx, cy, cz);

        if current.level() < MAX_LEVEL {
            let src_level = i32::from(smoke.cell(x, y, z).level());
            if src_level == 0 {
                return false;
            }
            smoke.set_level(counts, x, y, z, src_level - 1);
            smoke.set_level(counts, cx, cy, cz, i32::from(current.level()) + 1);
            let slot = smoke.cells.get_mut(x as usize, y as usize, z as usize);
            if slot.level() < MAX_LEVEL {
                slot.set_pressure(false);
            }
            return true;
        }

        for (dx, dy, dz) in DIRS {
            let (nx, ny, nz) = (cx + dx, cy + dy, cz + dz);
            if nz < min_z || !can_hold_smoke(grid, nx, ny, nz) {
                continue;
            }
            if smoke.visited.get(nx as usize, ny as usize, nz as usize) == generation {
                continue;
            }
            smoke.visited.set(nx as usize, ny as usize, nz as usize, generation);
            if queue.len() < SMOKE_PRESSURE_SEARCH_LIMIT {
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
        let mut world = SimulationWorld::new(6, 6, 5, 3);
        world.config.weather_enabled = false;
        // Very slow dissipation so movement tests see full totals
        world.config.smoke_dissipation_hours = 10_000.0;
        for y in 0..6 {
            for x in 0..6 {
                world.grid.set_kind(x, y, 0, CellKind::Rock);
            }
        }
        world
    }

    fn total_smoke(world: &SimulationWorld) -> i32 {
        let mut total = 0;
        for z in 0..world.grid.depth() {
            for y in 0..world.grid.height() {
                for x in 0..world.grid.width() {
                    total += i32::from(world.get_smoke_level(x, y, z));
                }
            }
        }
        total
    }

    #[test]
    fn setters_clamp_and_count() {
        let mut world = open_world();
        world.add_smoke(2, 2, 1, 12);
        assert_eq!(world.get_smoke_level(2, 2, 1), 7);
        assert_eq!(world.counts.smoke_active_cells, 1);
        world.set_smoke_level(2, 2, 1, 0);
        assert_eq!(world.counts.smoke_active_cells, 0);
    }

    #[test]
    fn rises_one_level_per_interval_no_cascade() {
        let mut world = open_world();
        world.add_smoke(3, 3, 1, 7);
        // Run exactly one rise interval worth of ticks
        let rise_seconds = world.clock.game_hours_to_seconds(world.config.smoke_rise_interval_hours);
        world.run_game_seconds(rise_seconds + 0.01);
        assert!(world.get_smoke_level(3, 3, 2) >= 1, "one unit climbed");
        assert_eq!(world.get_smoke_level(3, 3, 3), 0, "no cascade in one interval");
        // After several more intervals the plume is genuinely higher
        world.run_game_seconds(rise_seconds * 4.0);
        assert!(world.get_smoke_level(3, 3, 3) > 0);
    }

    #[test]
    fn spreads_laterally_and_conserves() {
        let mut world = open_world();
        world.add_smoke(3, 3, 1, 7);
        let before = total_smoke(&world);
        // Before the first rise interval, equalization has already pushed
        // smoke sideways
        for _ in 0..3 {
            world.tick();
        }
        let neighbors = [(2, 3), (4, 3), (3, 2), (3, 4)];
        assert!(
            neighbors.iter().any(|&(x, y)| world.get_smoke_level(x, y, 1) > 0),
            "smoke reached a lateral neighbor"
        );
        // With dissipation effectively off, movement never loses a unit
        world.run_game_seconds(1.0);
        assert_eq!(total_smoke(&world), before, "no dissipation configured");
    }

    #[test]
    fn smoke_generation_scales_with_wetness() {
        let mut world = open_world();
        world.grid.set_wetness(2, 2, 1, 2);
        world.generate_smoke_from_fire(2, 2, 1, 6);
        // 6/3 = 2 units, tripled by soaked ground, in the cell and above
        assert_eq!(world.get_smoke_level(2, 2, 1), 6);
        assert_eq!(world.get_smoke_level(2, 2, 2), 6);
    }

    #[test]
    fn sealed_full_cell_holds_its_smoke() {
        let mut world = open_world();
        // Box in (1,1,1): roof above, walls on all four sides, rock below
        world.grid.set_kind(1, 1, 2, CellKind::Wall);
        for (x, y) in [(0, 1), (2, 1), (1, 0), (1, 2)] {
            world.grid.set_kind(x, y, 1, CellKind::Wall);
        }
        world.set_smoke_level(1, 1, 1, 7);
        {
            let slot = world.smoke.cells.get_mut(1, 1, 1);
            slot.set_pressure(true);
            slot.set_pressure_source_z(1);
        }
        world.run_game_seconds(0.5);
        // Nowhere to rise, spread, or fill down; dissipation is configured
        // off, so the smoke just sits there under pressure
        assert_eq!(world.get_smoke_level(1, 1, 1), 7);
    }

    #[test]
    fn pressurized_plume_fills_down_a_shaft() {
        let mut world = open_world();
        // Roof the whole map at z=3
        for y in 0..6 {
            for x in 0..6 {
                world.grid.set_kind(x, y, 3, CellKind::Wall);
            }
        }
        // Wall off a 2-cell pocket at z=2: (1,1) full, (2,1) empty
        for (x, y) in [(0, 1), (1, 0), (1, 2), (2, 0), (2, 2), (3, 1)] {
            world.grid.set_kind(x, y, 2, CellKind::Wall);
            world.grid.set_kind(x, y, 1, CellKind::Wall);
        }
        world.grid.set_kind(1, 1, 1, CellKind::Wall);
        world.grid.set_kind(2, 1, 1, CellKind::Wall);
        world.set_smoke_level(1, 1, 2, 7);
        {
            let slot = world.smoke.cells.get_mut(1, 1, 2);
            slot.set_pressure(true);
            slot.set_pressure_source_z(1);
        }
        world.run_game_seconds(0.2);
        // The full pressurized cell leaks into the adjacent open cell
        assert!(world.get_smoke_level(2, 1, 2) > 0);
    }

    #[test]
    fn dissipates_over_time() {
        let mut world = open_world();
        world.config.smoke_dissipation_hours = 0.01;
        world.add_smoke(3, 3, 1, 3);
        world.run_game_seconds(5.0);
        assert_eq!(total_smoke(&world), 0, "smoke eventually fades");
        assert_eq!(world.counts.smoke_active_cells, 0);
    }
}

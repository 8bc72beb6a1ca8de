//! The simulation world and its master tick.
//!
//! `SimulationWorld` owns every field, the clock, the weather, the config
//! and the PRNG; nothing in the crate lives at process scope. The master
//! tick invokes fields in a fixed order, and each field mutates only its own
//! cell array during its step; cross-field effects (fire heat, fire smoke,
//! steam condensation) go through the target field's public setters.
//!
//! Per-field presence counters make a globally quiescent field cost O(1)
//! per tick. The counters are maintained by the fields' setters and can be
//! recomputed from scratch with [`SimulationWorld::rebuild_activity_counts`],
//! which must run after a save is restored.

pub mod event_log;
pub mod fire;
pub mod floordirt;
pub mod groundwear;
pub mod persistence;
pub mod smoke;
pub mod steam;
pub mod temperature;
pub mod water;

pub use event_log::EventLog;
pub use persistence::{PersistenceError, SaveState};

use crate::config::SimConfig;
use crate::core_types::{BiomePreset, CellKind};
use crate::grid::{Field3, MaterialOverlay, VoxelGrid};
use crate::time::{GameClock, TICK_DT};
use crate::weather::{Season, WeatherSystem};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::info;

/// Orthogonal neighbor offsets, the order every shuffle starts from.
pub(crate) const ORTHO_4: [(i32, i32); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

/// Per-field active-cell counters for O(1) early exit.
///
/// Invariant: a counter is positive iff its field has at least one cell with
/// a nonzero level, a source/drain, or (for temperature) a cleared stable
/// bit. Only the owning field's setters touch these.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActivityCounts {
    pub water_active_cells: u32,
    pub fire_active_cells: u32,
    pub smoke_active_cells: u32,
    pub steam_active_cells: u32,
    pub temp_source_count: u32,
    pub temp_unstable_cells: u32,
    pub wear_active_cells: u32,
    pub dirt_active_cells: u32,
    pub tree_active_cells: u32,
}

/// The whole environmental simulation: grid, overlays, fields, weather,
/// clock, tunables, event log and PRNG.
#[derive(Debug)]
pub struct SimulationWorld {
    pub grid: VoxelGrid,
    pub materials: MaterialOverlay,
    pub clock: GameClock,
    pub weather: WeatherSystem,
    pub config: SimConfig,
    pub events: EventLog,
    pub(crate) water: water::WaterState,
    pub(crate) fire: fire::FireState,
    pub(crate) smoke: smoke::SmokeState,
    pub(crate) steam: steam::SteamState,
    pub(crate) temperature: temperature::TemperatureState,
    pub(crate) wear: groundwear::WearState,
    pub(crate) floor_dirt: floordirt::FloorDirtState,
    /// Snow depth 0..7 per cell, maintained by the weather step.
    pub(crate) snow: Field3<u8>,
    pub(crate) counts: ActivityCounts,
    pub(crate) rng: ChaCha8Rng,
}

impl SimulationWorld {
    /// Create an empty world with default tunables.
    #[must_use]
    pub fn new(width: i32, height: i32, depth: i32, seed: u64) -> Self {
        Self::with_config(width, height, depth, SimConfig::default(), seed)
    }

    /// Create an empty world with a biome's climate constants.
    #[must_use]
    pub fn for_biome(width: i32, height: i32, depth: i32, preset: &BiomePreset, seed: u64) -> Self {
        Self::with_config(width, height, depth, SimConfig::for_biome(preset), seed)
    }

    #[must_use]
    pub fn with_config(width: i32, height: i32, depth: i32, config: SimConfig, seed: u64) -> Self {
        let grid = VoxelGrid::new(width, height, depth);
        let (w, h, d) = (grid.width() as usize, grid.height() as usize, grid.depth() as usize);
        info!(width = w, height = h, depth = d, seed, "creating simulation world");
        let mut world = Self {
            materials: MaterialOverlay::new(grid.width(), grid.height(), grid.depth()),
            clock: GameClock::default(),
            weather: WeatherSystem::default(),
            config,
            events: EventLog::new(),
            water: water::WaterState::new(w, h, d),
            fire: fire::FireState::new(w, h, d),
            smoke: smoke::SmokeState::new(w, h, d),
            steam: steam::SteamState::new(w, h, d),
            temperature: temperature::TemperatureState::new(w, h, d),
            wear: groundwear::WearState::new(w, h, d),
            floor_dirt: floordirt::FloorDirtState::new(w, h, d),
            snow: Field3::new(w, h, d),
            counts: ActivityCounts::default(),
            rng: ChaCha8Rng::seed_from_u64(seed),
            grid,
        };
        world.init_temperature_to_ambient();
        world
    }

    /// Stamp natural ground materials from the current terrain.
    pub fn sync_materials_to_terrain(&mut self, stone: crate::core_types::Material) {
        self.materials.sync_to_terrain(&self.grid, stone);
    }

    /// Reseed the world PRNG. Test hook for deterministic runs.
    pub fn reseed(&mut self, seed: u64) {
        self.rng = ChaCha8Rng::seed_from_u64(seed);
    }

    /// One master tick at the fixed timestep. Field order is load-bearing:
    /// freezing consults the temperatures written this tick, steam
    /// condensation sees the heat fire just applied.
    pub fn tick(&mut self) {
        if !self.clock.update(TICK_DT) {
            return;
        }
        self.update_weather();
        self.update_temperature();
        self.update_water_freezing();
        self.update_fire();
        self.update_smoke();
        self.update_steam();
        self.update_water();
        self.update_ground_wear();
    }

    /// Run master ticks until `game_time` has advanced by the given number
    /// of game-seconds. Test helper; a paused clock returns immediately.
    pub fn run_game_seconds(&mut self, seconds: f32) {
        if self.clock.game_speed <= 0.0 {
            return;
        }
        let target = self.clock.game_time + f64::from(seconds);
        while self.clock.game_time < target {
            self.tick();
        }
    }

    /// Current presence counters.
    #[must_use]
    pub fn activity(&self) -> &ActivityCounts {
        &self.counts
    }

    /// Cells processed by each field on its last tick (water, fire, smoke,
    /// steam, temperature). Profiling surface for debug overlays.
    #[must_use]
    pub fn update_counts(&self) -> (u32, u32, u32, u32, u32) {
        (
            self.water.update_count,
            self.fire.update_count,
            self.smoke.update_count,
            self.steam.update_count,
            self.temperature.update_count,
        )
    }

    /// Snow depth at a cell, 0 when out of bounds.
    #[must_use]
    pub fn snow_level(&self, x: i32, y: i32, z: i32) -> u8 {
        if self.grid.in_bounds(x, y, z) {
            self.snow.get(x as usize, y as usize, z as usize)
        } else {
            0
        }
    }

    /// Walkability including the fluid layers: deep liquid water blocks
    /// movement, frozen water is solid footing.
    #[must_use]
    pub fn is_cell_walkable(&self, x: i32, y: i32, z: i32) -> bool {
        if !self.grid.in_bounds(x, y, z) {
            return false;
        }
        let cell = self.water_cell(x, y, z);
        if cell.level() >= water::WATER_BLOCKS_MOVEMENT && !cell.is_frozen() {
            return false;
        }
        if self.grid.is_walkable_at(x, y, z) {
            return true;
        }
        // Frozen water below is as good as ground
        let kind = self.grid.kind(x, y, z);
        if crate::core_types::cell_is_solid(kind) || crate::core_types::cell_blocks_movement(kind) {
            return false;
        }
        z > 0 && self.water_cell(x, y, z - 1).is_frozen()
    }

    /// Downwind bias helper exposed to movers and debug overlays.
    #[must_use]
    pub fn wind_dot(&self, dx: i32, dy: i32) -> f32 {
        self.weather.wind_dot(dx, dy)
    }

    /// Append a timestamped line to the event log.
    pub fn log_event(&mut self, message: &str) {
        let per = self.config.days_per_season.max(1);
        let season = Season::for_day(self.clock.day_number, per);
        let day_in_season = (self.clock.day_number.saturating_sub(1)) % per + 1;
        let hour = self.clock.time_of_day as u32;
        let minute = ((self.clock.time_of_day - hour as f32) * 60.0) as u32;
        let abbr = &season.name()[..3];
        self.events
            .push(format!("[{abbr} D{day_in_season} {hour:02}:{minute:02}] {message}"));
    }

    /// Recompute every presence counter from the grids. The authoritative
    /// recovery path: must run after a save is loaded, and self-heals any
    /// counter drift at runtime.
    pub fn rebuild_activity_counts(&mut self) {
        let mut counts = ActivityCounts::default();
        let depth = self.grid.depth();
        for z in 0..depth {
            let ambient = self.ambient_temperature(z);
            for y in 0..self.grid.height() {
                for x in 0..self.grid.width() {
                    let (xi, yi, zi) = (x as usize, y as usize, z as usize);
                    if self.water.cells.get(xi, yi, zi).is_active() {
                        counts.water_active_cells += 1;
                    }
                    if self.steam.cells.get(xi, yi, zi).level() > 0 {
                        counts.steam_active_cells += 1;
                    }
                    if self.fire.cells.get(xi, yi, zi).is_active() {
                        counts.fire_active_cells += 1;
                    }
                    if self.smoke.cells.get(xi, yi, zi).level() > 0 {
                        counts.smoke_active_cells += 1;
                    }
                    let temp = self.temperature.cells.get_mut(xi, yi, zi);
                    if temp.is_source() {
                        counts.temp_source_count += 1;
                    }
                    if temp.current() != ambient {
                        // A cell off ambient must keep processing
                        temp.set_stable(false);
                    }
                    if !temp.is_stable() {
                        counts.temp_unstable_cells += 1;
                    }
                    if self.wear.wear.get(xi, yi, zi) > 0 {
                        counts.wear_active_cells += 1;
                    }
                    if self.floor_dirt.dirt.get(xi, yi, zi) > 0 {
                        counts.dirt_active_cells += 1;
                    }
                    if self.grid.kind(x, y, z) == CellKind::Sapling {
                        counts.tree_active_cells += 1;
                    }
                }
            }
        }
        self.counts = counts;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_world_is_quiescent() {
        let mut world = SimulationWorld::new(8, 8, 4, 42);
        world.config.weather_enabled = false;
        for _ in 0..10 {
            world.tick();
        }
        assert_eq!(world.counts, ActivityCounts::default());
        assert!(world.clock.game_time > 0.0);
    }

    #[test]
    fn paused_world_does_not_advance() {
        let mut world = SimulationWorld::new(4, 4, 2, 1);
        world.clock.game_speed = 0.0;
        world.tick();
        assert_eq!(world.clock.game_time, 0.0);
        world.run_game_seconds(10.0); // must not hang
    }

    #[test]
    fn run_game_seconds_advances_game_time() {
        let mut world = SimulationWorld::new(4, 4, 2, 1);
        world.run_game_seconds(2.0);
        assert!(world.clock.game_time >= 2.0);
        assert!(world.clock.game_time < 2.1);
    }

    #[test]
    fn event_log_lines_carry_clock_prefix() {
        let mut world = SimulationWorld::new(4, 4, 2, 1);
        world.log_event("hello");
        let line = world.events.get(0).unwrap();
        assert!(line.starts_with("[Spr D1 06:00]"), "got {line}");
        assert!(line.ends_with("hello"));
    }

    #[test]
    fn rebuild_matches_incremental_counts() {
        let mut world = SimulationWorld::new(6, 6, 3, 7);
        world.grid.set_kind(1, 1, 0, CellKind::Dirt);
        world.set_water_level(2, 2, 1, 5);
        world.set_water_source(3, 3, 1, true);
        world.add_smoke(1, 1, 1, 3);
        world.set_heat_source(4, 4, 1, true);
        let before = world.counts;
        world.rebuild_activity_counts();
        assert_eq!(world.counts.water_active_cells, before.water_active_cells);
        assert_eq!(world.counts.smoke_active_cells, before.smoke_active_cells);
        assert_eq!(world.counts.temp_source_count, before.temp_source_count);
        assert_eq!(world.counts.water_active_cells, 2);
    }
}

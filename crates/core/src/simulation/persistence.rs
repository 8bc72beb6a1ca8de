//! Save and load for the whole simulation world.
//!
//! The save captures dimensions, tunables, the clock, weather, every field
//! array through its packed representation, the interval accumulators, the
//! event log, and the PRNG, so a restored world replays deterministically.
//! Presence counters are NOT stored: [`SimulationWorld::rebuild_activity_counts`]
//! runs on restore, and every stable bit is cleared so the first tick
//! reconsiders the whole map.

use crate::config::SimConfig;
use crate::core_types::{CellKind, FireCell, Material, SmokeCell, SteamCell, TempCell, WaterCell};
use crate::grid::Field3;
use crate::simulation::{EventLog, SimulationWorld};
use crate::time::GameClock;
use crate::weather::WeatherSystem;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

const SAVE_VERSION: u32 = 1;

/// Everything needed to reconstruct a [`SimulationWorld`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveState {
    version: u32,
    width: i32,
    height: i32,
    depth: i32,
    config: SimConfig,
    clock: GameClock,
    weather: WeatherSystem,

    kinds: Field3<CellKind>,
    flags: Field3<u8>,
    wall_material: Field3<Material>,
    floor_material: Field3<Material>,
    wall_meta: Field3<u8>,
    floor_meta: Field3<u8>,

    water: Field3<WaterCell>,
    fire: Field3<FireCell>,
    smoke: Field3<SmokeCell>,
    steam: Field3<SteamCell>,
    temperature: Field3<TempCell>,
    wear: Field3<i32>,
    floor_dirt: Field3<u8>,
    snow: Field3<u8>,

    water_evap_accum: f32,
    wetness_sync_accum: f32,
    fire_spread_accum: f32,
    fire_fuel_accum: f32,
    smoke_rise_accum: f32,
    smoke_dissipation_accum: f32,
    steam_rise_accum: f32,
    wear_recovery_accum: f32,

    events: EventLog,
    rng: ChaCha8Rng,
}

/// Why a save could not be written or read back.
#[derive(Debug, Clone)]
pub enum PersistenceError {
    /// Failed to read the file
    LoadFailed(String),
    /// Failed to decode the file contents
    ParseFailed(String),
    /// Failed to encode the state
    SerializeFailed(String),
    /// Failed to write the file
    SaveFailed(String),
    /// The save is from a different format version
    VersionMismatch { expected: u32, found: u32 },
}

impl std::fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PersistenceError::LoadFailed(msg) => write!(f, "Failed to load: {msg}"),
            PersistenceError::ParseFailed(msg) => write!(f, "Failed to parse: {msg}"),
            PersistenceError::SerializeFailed(msg) => write!(f, "Failed to serialize: {msg}"),
            PersistenceError::SaveFailed(msg) => write!(f, "Failed to save: {msg}"),
            PersistenceError::VersionMismatch { expected, found } => {
                write!(f, "Save version {found} does not match expected {expected}")
            }
        }
    }
}

impl std::error::Error for PersistenceError {}

impl SimulationWorld {
    /// Snapshot the world into a serializable state.
    #[must_use]
    pub fn to_save_state(&self) -> SaveState {
        let (wall, floor, wall_meta, floor_meta) = self.materials.parts();
        SaveState {
            version: SAVE_VERSION,
            width: self.grid.width(),
            height: self.grid.height(),
            depth: self.grid.depth(),
            config: self.config.clone(),
            clock: self.clock.clone(),
            weather: self.weather.clone(),
            kinds: self.grid.kinds().clone(),
            flags: self.grid.flags().clone(),
            wall_material: wall.clone(),
            floor_material: floor.clone(),
            wall_meta: wall_meta.clone(),
            floor_meta: floor_meta.clone(),
            water: self.water.cells.clone(),
            fire: self.fire.cells.clone(),
            smoke: self.smoke.cells.clone(),
            steam: self.steam.cells.clone(),
            temperature: self.temperature.cells.clone(),
            wear: self.wear.wear.clone(),
            floor_dirt: self.floor_dirt.dirt.clone(),
            snow: self.snow.clone(),
            water_evap_accum: self.water.evap_accum,
            wetness_sync_accum: self.water.wetness_accum,
            fire_spread_accum: self.fire.spread_accum,
            fire_fuel_accum: self.fire.fuel_accum,
            smoke_rise_accum: self.smoke.rise_accum,
            smoke_dissipation_accum: self.smoke.dissipation_accum,
            steam_rise_accum: self.steam.rise_accum,
            wear_recovery_accum: self.wear.recovery_accum,
            events: self.events.clone(),
            rng: self.rng.clone(),
        }
    }

    /// Rebuild a world from a snapshot. Counters are recomputed and every
    /// stable bit cleared, so the first tick re-examines the whole map.
    pub fn from_save_state(state: SaveState) -> Result<Self, PersistenceError> {
        if state.version != SAVE_VERSION {
            return Err(PersistenceError::VersionMismatch {
                expected: SAVE_VERSION,
                found: state.version,
            });
        }

        let mut world =
            SimulationWorld::with_config(state.width, state.height, state.depth, state.config, 0);
        world.clock = state.clock;
        world.weather = state.weather;
        world.grid.restore(state.kinds, state.flags);
        world.materials.restore(
            state.wall_material,
            state.floor_material,
            state.wall_meta,
            state.floor_meta,
        );
        world.water.cells = state.water;
        world.fire.cells = state.fire;
        world.smoke.cells = state.smoke;
        world.steam.cells = state.steam;
        world.temperature.cells = state.temperature;
        world.wear.wear = state.wear;
        world.floor_dirt.dirt = state.floor_dirt;
        world.snow = state.snow;
        world.water.evap_accum = state.water_evap_accum;
        world.water.wetness_accum = state.wetness_sync_accum;
        world.fire.spread_accum = state.fire_spread_accum;
        world.fire.fuel_accum = state.fire_fuel_accum;
        world.smoke.rise_accum = state.smoke_rise_accum;
        world.smoke.dissipation_accum = state.smoke_dissipation_accum;
        world.steam.rise_accum = state.steam_rise_accum;
        world.wear.recovery_accum = state.wear_recovery_accum;
        world.events = state.events;
        world.rng = state.rng;

        // Nothing is trusted as settled after a restore
        for cell in world.water.cells.as_mut_slice() {
            cell.set_stable(false);
        }
        for cell in world.fire.cells.as_mut_slice() {
            cell.set_stable(false);
        }
        for cell in world.smoke.cells.as_mut_slice() {
            cell.set_stable(false);
        }
        for cell in world.steam.cells.as_mut_slice() {
            cell.set_stable(false);
        }
        world.reset_mover_dirt_tracking();
        world.rebuild_activity_counts();
        info!(
            width = state.width,
            height = state.height,
            depth = state.depth,
            "restored world from save"
        );
        Ok(world)
    }

    /// Encode the world with bincode and write it to disk.
    ///
    /// # Errors
    /// Returns an error if encoding or the write fails.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), PersistenceError> {
        let bytes = bincode::serialize(&self.to_save_state())
            .map_err(|e| PersistenceError::SerializeFailed(e.to_string()))?;
        fs::write(path, bytes).map_err(|e| PersistenceError::SaveFailed(e.to_string()))?;
        Ok(())
    }

    /// Read a world back from disk.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or decoded.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, PersistenceError> {
        let bytes = fs::read(path).map_err(|e| PersistenceError::LoadFailed(e.to_string()))?;
        let state: SaveState = bincode::deserialize(&bytes)
            .map_err(|e| PersistenceError::ParseFailed(e.to_string()))?;
        Self::from_save_state(state)
    }
}

//! All simulation tunables in one record.
//!
//! The config is owned by the world, persisted with it, and never read from
//! globals, so a saved world replays with the numbers it was tuned with.
//! Intervals ending in `_hours` are game-hours (converted at point of use);
//! plain intervals are game-seconds.

use crate::core_types::BiomePreset;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    // Master toggles, mostly for tests and debugging.
    pub water_enabled: bool,
    pub fire_enabled: bool,
    pub smoke_enabled: bool,
    pub steam_enabled: bool,
    pub temperature_enabled: bool,
    pub ground_wear_enabled: bool,
    pub floor_dirt_enabled: bool,
    pub weather_enabled: bool,

    // Water
    /// Game-seconds between evaporation attempts for level-1 water.
    pub water_evap_interval: f32,
    pub water_evaporation_enabled: bool,
    /// Mover speed factor in level 1-2 water.
    pub water_speed_shallow: f32,
    /// Mover speed factor in level 3-4 water.
    pub water_speed_medium: f32,
    /// Mover speed factor in level 5-7 water.
    pub water_speed_deep: f32,
    /// Game-hours between wetness syncs from standing water to soil.
    pub wetness_sync_interval_hours: f32,

    // Fire
    /// Game-seconds between spread attempts.
    pub fire_spread_interval: f32,
    /// Game-seconds between fuel consumption steps.
    pub fire_fuel_interval: f32,
    /// Spread chance multiplier near water, percent.
    pub fire_water_reduction: i32,
    /// Base spread chance, percent.
    pub fire_spread_base: i32,
    /// Extra spread chance per fire level, percent.
    pub fire_spread_per_level: i32,

    // Smoke
    /// Game-hours between rise attempts.
    pub smoke_rise_interval_hours: f32,
    /// Game-hours for one smoke level to dissipate, per level.
    pub smoke_dissipation_hours: f32,
    /// Fire level divided by this = smoke generated.
    pub smoke_generation_rate: u8,

    // Steam
    /// Game-seconds between rise attempts.
    pub steam_rise_interval: f32,
    /// Celsius below which steam condenses back to water.
    pub steam_condensation_temp: i32,
    /// Celsius at which water boils into steam.
    pub steam_generation_temp: i32,
    /// 1-in-N chance per tick that a cold steam cell condenses.
    pub steam_condensation_chance: u32,
    /// Units of steam that rise per attempt.
    pub steam_rise_flow: u8,

    // Temperature
    pub ambient_depth_decay: i32,
    /// z-level treated as the surface for depth decay.
    pub surface_z: i32,
    /// How fast heat moves, 1-100.
    pub heat_transfer_speed: i32,
    /// How fast temperatures return to ambient, 1-100.
    pub temp_decay_rate: i32,
    /// Wood transfer rate, percent.
    pub insulation_tier1_rate: i32,
    /// Stone transfer rate, percent.
    pub insulation_tier2_rate: i32,
    /// Celsius a heat source pins to.
    pub heat_source_temp: i32,
    /// Celsius a cold source pins to.
    pub cold_source_temp: i32,

    // Ground wear
    pub wear_tall_to_normal: i32,
    pub wear_normal_to_trampled: i32,
    pub wear_grass_to_dirt: i32,
    pub wear_trample_amount: i32,
    pub wear_decay_rate: i32,
    /// Game-hours between wear decay passes.
    pub wear_recovery_interval_hours: f32,
    pub wear_max: i32,
    pub sapling_regrowth_enabled: bool,
    /// Chance per 10000 per interval per eligible tile.
    pub sapling_regrowth_chance: u32,
    /// Minimum tiles from an existing tree or sapling.
    pub sapling_min_tree_distance: i32,
    /// Extra drying chance factor for wind-exposed cells.
    pub wind_drying_multiplier: f32,

    // Floor dirt
    /// Dirt added per tracked soil-to-floor transition.
    pub dirt_track_amount: u8,
    /// Percent of the track amount that sticks to stone floors.
    pub dirt_stone_multiplier: u8,

    // Weather and seasons
    pub days_per_season: u32,
    /// Celsius baseline at the surface.
    pub base_surface_temp: i32,
    /// Celsius swing over the year. Zero by default; biome presets and
    /// season tests opt in.
    pub seasonal_amplitude: i32,
    /// Celsius swing over a day.
    pub diurnal_amplitude: i32,
    /// Lightning strikes per game-second at full thunderstorm intensity.
    pub lightning_rate: f32,
    /// Game-seconds between rain water placements.
    pub rain_water_interval: f32,
    /// Game-seconds between snow accumulation/melt passes.
    pub snow_interval: f32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            water_enabled: true,
            fire_enabled: true,
            smoke_enabled: true,
            steam_enabled: true,
            temperature_enabled: true,
            ground_wear_enabled: true,
            floor_dirt_enabled: true,
            weather_enabled: true,

            water_evap_interval: 10.0,
            water_evaporation_enabled: true,
            water_speed_shallow: 0.85,
            water_speed_medium: 0.6,
            water_speed_deep: 0.35,
            wetness_sync_interval_hours: 1.0,

            fire_spread_interval: 0.2,
            fire_fuel_interval: 0.1,
            fire_water_reduction: 25,
            fire_spread_base: 10,
            fire_spread_per_level: 10,

            smoke_rise_interval_hours: 0.04,
            smoke_dissipation_hours: 2.0,
            smoke_generation_rate: 3,

            steam_rise_interval: 0.5,
            steam_condensation_temp: 60,
            steam_generation_temp: 100,
            steam_condensation_chance: 3,
            steam_rise_flow: 1,

            ambient_depth_decay: 0,
            surface_z: 1,
            heat_transfer_speed: 50,
            temp_decay_rate: 10,
            insulation_tier1_rate: 20,
            insulation_tier2_rate: 5,
            heat_source_temp: 100,
            cold_source_temp: -20,

            wear_tall_to_normal: 200,
            wear_normal_to_trampled: 600,
            wear_grass_to_dirt: 1000,
            wear_trample_amount: 1,
            wear_decay_rate: 10,
            wear_recovery_interval_hours: 2.0,
            wear_max: 3000,
            sapling_regrowth_enabled: false,
            sapling_regrowth_chance: 5,
            sapling_min_tree_distance: 4,
            wind_drying_multiplier: 2.0,

            dirt_track_amount: 2,
            dirt_stone_multiplier: 50,

            days_per_season: 7,
            base_surface_temp: 20,
            seasonal_amplitude: 0,
            diurnal_amplitude: 0,
            lightning_rate: 0.2,
            rain_water_interval: 2.0,
            snow_interval: 2.0,
        }
    }
}

impl SimConfig {
    /// Default config with the climate constants of a biome preset.
    #[must_use]
    pub fn for_biome(preset: &BiomePreset) -> Self {
        Self {
            base_surface_temp: preset.base_surface_temp,
            seasonal_amplitude: preset.seasonal_amplitude,
            diurnal_amplitude: preset.diurnal_amplitude,
            ..Self::default()
        }
    }
}

//! Core value types shared by every field: cell kinds, materials, packed
//! per-field records, and the biome preset table.

pub mod biome;
pub mod cell;
pub mod material;
pub mod packed;

pub use biome::{BiomePreset, HeightVariation, BIOME_PRESETS};
pub use cell::{
    cell_allows_fluids, cell_blocks_fluids, cell_blocks_movement, cell_burns_into, cell_def,
    cell_fuel, cell_is_solid, CellDef, CellKind, Surface, CELL_FLAG_BURNED, CELL_FLAG_EXPLORED,
    CELL_FLAG_HAS_FLOOR, WETNESS_MAX,
};
pub use material::Material;
pub use packed::{FireCell, SmokeCell, SteamCell, TempCell, WaterCell, MAX_LEVEL};

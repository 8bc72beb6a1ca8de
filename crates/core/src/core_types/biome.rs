//! Biome presets chosen at world generation.
//!
//! A preset bundles the climate constants and terrain weights a generated
//! world starts from. Presets never mutate at runtime; the world copies the
//! climate numbers into its config at creation.

use crate::core_types::Material;

/// Terrain relief classes, flattest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeightVariation {
    Flat,
    Rolling,
    Hilly,
    Mountainous,
}

/// Constants for one biome.
#[derive(Debug, Clone)]
pub struct BiomePreset {
    pub name: &'static str,
    pub description: &'static str,

    // Climate (°C)
    pub base_surface_temp: i32,
    pub seasonal_amplitude: i32,
    pub diurnal_amplitude: i32,

    pub height_variation: HeightVariation,

    // Soil weights, normalized at generation time
    pub soil_dirt: f32,
    pub soil_clay: f32,
    pub soil_sand: f32,
    pub soil_gravel: f32,
    pub soil_peat: f32,

    /// Underground stone type.
    pub stone: Material,

    // Tree species weights + overall density multiplier
    pub tree_oak: f32,
    pub tree_pine: f32,
    pub tree_birch: f32,
    pub tree_willow: f32,
    pub tree_density: f32,

    /// Fraction of eligible ground cells that start with grass.
    pub grass_density: f32,

    pub river_count: u32,
    pub lake_count: u32,

    pub bush_density: f32,
    pub wild_crop_density: f32,
    pub boulder_density: f32,
}

pub const BIOME_PRESETS: [BiomePreset; 6] = [
    BiomePreset {
        name: "Temperate Grassland",
        description: "Gentle rolling hills, mixed forests, mild climate.",
        base_surface_temp: 15,
        seasonal_amplitude: 25,
        diurnal_amplitude: 5,
        height_variation: HeightVariation::Rolling,
        soil_dirt: 0.50,
        soil_clay: 0.20,
        soil_sand: 0.10,
        soil_gravel: 0.10,
        soil_peat: 0.10,
        stone: Material::Granite,
        tree_oak: 0.35,
        tree_pine: 0.20,
        tree_birch: 0.30,
        tree_willow: 0.15,
        tree_density: 1.0,
        grass_density: 1.0,
        river_count: 2,
        lake_count: 2,
        bush_density: 1.0,
        wild_crop_density: 1.0,
        boulder_density: 1.0,
    },
    BiomePreset {
        name: "Arid Scrubland",
        description: "Hot, dry, sandy terrain with sparse vegetation.",
        base_surface_temp: 28,
        seasonal_amplitude: 30,
        diurnal_amplitude: 12,
        height_variation: HeightVariation::Rolling,
        soil_dirt: 0.15,
        soil_clay: 0.10,
        soil_sand: 0.45,
        soil_gravel: 0.25,
        soil_peat: 0.05,
        stone: Material::Sandstone,
        tree_oak: 0.05,
        tree_pine: 0.15,
        tree_birch: 0.60,
        tree_willow: 0.20,
        tree_density: 0.25,
        grass_density: 0.3,
        river_count: 1,
        lake_count: 0,
        bush_density: 0.5,
        wild_crop_density: 0.3,
        boulder_density: 1.0,
    },
    BiomePreset {
        name: "Boreal / Taiga",
        description: "Cold pine forests on peaty soil. Long winters.",
        base_surface_temp: 2,
        seasonal_amplitude: 30,
        diurnal_amplitude: 4,
        height_variation: HeightVariation::Rolling,
        soil_dirt: 0.25,
        soil_clay: 0.10,
        soil_sand: 0.10,
        soil_gravel: 0.25,
        soil_peat: 0.30,
        stone: Material::Slate,
        tree_oak: 0.05,
        tree_pine: 0.60,
        tree_birch: 0.25,
        tree_willow: 0.10,
        tree_density: 1.4,
        grass_density: 0.6,
        river_count: 2,
        lake_count: 3,
        bush_density: 0.8,
        wild_crop_density: 0.5,
        boulder_density: 1.0,
    },
    BiomePreset {
        name: "Wetland / Marsh",
        description: "Flat, waterlogged lowlands. Willows and reeds.",
        base_surface_temp: 12,
        seasonal_amplitude: 20,
        diurnal_amplitude: 4,
        height_variation: HeightVariation::Flat,
        soil_dirt: 0.25,
        soil_clay: 0.25,
        soil_sand: 0.05,
        soil_gravel: 0.10,
        soil_peat: 0.35,
        stone: Material::Slate,
        tree_oak: 0.10,
        tree_pine: 0.05,
        tree_birch: 0.10,
        tree_willow: 0.75,
        tree_density: 0.8,
        grass_density: 0.8,
        river_count: 4,
        lake_count: 4,
        bush_density: 1.2,
        wild_crop_density: 0.8,
        boulder_density: 0.5,
    },
    BiomePreset {
        name: "Highland / Rocky",
        description: "Mountainous, thin soil, sparse pine, many boulders.",
        base_surface_temp: 8,
        seasonal_amplitude: 25,
        diurnal_amplitude: 8,
        height_variation: HeightVariation::Mountainous,
        soil_dirt: 0.20,
        soil_clay: 0.10,
        soil_sand: 0.15,
        soil_gravel: 0.40,
        soil_peat: 0.15,
        stone: Material::Granite,
        tree_oak: 0.10,
        tree_pine: 0.55,
        tree_birch: 0.25,
        tree_willow: 0.10,
        tree_density: 0.5,
        grass_density: 0.4,
        river_count: 1,
        lake_count: 1,
        bush_density: 0.4,
        wild_crop_density: 0.3,
        boulder_density: 3.0,
    },
    BiomePreset {
        name: "Riverlands",
        description: "Fertile river valley. Abundant forests and crops.",
        base_surface_temp: 16,
        seasonal_amplitude: 22,
        diurnal_amplitude: 5,
        height_variation: HeightVariation::Flat,
        soil_dirt: 0.40,
        soil_clay: 0.30,
        soil_sand: 0.10,
        soil_gravel: 0.10,
        soil_peat: 0.10,
        stone: Material::Granite,
        tree_oak: 0.35,
        tree_pine: 0.10,
        tree_birch: 0.20,
        tree_willow: 0.35,
        tree_density: 1.2,
        grass_density: 1.0,
        river_count: 5,
        lake_count: 3,
        bush_density: 1.5,
        wild_crop_density: 2.0,
        boulder_density: 0.3,
    },
];

impl BiomePreset {
    /// Tree species for a sapling regrowing on the given soil.
    #[must_use]
    pub fn tree_for_soil(soil: Material) -> Material {
        match soil {
            Material::Peat => Material::Willow,
            Material::Sand => Material::Birch,
            Material::Gravel => Material::Pine,
            _ => Material::Oak,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn soil_weights_roughly_normalized() {
        for preset in &BIOME_PRESETS {
            let sum = preset.soil_dirt + preset.soil_clay + preset.soil_sand + preset.soil_gravel + preset.soil_peat;
            assert!((sum - 1.0).abs() < 1e-4, "{}: soil weights sum to {sum}", preset.name);
        }
    }

    #[test]
    fn tree_species_follow_soil() {
        assert_eq!(BiomePreset::tree_for_soil(Material::Peat), Material::Willow);
        assert_eq!(BiomePreset::tree_for_soil(Material::Dirt), Material::Oak);
        assert_eq!(BiomePreset::tree_for_soil(Material::Gravel), Material::Pine);
    }
}

//! Material identities for walls and floors.
//!
//! A material says what something is made of, independent of the cell kind:
//! a `Wall` cell may be granite, brick or oak, and the fire and temperature
//! fields care about the difference.

use serde::{Deserialize, Serialize};

/// Material flag: can catch fire.
const MF_FLAMMABLE: u8 = 1 << 0;
/// Material flag: loose natural soil (tracks dirt onto floors, turns to mud).
const MF_SOIL: u8 = 1 << 1;
/// Material flag: quarried or natural stone.
const MF_STONE: u8 = 1 << 2;

/// What a wall or floor is made of. `None` means nothing is built here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum Material {
    #[default]
    None = 0,
    Oak,
    Pine,
    Birch,
    Willow,
    Granite,
    Sandstone,
    Slate,
    Dirt,
    Clay,
    Sand,
    Gravel,
    Peat,
    Brick,
    Iron,
    Glass,
}

impl Material {
    pub const COUNT: usize = 16;

    /// Decode from the save-file byte. Unknown values fall back to `None`.
    #[must_use]
    pub fn from_u8(v: u8) -> Self {
        match v {
            1 => Material::Oak,
            2 => Material::Pine,
            3 => Material::Birch,
            4 => Material::Willow,
            5 => Material::Granite,
            6 => Material::Sandstone,
            7 => Material::Slate,
            8 => Material::Dirt,
            9 => Material::Clay,
            10 => Material::Sand,
            11 => Material::Gravel,
            12 => Material::Peat,
            13 => Material::Brick,
            14 => Material::Iron,
            15 => Material::Glass,
            _ => Material::None,
        }
    }
}

struct MaterialDef {
    name: &'static str,
    flags: u8,
    fuel: u8,
}

const MATERIAL_DEFS: [MaterialDef; Material::COUNT] = [
    MaterialDef { name: "none", flags: 0, fuel: 0 },
    MaterialDef { name: "oak", flags: MF_FLAMMABLE, fuel: 128 },
    MaterialDef { name: "pine", flags: MF_FLAMMABLE, fuel: 96 },
    MaterialDef { name: "birch", flags: MF_FLAMMABLE, fuel: 112 },
    MaterialDef { name: "willow", flags: MF_FLAMMABLE, fuel: 80 },
    MaterialDef { name: "granite", flags: MF_STONE, fuel: 0 },
    MaterialDef { name: "sandstone", flags: MF_STONE, fuel: 0 },
    MaterialDef { name: "slate", flags: MF_STONE, fuel: 0 },
    MaterialDef { name: "dirt", flags: MF_SOIL, fuel: 0 },
    MaterialDef { name: "clay", flags: MF_SOIL, fuel: 0 },
    MaterialDef { name: "sand", flags: MF_SOIL, fuel: 0 },
    MaterialDef { name: "gravel", flags: MF_SOIL, fuel: 0 },
    MaterialDef { name: "peat", flags: MF_SOIL | MF_FLAMMABLE, fuel: 6 },
    MaterialDef { name: "brick", flags: 0, fuel: 0 },
    MaterialDef { name: "iron", flags: 0, fuel: 0 },
    MaterialDef { name: "glass", flags: 0, fuel: 0 },
];

impl Material {
    #[inline]
    #[must_use]
    pub fn name(self) -> &'static str {
        MATERIAL_DEFS[self as usize].name
    }

    /// Fuel value when this material forms a constructed wall or floor.
    #[inline]
    #[must_use]
    pub fn fuel(self) -> u8 {
        MATERIAL_DEFS[self as usize].fuel
    }

    #[inline]
    #[must_use]
    pub fn is_flammable(self) -> bool {
        MATERIAL_DEFS[self as usize].flags & MF_FLAMMABLE != 0
    }

    /// Loose natural ground: dirt, clay, sand, gravel, peat.
    #[inline]
    #[must_use]
    pub fn is_soil(self) -> bool {
        MATERIAL_DEFS[self as usize].flags & MF_SOIL != 0
    }

    #[inline]
    #[must_use]
    pub fn is_stone(self) -> bool {
        MATERIAL_DEFS[self as usize].flags & MF_STONE != 0
    }

    /// Insulation tier when this material forms the wall at a cell:
    /// wood insulates a little, stone and packed earth a lot.
    #[inline]
    #[must_use]
    pub fn insulation_tier(self) -> u8 {
        match self {
            Material::None => 0,
            Material::Oak | Material::Pine | Material::Birch | Material::Willow => 1,
            _ => 2,
        }
    }

    /// The soil material a natural ground cell is made of.
    #[must_use]
    pub fn for_ground_kind(kind: crate::core_types::CellKind) -> Material {
        use crate::core_types::CellKind;
        match kind {
            CellKind::Dirt => Material::Dirt,
            CellKind::Clay => Material::Clay,
            CellKind::Sand => Material::Sand,
            CellKind::Gravel => Material::Gravel,
            CellKind::Peat => Material::Peat,
            CellKind::Rock => Material::Granite,
            _ => Material::None,
        }
    }
}

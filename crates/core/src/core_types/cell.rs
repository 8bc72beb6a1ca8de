//! Static cell-kind definitions and the per-cell flag byte layout.
//!
//! Every voxel stores a [`CellKind`] plus one flag byte. The flag byte packs
//! three boolean flags with two small enums (surface cover and wetness), so
//! all reads and writes must go through the accessors on `VoxelGrid`.

use serde::{Deserialize, Serialize};

/// What a voxel is. The discriminant doubles as the save-file encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum CellKind {
    #[default]
    Air = 0,
    Dirt,
    Clay,
    Sand,
    Gravel,
    Peat,
    Rock,
    Wall,
    Sapling,
    TreeTrunk,
    TreeLeaves,
    Track,
    Ladder,
    Ramp,
    Door,
    Grate,
}

impl CellKind {
    pub const COUNT: usize = 16;

    /// Decode from the save-file byte. Unknown values fall back to air.
    #[must_use]
    pub fn from_u8(v: u8) -> Self {
        match v {
            1 => CellKind::Dirt,
            2 => CellKind::Clay,
            3 => CellKind::Sand,
            4 => CellKind::Gravel,
            5 => CellKind::Peat,
            6 => CellKind::Rock,
            7 => CellKind::Wall,
            8 => CellKind::Sapling,
            9 => CellKind::TreeTrunk,
            10 => CellKind::TreeLeaves,
            11 => CellKind::Track,
            12 => CellKind::Ladder,
            13 => CellKind::Ramp,
            14 => CellKind::Door,
            15 => CellKind::Grate,
            _ => CellKind::Air,
        }
    }
}

// Physics flags for the static definition table.
pub const CF_BLOCKS_MOVEMENT: u8 = 1 << 0;
pub const CF_WALKABLE: u8 = 1 << 1;
pub const CF_LADDER: u8 = 1 << 2;
pub const CF_RAMP: u8 = 1 << 3;
pub const CF_BLOCKS_FLUIDS: u8 = 1 << 4;
pub const CF_SOLID: u8 = 1 << 5;

const CF_GROUND: u8 = CF_WALKABLE | CF_SOLID;
const CF_WALL: u8 = CF_BLOCKS_MOVEMENT | CF_BLOCKS_FLUIDS | CF_SOLID;

/// One row of the static cell table.
#[derive(Debug, Clone, Copy)]
pub struct CellDef {
    pub name: &'static str,
    pub flags: u8,
    /// Insulation tier used when the cell carries no wall material (0 = air).
    pub insulation_tier: u8,
    /// Base fuel when the cell carries no constructed wall material.
    pub fuel: u8,
    /// What the cell turns into when its fuel burns out.
    pub burns_into: CellKind,
}

/// Static property table, indexed by `CellKind as usize`.
pub const CELL_DEFS: [CellDef; CellKind::COUNT] = [
    // Air
    CellDef { name: "air", flags: 0, insulation_tier: 0, fuel: 0, burns_into: CellKind::Air },
    // Dirt: grass overlay supplies fuel, the soil itself does not burn away
    CellDef { name: "dirt", flags: CF_GROUND, insulation_tier: 2, fuel: 0, burns_into: CellKind::Dirt },
    CellDef { name: "clay", flags: CF_GROUND, insulation_tier: 2, fuel: 0, burns_into: CellKind::Clay },
    CellDef { name: "sand", flags: CF_GROUND, insulation_tier: 2, fuel: 0, burns_into: CellKind::Sand },
    CellDef { name: "gravel", flags: CF_GROUND, insulation_tier: 2, fuel: 0, burns_into: CellKind::Gravel },
    CellDef { name: "peat", flags: CF_GROUND, insulation_tier: 2, fuel: 6, burns_into: CellKind::Dirt },
    CellDef { name: "rock", flags: CF_GROUND, insulation_tier: 2, fuel: 0, burns_into: CellKind::Rock },
    CellDef { name: "wall", flags: CF_WALL, insulation_tier: 2, fuel: 0, burns_into: CellKind::Wall },
    CellDef { name: "sapling", flags: 0, insulation_tier: 1, fuel: 8, burns_into: CellKind::Air },
    CellDef { name: "tree trunk", flags: CF_WALL, insulation_tier: 1, fuel: 48, burns_into: CellKind::Air },
    CellDef { name: "tree leaves", flags: CF_BLOCKS_MOVEMENT, insulation_tier: 1, fuel: 12, burns_into: CellKind::Air },
    CellDef { name: "track", flags: CF_GROUND, insulation_tier: 2, fuel: 0, burns_into: CellKind::Track },
    CellDef { name: "ladder", flags: CF_LADDER | CF_WALKABLE, insulation_tier: 1, fuel: 24, burns_into: CellKind::Air },
    CellDef { name: "ramp", flags: CF_RAMP | CF_GROUND, insulation_tier: 2, fuel: 0, burns_into: CellKind::Ramp },
    CellDef { name: "door", flags: CF_BLOCKS_MOVEMENT | CF_BLOCKS_FLUIDS, insulation_tier: 1, fuel: 32, burns_into: CellKind::Air },
    CellDef { name: "grate", flags: CF_BLOCKS_MOVEMENT, insulation_tier: 2, fuel: 0, burns_into: CellKind::Grate },
];

#[inline]
#[must_use]
pub fn cell_def(kind: CellKind) -> &'static CellDef {
    &CELL_DEFS[kind as usize]
}

/// Can something stand ON this cell from above.
#[inline]
#[must_use]
pub fn cell_is_solid(kind: CellKind) -> bool {
    cell_def(kind).flags & CF_SOLID != 0
}

#[inline]
#[must_use]
pub fn cell_blocks_movement(kind: CellKind) -> bool {
    cell_def(kind).flags & CF_BLOCKS_MOVEMENT != 0
}

/// Does this cell stop water, smoke and steam.
#[inline]
#[must_use]
pub fn cell_blocks_fluids(kind: CellKind) -> bool {
    cell_def(kind).flags & CF_BLOCKS_FLUIDS != 0
}

/// Can a fluid occupy this cell.
#[inline]
#[must_use]
pub fn cell_allows_fluids(kind: CellKind) -> bool {
    !cell_blocks_fluids(kind) && !cell_is_solid(kind)
}

/// Base fuel of the bare cell kind (materials and grass overlays may override).
#[inline]
#[must_use]
pub fn cell_fuel(kind: CellKind) -> u8 {
    cell_def(kind).fuel
}

#[inline]
#[must_use]
pub fn cell_burns_into(kind: CellKind) -> CellKind {
    cell_def(kind).burns_into
}

// Flag byte layout:
//   bit 0    HAS_FLOOR   constructed floor present at this cell
//   bit 1    BURNED      burnt out, suppresses re-ignition
//   bit 2    EXPLORED    revealed to the player
//   bits 3-4 SURFACE     bare / grass / tall grass / trampled
//   bits 5-6 WETNESS     0..3 (dry / damp / wet / soaked)
pub const CELL_FLAG_HAS_FLOOR: u8 = 1 << 0;
pub const CELL_FLAG_BURNED: u8 = 1 << 1;
pub const CELL_FLAG_EXPLORED: u8 = 1 << 2;

pub(crate) const SURFACE_SHIFT: u8 = 3;
pub(crate) const SURFACE_MASK: u8 = 0b11 << SURFACE_SHIFT;
pub(crate) const WETNESS_SHIFT: u8 = 5;
pub(crate) const WETNESS_MASK: u8 = 0b11 << WETNESS_SHIFT;

/// Maximum wetness value (soaked).
pub const WETNESS_MAX: u8 = 3;

/// Surface cover on top of a ground cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum Surface {
    #[default]
    Bare = 0,
    Grass = 1,
    TallGrass = 2,
    Trampled = 3,
}

impl Surface {
    #[inline]
    #[must_use]
    pub fn from_bits(v: u8) -> Self {
        match v & 0b11 {
            1 => Surface::Grass,
            2 => Surface::TallGrass,
            3 => Surface::Trampled,
            _ => Surface::Bare,
        }
    }

    /// Grass in any living state (burns, regrows saplings).
    #[inline]
    #[must_use]
    pub fn is_grass(self) -> bool {
        matches!(self, Surface::Grass | Surface::TallGrass)
    }
}

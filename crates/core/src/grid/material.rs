//! Wall and floor material overlay.
//!
//! Two parallel 3-D arrays carry what each wall and floor is made of, plus a
//! natural bit (terrain vs. constructed) and a finish bit (rough vs. smooth)
//! for each. Invariant kept by [`MaterialOverlay::sync_to_terrain`]: a ground
//! cell always carries its soil material with the natural bit set.

use crate::core_types::{cell_is_solid, CellKind, Material};
use crate::grid::{Field3, VoxelGrid};

const META_NATURAL: u8 = 1 << 0;
const META_SMOOTH: u8 = 1 << 1;

/// Per-cell material identity for walls and floors.
#[derive(Debug, Clone)]
pub struct MaterialOverlay {
    wall: Field3<Material>,
    floor: Field3<Material>,
    wall_meta: Field3<u8>,
    floor_meta: Field3<u8>,
    width: i32,
    height: i32,
    depth: i32,
}

impl MaterialOverlay {
    #[must_use]
    pub fn new(width: i32, height: i32, depth: i32) -> Self {
        let (w, h, d) = (width.max(1) as usize, height.max(1) as usize, depth.max(1) as usize);
        Self {
            wall: Field3::new(w, h, d),
            floor: Field3::new(w, h, d),
            wall_meta: Field3::new(w, h, d),
            floor_meta: Field3::new(w, h, d),
            width: w as i32,
            height: h as i32,
            depth: d as i32,
        }
    }

    #[inline]
    fn in_bounds(&self, x: i32, y: i32, z: i32) -> bool {
        x >= 0 && x < self.width && y >= 0 && y < self.height && z >= 0 && z < self.depth
    }

    /// Wall material at the cell; `Material::None` when out of bounds or
    /// nothing is there.
    #[inline]
    #[must_use]
    pub fn wall_material(&self, x: i32, y: i32, z: i32) -> Material {
        if self.in_bounds(x, y, z) {
            self.wall.get(x as usize, y as usize, z as usize)
        } else {
            Material::None
        }
    }

    pub fn set_wall_material(&mut self, x: i32, y: i32, z: i32, material: Material) {
        if self.in_bounds(x, y, z) {
            self.wall.set(x as usize, y as usize, z as usize, material);
        }
    }

    #[inline]
    #[must_use]
    pub fn floor_material(&self, x: i32, y: i32, z: i32) -> Material {
        if self.in_bounds(x, y, z) {
            self.floor.get(x as usize, y as usize, z as usize)
        } else {
            Material::None
        }
    }

    pub fn set_floor_material(&mut self, x: i32, y: i32, z: i32, material: Material) {
        if self.in_bounds(x, y, z) {
            self.floor.set(x as usize, y as usize, z as usize, material);
        }
    }

    /// Natural terrain (true) vs. built by hand (false).
    #[inline]
    #[must_use]
    pub fn is_wall_natural(&self, x: i32, y: i32, z: i32) -> bool {
        self.in_bounds(x, y, z)
            && self.wall_meta.get(x as usize, y as usize, z as usize) & META_NATURAL != 0
    }

    pub fn set_wall_natural(&mut self, x: i32, y: i32, z: i32, natural: bool) {
        if !self.in_bounds(x, y, z) {
            return;
        }
        let meta = self.wall_meta.get_mut(x as usize, y as usize, z as usize);
        if natural { *meta |= META_NATURAL } else { *meta &= !META_NATURAL }
    }

    #[inline]
    #[must_use]
    pub fn is_floor_natural(&self, x: i32, y: i32, z: i32) -> bool {
        self.in_bounds(x, y, z)
            && self.floor_meta.get(x as usize, y as usize, z as usize) & META_NATURAL != 0
    }

    pub fn set_floor_natural(&mut self, x: i32, y: i32, z: i32, natural: bool) {
        if !self.in_bounds(x, y, z) {
            return;
        }
        let meta = self.floor_meta.get_mut(x as usize, y as usize, z as usize);
        if natural { *meta |= META_NATURAL } else { *meta &= !META_NATURAL }
    }

    #[inline]
    #[must_use]
    pub fn is_wall_smooth(&self, x: i32, y: i32, z: i32) -> bool {
        self.in_bounds(x, y, z)
            && self.wall_meta.get(x as usize, y as usize, z as usize) & META_SMOOTH != 0
    }

    pub fn set_wall_smooth(&mut self, x: i32, y: i32, z: i32, smooth: bool) {
        if !self.in_bounds(x, y, z) {
            return;
        }
        let meta = self.wall_meta.get_mut(x as usize, y as usize, z as usize);
        if smooth { *meta |= META_SMOOTH } else { *meta &= !META_SMOOTH }
    }

    /// A constructed (non-natural) wall with a real material.
    #[must_use]
    pub fn is_constructed_wall(&self, x: i32, y: i32, z: i32) -> bool {
        self.wall_material(x, y, z) != Material::None && !self.is_wall_natural(x, y, z)
    }

    /// Stamp ground cells with their soil material and the natural bit.
    /// Other solid cells default to the biome's stone. Call once after
    /// terrain generation.
    pub fn sync_to_terrain(&mut self, grid: &VoxelGrid, stone: Material) {
        for z in 0..self.depth {
            for y in 0..self.height {
                for x in 0..self.width {
                    let kind = grid.kind(x, y, z);
                    let mut mat = Material::for_ground_kind(kind);
                    if mat == Material::None && cell_is_solid(kind) && kind != CellKind::Air {
                        mat = stone;
                    }
                    if mat == Material::None {
                        continue;
                    }
                    self.set_wall_material(x, y, z, mat);
                    self.set_wall_natural(x, y, z, true);
                }
            }
        }
    }

    // Raw access for persistence.
    pub(crate) fn parts(&self) -> (&Field3<Material>, &Field3<Material>, &Field3<u8>, &Field3<u8>) {
        (&self.wall, &self.floor, &self.wall_meta, &self.floor_meta)
    }

    pub(crate) fn restore(
        &mut self,
        wall: Field3<Material>,
        floor: Field3<Material>,
        wall_meta: Field3<u8>,
        floor_meta: Field3<u8>,
    ) {
        self.wall = wall;
        self.floor = floor;
        self.wall_meta = wall_meta;
        self.floor_meta = floor_meta;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_bounds_contract() {
        let mut overlay = MaterialOverlay::new(4, 4, 2);
        assert_eq!(overlay.wall_material(-1, 0, 0), Material::None);
        overlay.set_wall_material(99, 0, 0, Material::Oak);
        assert!(!overlay.is_wall_natural(99, 0, 0));
    }

    #[test]
    fn sync_stamps_soil_and_stone() {
        let mut grid = VoxelGrid::new(3, 1, 2);
        grid.set_kind(0, 0, 0, CellKind::Dirt);
        grid.set_kind(1, 0, 0, CellKind::Peat);
        grid.set_kind(2, 0, 0, CellKind::Wall);
        let mut overlay = MaterialOverlay::new(3, 1, 2);
        overlay.sync_to_terrain(&grid, Material::Slate);
        assert_eq!(overlay.wall_material(0, 0, 0), Material::Dirt);
        assert!(overlay.is_wall_natural(0, 0, 0));
        assert_eq!(overlay.wall_material(1, 0, 0), Material::Peat);
        assert_eq!(overlay.wall_material(2, 0, 0), Material::Slate);
        assert_eq!(overlay.wall_material(0, 0, 1), Material::None, "air stays bare");
    }

    #[test]
    fn constructed_wall_is_not_natural() {
        let mut overlay = MaterialOverlay::new(2, 1, 1);
        overlay.set_wall_material(0, 0, 0, Material::Brick);
        assert!(overlay.is_constructed_wall(0, 0, 0));
        overlay.set_wall_natural(0, 0, 0, true);
        assert!(!overlay.is_constructed_wall(0, 0, 0));
    }
}

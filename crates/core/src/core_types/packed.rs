//! Bit-packed per-cell records for the simulation fields.
//!
//! Each field keeps one small record per voxel, so the packing matters: a
//! million-cell map carries each of these a million times. The wire format
//! written by save/load is the inner integer, bit for bit, so the layouts
//! below must not be reshuffled without a save-version bump.

use serde::{Deserialize, Serialize};

/// Shared 1-7 scale used by water, fire, smoke and steam.
pub const MAX_LEVEL: u8 = 7;

/// Packed water state.
///
/// Layout (u16): level:3, stable:1, source:1, drain:1, pressure:1,
/// pressure_source_z:4, frozen:1. Five bits spare.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[repr(transparent)]
pub struct WaterCell(u16);

impl WaterCell {
    const LEVEL_MASK: u16 = 0b111;
    const STABLE: u16 = 1 << 3;
    const SOURCE: u16 = 1 << 4;
    const DRAIN: u16 = 1 << 5;
    const PRESSURE: u16 = 1 << 6;
    const PSZ_SHIFT: u16 = 7;
    const PSZ_MASK: u16 = 0b1111 << 7;
    const FROZEN: u16 = 1 << 11;

    /// Highest z a water pressure trail can record (4-bit field).
    pub const PRESSURE_SOURCE_Z_MAX: i32 = 15;

    #[inline]
    pub fn level(self) -> u8 {
        (self.0 & Self::LEVEL_MASK) as u8
    }

    #[inline]
    pub fn set_level(&mut self, level: u8) {
        self.0 = (self.0 & !Self::LEVEL_MASK) | u16::from(level.min(MAX_LEVEL));
    }

    #[inline]
    pub fn is_stable(self) -> bool {
        self.0 & Self::STABLE != 0
    }

    #[inline]
    pub fn set_stable(&mut self, v: bool) {
        if v { self.0 |= Self::STABLE } else { self.0 &= !Self::STABLE }
    }

    #[inline]
    pub fn is_source(self) -> bool {
        self.0 & Self::SOURCE != 0
    }

    #[inline]
    pub fn set_source(&mut self, v: bool) {
        if v { self.0 |= Self::SOURCE } else { self.0 &= !Self::SOURCE }
    }

    #[inline]
    pub fn is_drain(self) -> bool {
        self.0 & Self::DRAIN != 0
    }

    #[inline]
    pub fn set_drain(&mut self, v: bool) {
        if v { self.0 |= Self::DRAIN } else { self.0 &= !Self::DRAIN }
    }

    #[inline]
    pub fn has_pressure(self) -> bool {
        self.0 & Self::PRESSURE != 0
    }

    #[inline]
    pub fn set_pressure(&mut self, v: bool) {
        if v { self.0 |= Self::PRESSURE } else { self.0 &= !Self::PRESSURE }
    }

    /// z-level the pressurised water descends from; it can climb back to one
    /// below this. Clamped to the 4-bit field.
    #[inline]
    pub fn pressure_source_z(self) -> i32 {
        i32::from((self.0 & Self::PSZ_MASK) >> Self::PSZ_SHIFT)
    }

    #[inline]
    pub fn set_pressure_source_z(&mut self, z: i32) {
        let clamped = z.clamp(0, Self::PRESSURE_SOURCE_Z_MAX) as u16;
        self.0 = (self.0 & !Self::PSZ_MASK) | (clamped << Self::PSZ_SHIFT);
    }

    #[inline]
    pub fn is_frozen(self) -> bool {
        self.0 & Self::FROZEN != 0
    }

    #[inline]
    pub fn set_frozen(&mut self, v: bool) {
        if v { self.0 |= Self::FROZEN } else { self.0 &= !Self::FROZEN }
    }

    /// Counts toward `water_active_cells`.
    #[inline]
    pub fn is_active(self) -> bool {
        self.level() > 0 || self.is_source() || self.is_drain()
    }
}

/// Packed fire state.
///
/// Layout (u16): level:3, stable:1, source:1, fuel:8 in the high byte.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[repr(transparent)]
pub struct FireCell(u16);

impl FireCell {
    const LEVEL_MASK: u16 = 0b111;
    const STABLE: u16 = 1 << 3;
    const SOURCE: u16 = 1 << 4;
    const FUEL_SHIFT: u16 = 8;

    #[inline]
    pub fn level(self) -> u8 {
        (self.0 & Self::LEVEL_MASK) as u8
    }

    #[inline]
    pub fn set_level(&mut self, level: u8) {
        self.0 = (self.0 & !Self::LEVEL_MASK) | u16::from(level.min(MAX_LEVEL));
    }

    #[inline]
    pub fn is_stable(self) -> bool {
        self.0 & Self::STABLE != 0
    }

    #[inline]
    pub fn set_stable(&mut self, v: bool) {
        if v { self.0 |= Self::STABLE } else { self.0 &= !Self::STABLE }
    }

    #[inline]
    pub fn is_source(self) -> bool {
        self.0 & Self::SOURCE != 0
    }

    #[inline]
    pub fn set_source(&mut self, v: bool) {
        if v { self.0 |= Self::SOURCE } else { self.0 &= !Self::SOURCE }
    }

    #[inline]
    pub fn fuel(self) -> u8 {
        (self.0 >> Self::FUEL_SHIFT) as u8
    }

    #[inline]
    pub fn set_fuel(&mut self, fuel: u8) {
        self.0 = (self.0 & 0x00FF) | (u16::from(fuel) << Self::FUEL_SHIFT);
    }

    /// Counts toward `fire_active_cells`.
    #[inline]
    pub fn is_active(self) -> bool {
        self.level() > 0 || self.is_source()
    }
}

/// Packed smoke state.
///
/// Layout (u8): level:3, stable:1, pressure:1, pressure_source_z:3.
/// The 3-bit origin caps pressure tracking at z = 7; trapped smoke that
/// climbed from deeper than that may fill back down further than it rose.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[repr(transparent)]
pub struct SmokeCell(u8);

impl SmokeCell {
    const LEVEL_MASK: u8 = 0b111;
    const STABLE: u8 = 1 << 3;
    const PRESSURE: u8 = 1 << 4;
    const PSZ_SHIFT: u8 = 5;
    const PSZ_MASK: u8 = 0b111 << 5;

    /// Highest z the 3-bit origin field can record.
    pub const PRESSURE_SOURCE_Z_MAX: i32 = 7;

    #[inline]
    pub fn level(self) -> u8 {
        self.0 & Self::LEVEL_MASK
    }

    #[inline]
    pub fn set_level(&mut self, level: u8) {
        self.0 = (self.0 & !Self::LEVEL_MASK) | level.min(MAX_LEVEL);
    }

    #[inline]
    pub fn is_stable(self) -> bool {
        self.0 & Self::STABLE != 0
    }

    #[inline]
    pub fn set_stable(&mut self, v: bool) {
        if v { self.0 |= Self::STABLE } else { self.0 &= !Self::STABLE }
    }

    #[inline]
    pub fn has_pressure(self) -> bool {
        self.0 & Self::PRESSURE != 0
    }

    #[inline]
    pub fn set_pressure(&mut self, v: bool) {
        if v { self.0 |= Self::PRESSURE } else { self.0 &= !Self::PRESSURE }
    }

    #[inline]
    pub fn pressure_source_z(self) -> i32 {
        i32::from((self.0 & Self::PSZ_MASK) >> Self::PSZ_SHIFT)
    }

    #[inline]
    pub fn set_pressure_source_z(&mut self, z: i32) {
        let clamped = z.clamp(0, Self::PRESSURE_SOURCE_Z_MAX) as u8;
        self.0 = (self.0 & !Self::PSZ_MASK) | (clamped << Self::PSZ_SHIFT);
    }
}

/// Packed steam state.
///
/// Layout (u8): level:3, pressure:3, stable:1. Steam temperature lives in
/// the temperature grid, not here.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[repr(transparent)]
pub struct SteamCell(u8);

impl SteamCell {
    const LEVEL_MASK: u8 = 0b111;
    const PRESSURE_SHIFT: u8 = 3;
    const PRESSURE_MASK: u8 = 0b111 << 3;
    const STABLE: u8 = 1 << 6;

    #[inline]
    pub fn level(self) -> u8 {
        self.0 & Self::LEVEL_MASK
    }

    #[inline]
    pub fn set_level(&mut self, level: u8) {
        self.0 = (self.0 & !Self::LEVEL_MASK) | level.min(MAX_LEVEL);
    }

    #[inline]
    pub fn pressure(self) -> u8 {
        (self.0 & Self::PRESSURE_MASK) >> Self::PRESSURE_SHIFT
    }

    #[inline]
    pub fn set_pressure(&mut self, p: u8) {
        self.0 = (self.0 & !Self::PRESSURE_MASK) | (p.min(MAX_LEVEL) << Self::PRESSURE_SHIFT);
    }

    #[inline]
    pub fn is_stable(self) -> bool {
        self.0 & Self::STABLE != 0
    }

    #[inline]
    pub fn set_stable(&mut self, v: bool) {
        if v { self.0 |= Self::STABLE } else { self.0 &= !Self::STABLE }
    }
}

/// Per-cell temperature record: a signed Celsius value plus state bits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TempCell {
    current: i8,
    bits: u8,
}

impl TempCell {
    const STABLE: u8 = 1 << 0;
    const HEAT_SOURCE: u8 = 1 << 1;
    const COLD_SOURCE: u8 = 1 << 2;

    #[inline]
    pub fn current(self) -> i32 {
        i32::from(self.current)
    }

    /// Saturates to the i8 Celsius range.
    #[inline]
    pub fn set_current(&mut self, temp: i32) {
        self.current = temp.clamp(i32::from(i8::MIN), i32::from(i8::MAX)) as i8;
    }

    #[inline]
    pub fn is_stable(self) -> bool {
        self.bits & Self::STABLE != 0
    }

    #[inline]
    pub fn set_stable(&mut self, v: bool) {
        if v { self.bits |= Self::STABLE } else { self.bits &= !Self::STABLE }
    }

    #[inline]
    pub fn is_heat_source(self) -> bool {
        self.bits & Self::HEAT_SOURCE != 0
    }

    #[inline]
    pub fn set_heat_source(&mut self, v: bool) {
        if v { self.bits |= Self::HEAT_SOURCE } else { self.bits &= !Self::HEAT_SOURCE }
    }

    #[inline]
    pub fn is_cold_source(self) -> bool {
        self.bits & Self::COLD_SOURCE != 0
    }

    #[inline]
    pub fn set_cold_source(&mut self, v: bool) {
        if v { self.bits |= Self::COLD_SOURCE } else { self.bits &= !Self::COLD_SOURCE }
    }

    #[inline]
    pub fn is_source(self) -> bool {
        self.bits & (Self::HEAT_SOURCE | Self::COLD_SOURCE) != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn water_fields_are_independent() {
        let mut c = WaterCell::default();
        c.set_level(5);
        c.set_source(true);
        c.set_pressure(true);
        c.set_pressure_source_z(9);
        c.set_frozen(true);
        assert_eq!(c.level(), 5);
        assert!(c.is_source());
        assert!(!c.is_drain());
        assert!(c.has_pressure());
        assert_eq!(c.pressure_source_z(), 9);
        assert!(c.is_frozen());
        c.set_level(0);
        assert!(c.is_active(), "a dry source is still active");
        c.set_source(false);
        assert!(!c.is_active());
    }

    #[test]
    fn water_level_clamps_to_seven() {
        let mut c = WaterCell::default();
        c.set_level(200);
        assert_eq!(c.level(), 7);
        c.set_pressure_source_z(99);
        assert_eq!(c.pressure_source_z(), WaterCell::PRESSURE_SOURCE_Z_MAX);
    }

    #[test]
    fn fire_fuel_occupies_high_byte() {
        let mut c = FireCell::default();
        c.set_level(7);
        c.set_fuel(255);
        assert_eq!(c.level(), 7);
        assert_eq!(c.fuel(), 255);
        c.set_fuel(0);
        assert_eq!(c.level(), 7, "clearing fuel must not touch level");
    }

    #[test]
    fn smoke_origin_caps_at_seven() {
        let mut c = SmokeCell::default();
        c.set_pressure_source_z(12);
        assert_eq!(c.pressure_source_z(), SmokeCell::PRESSURE_SOURCE_Z_MAX);
        c.set_level(7);
        c.set_pressure(true);
        assert_eq!(c.level(), 7);
        assert!(c.has_pressure());
    }

    #[test]
    fn temperature_saturates() {
        let mut c = TempCell::default();
        c.set_current(500);
        assert_eq!(c.current(), 127);
        c.set_current(-500);
        assert_eq!(c.current(), -128);
        c.set_heat_source(true);
        assert!(c.is_source());
        assert!(!c.is_cold_source());
    }
}

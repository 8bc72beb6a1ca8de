//! Hearthfield simulation core
//!
//! The cellular environmental heart of a colony game: coupled, tick-driven
//! fields for water, fire, smoke, steam, temperature, ground wear and
//! weather over a 3-D voxel grid. Fire makes smoke and heat; heat boils
//! water into steam; steam condenses back under cold ceilings; rain wets
//! the ground and feet wear paths into the grass.
//!
//! Everything hangs off [`SimulationWorld`]: create one, shape its terrain,
//! and call [`SimulationWorld::tick`] at a fixed 60 Hz.
//!
//! ```
//! use hearthfield_core::{CellKind, SimulationWorld};
//!
//! let mut world = SimulationWorld::new(16, 16, 4, 42);
//! for y in 0..16 {
//!     for x in 0..16 {
//!         world.grid.set_kind(x, y, 0, CellKind::Dirt);
//!     }
//! }
//! world.sync_materials_to_terrain(hearthfield_core::Material::Granite);
//! world.set_water_level(8, 8, 1, 7);
//! for _ in 0..600 {
//!     world.tick();
//! }
//! assert!(world.get_water_level(8, 8, 1) < 7, "the puddle spread out");
//! ```
//!
//! The fields scale to large maps by presence counters (a quiescent field
//! costs one integer compare per tick), per-cell stable bits, and hard
//! per-tick update caps. The simulation is deliberately single-threaded:
//! scan ordering and per-cell side effects are load-bearing.

pub mod config;
pub mod core_types;
pub mod grid;
pub mod simulation;
pub mod time;
pub mod weather;

pub use config::SimConfig;
pub use core_types::{BiomePreset, CellKind, Material, Surface, BIOME_PRESETS};
pub use grid::{MaterialOverlay, VoxelGrid, CELL_SIZE, CHUNK_SIZE};
pub use simulation::{ActivityCounts, EventLog, PersistenceError, SaveState, SimulationWorld};
pub use time::{GameClock, TICK_DT};
pub use weather::{Season, WeatherKind, WeatherSystem};

//! End-to-end fire behavior: a grass fire burning itself out, and
//! lightning starting fires during thunderstorms.

use hearthfield_core::core_types::CELL_FLAG_BURNED;
use hearthfield_core::{CellKind, Material, SimulationWorld, Surface, WeatherKind};

fn grass_field(width: i32, height: i32, seed: u64) -> SimulationWorld {
    let mut world = SimulationWorld::new(width, height, 2, seed);
    world.config.weather_enabled = false;
    for y in 0..height {
        for x in 0..width {
            world.grid.set_kind(x, y, 0, CellKind::Dirt);
            world.grid.set_surface(x, y, 0, Surface::Grass);
        }
    }
    world.sync_materials_to_terrain(Material::Granite);
    world
}

#[test]
fn grass_fire_burns_out_into_scorched_dirt() {
    let mut world = grass_field(3, 3, 606);
    world.ignite_cell(1, 1, 0);

    let mut saw_smoke = false;
    for _ in 0..2000 {
        world.tick();
        saw_smoke |= world.activity().smoke_active_cells > 0;
    }

    assert_eq!(world.get_fire_level(1, 1, 0), 0, "the fire died");
    assert!(world.grid.has_flag(1, 1, 0, CELL_FLAG_BURNED));
    assert_eq!(world.grid.surface(1, 1, 0), Surface::Bare, "the grass burned away");
    assert_eq!(world.get_ground_wear(1, 1, 0), world.config.wear_max);
    assert!(saw_smoke, "burning produced smoke");

    // Scorched ground refuses to light again
    world.ignite_cell(1, 1, 0);
    assert_eq!(world.get_fire_level(1, 1, 0), 0);
}

#[test]
fn a_field_fire_spreads_and_eventually_exhausts_itself() {
    let mut world = grass_field(8, 8, 77);
    world.ignite_cell(4, 4, 0);
    // Long enough for the whole field to burn over
    world.run_game_seconds(120.0);

    assert_eq!(world.activity().fire_active_cells, 0, "nothing left to burn");
    let mut burned = 0;
    for y in 0..8 {
        for x in 0..8 {
            if world.grid.has_flag(x, y, 0, CELL_FLAG_BURNED) {
                burned += 1;
            }
        }
    }
    assert!(burned > 1, "the fire reached beyond its origin, burned {burned}");
}

#[test]
fn lightning_ignites_grass_during_a_thunderstorm() {
    let mut world = grass_field(16, 16, 4242);
    world.config.weather_enabled = true;
    world.weather.force(WeatherKind::Thunderstorm, 1.0);

    let mut struck = false;
    for _ in 0..6000 {
        world.tick();
        if world.activity().fire_active_cells > 0 {
            struck = true;
            break;
        }
    }
    assert!(struck, "a storm over dry grass starts a fire sooner or later");
    assert!(
        world.events.iter().any(|line| line.contains("Lightning")),
        "the strike was logged"
    );
}

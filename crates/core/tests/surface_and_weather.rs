//! End-to-end surface behavior: paths worn into grass that heal over, the
//! freeze/thaw round trip, and weather writing onto the map.

use hearthfield_core::{CellKind, Material, Season, SimulationWorld, Surface, WeatherKind};

fn grassy_corridor() -> SimulationWorld {
    let mut world = SimulationWorld::new(10, 1, 2, 314);
    world.config.weather_enabled = false;
    for x in 0..10 {
        world.grid.set_kind(x, 0, 0, CellKind::Dirt);
        world.grid.set_surface(x, 0, 0, Surface::TallGrass);
    }
    world.sync_materials_to_terrain(Material::Granite);
    world
}

#[test]
fn foot_traffic_wears_a_path_that_heals_over() {
    let mut world = grassy_corridor();
    world.config.wear_trample_amount = 20;
    world.config.wear_decay_rate = 40;
    world.clock.day_number = 9; // summer, so recovery runs at full rate

    // Fifty patrols along the corridor
    for _ in 0..50 {
        for x in 0..10 {
            world.trample_ground(x, 0, 1);
        }
    }
    for x in 0..10 {
        let surface = world.grid.surface(x, 0, 0);
        assert!(
            matches!(surface, Surface::Trampled | Surface::Bare),
            "cell {x} shows the path, got {surface:?}"
        );
    }

    // A quiet in-game day later the grass is back
    world.run_game_seconds(world.clock.day_length);
    for x in 0..10 {
        let wear = world.get_ground_wear(x, 0, 0);
        assert!(
            wear < world.config.wear_normal_to_trampled,
            "cell {x} healed below the trampled threshold, wear {wear}"
        );
        assert!(world.grid.surface(x, 0, 0) != Surface::Trampled);
    }
}

#[test]
fn freeze_then_thaw_preserves_the_water_level() {
    let mut world = SimulationWorld::new(8, 8, 4, 99);
    world.config.weather_enabled = false;
    for y in 0..8 {
        for x in 0..8 {
            world.grid.set_kind(x, y, 1, CellKind::Rock);
        }
    }
    world.set_water_level(5, 5, 2, 3);

    world.set_cold_source(5, 5, 2, true);
    world.update_temperature();
    world.update_water_freezing();
    assert!(world.is_water_frozen(5, 5, 2));
    assert_eq!(world.get_water_level(5, 5, 2), 3, "ice keeps its volume");
    // Frozen cells refuse incoming flow and block the fire-style checks
    world.add_water(5, 5, 3, 2);
    world.tick();
    assert!(world.is_water_frozen(5, 5, 2));

    world.set_cold_source(5, 5, 2, false);
    world.set_temperature(5, 5, 2, 10);
    world.update_water_freezing();
    assert!(!world.is_water_frozen(5, 5, 2));
    assert_eq!(world.get_water_level(5, 5, 2), 3, "melt restores the same liquid");

    // Idempotence both ways
    world.freeze_water(5, 5, 2);
    world.freeze_water(5, 5, 2);
    assert_eq!(world.get_water_level(5, 5, 2), 3);
    world.thaw_water(5, 5, 2);
    world.thaw_water(5, 5, 2);
    assert_eq!(world.get_water_level(5, 5, 2), 3);
}

#[test]
fn rain_leaves_puddles_on_open_ground() {
    let mut world = SimulationWorld::new(8, 8, 3, 1212);
    for y in 0..8 {
        for x in 0..8 {
            world.grid.set_kind(x, y, 0, CellKind::Dirt);
        }
    }
    world.sync_materials_to_terrain(Material::Granite);
    world.weather.force(WeatherKind::HeavyRain, 1.0);
    world.run_game_seconds(30.0);

    assert!(
        world.activity().water_active_cells > 0,
        "heavy rain puts water on the map"
    );
}

#[test]
fn snow_settles_in_the_cold_and_melts_into_wet_ground() {
    let mut world = SimulationWorld::new(8, 8, 3, 515);
    world.config.base_surface_temp = -5;
    for y in 0..8 {
        for x in 0..8 {
            world.grid.set_kind(x, y, 0, CellKind::Dirt);
        }
    }
    world.sync_materials_to_terrain(Material::Granite);
    world.weather.force(WeatherKind::Snow, 1.0);
    world.run_game_seconds(60.0);

    let total_snow = |w: &SimulationWorld| -> i32 {
        let mut sum = 0;
        for z in 0..3 {
            for y in 0..8 {
                for x in 0..8 {
                    sum += i32::from(w.snow_level(x, y, z));
                }
            }
        }
        sum
    };
    let accumulated = total_snow(&world);
    assert!(accumulated > 0, "snow accumulated in the cold");

    // Warm spell: the blanket melts away
    world.config.base_surface_temp = 15;
    world.weather.force(WeatherKind::Clear, 0.0);
    world.run_game_seconds(300.0);
    assert!(total_snow(&world) < accumulated, "thaw shrinks the snow cover");
}

#[test]
fn seasons_march_through_the_year_and_reach_the_log() {
    let mut world = SimulationWorld::new(4, 4, 2, 808);
    world.config.days_per_season = 7;
    assert_eq!(Season::for_day(world.clock.day_number, 7), Season::Spring);

    world.clock.day_number = 8;
    world.log_event("summer checkpoint");
    assert!(world.events.get(0).unwrap().starts_with("[Sum"));

    // Let the weather machine run; transitions append to the log
    world.weather.transition_timer = 0.0;
    world.run_game_seconds(120.0);
    assert!(
        world.events.len() > 1,
        "weather transitions were recorded over two in-game days"
    );
}

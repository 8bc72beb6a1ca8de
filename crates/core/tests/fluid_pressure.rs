//! End-to-end water behavior: U-tube pressure equalization and conservation
//! in sealed vessels.

use hearthfield_core::{CellKind, SimulationWorld};

/// Carve a U-tube out of solid wall: two arms at x=1 and x=3 (y=2,
/// z=0..=3) joined by a single connector cell at the bottom.
fn u_tube_world() -> SimulationWorld {
    let mut world = SimulationWorld::new(5, 5, 5, 2024);
    world.config.weather_enabled = false;
    world.config.water_evaporation_enabled = false;
    for z in 0..5 {
        for y in 0..5 {
            for x in 0..5 {
                world.grid.set_kind(x, y, z, CellKind::Wall);
            }
        }
    }
    for z in 0..4 {
        world.grid.set_kind(1, 2, z, CellKind::Air);
        world.grid.set_kind(3, 2, z, CellKind::Air);
    }
    world.grid.set_kind(2, 2, 0, CellKind::Air);
    world
}

#[test]
fn pressure_fills_the_opposite_arm_of_a_u_tube() {
    let mut world = u_tube_world();
    // Feed the left arm from z=2; pressure can lift water back to z=1
    world.set_water_source(1, 2, 2, true);

    for _ in 0..600 {
        world.tick();
    }

    assert_eq!(world.get_water_level(3, 2, 0), 7, "far arm bottom is full");
    assert_eq!(world.get_water_level(3, 2, 1), 7, "pressure lifted water one below source level");
    assert_eq!(
        world.get_water_level(3, 2, 2),
        0,
        "water never climbs to its own source level"
    );
    assert_eq!(world.get_water_level(3, 2, 3), 0);

    // Total volume is bounded by the open cells of the tube
    let mut total = 0;
    for z in 0..5 {
        for y in 0..5 {
            for x in 0..5 {
                total += i32::from(world.get_water_level(x, y, z));
            }
        }
    }
    assert!(total <= 9 * 7, "no water conjured beyond the vessel volume, got {total}");
}

#[test]
fn water_is_conserved_in_a_sealed_box_without_sources() {
    let mut world = SimulationWorld::new(6, 6, 4, 7);
    world.config.weather_enabled = false;
    world.config.water_evaporation_enabled = false;
    world.config.fire_enabled = false;
    for y in 0..6 {
        for x in 0..6 {
            world.grid.set_kind(x, y, 0, CellKind::Rock);
        }
    }
    world.set_water_level(2, 2, 2, 7);
    world.set_water_level(3, 3, 1, 4);
    world.set_water_level(4, 1, 3, 2);

    let total = |w: &SimulationWorld| -> i32 {
        let mut sum = 0;
        for z in 0..4 {
            for y in 0..6 {
                for x in 0..6 {
                    sum += i32::from(w.get_water_level(x, y, z));
                }
            }
        }
        sum
    };

    let before = total(&world);
    for _ in 0..500 {
        world.tick();
    }
    assert_eq!(total(&world), before);
}

#[test]
fn drained_well_goes_quiescent() {
    let mut world = SimulationWorld::new(3, 3, 3, 9);
    world.config.weather_enabled = false;
    world.config.water_evaporation_enabled = false;
    for y in 0..3 {
        for x in 0..3 {
            world.grid.set_kind(x, y, 0, CellKind::Rock);
            if (x, y) != (1, 1) {
                world.grid.set_kind(x, y, 1, CellKind::Wall);
            }
        }
    }
    world.set_water_level(1, 1, 1, 6);
    world.set_water_drain(1, 1, 1, true);
    for _ in 0..60 {
        world.tick();
    }
    assert_eq!(world.get_water_level(1, 1, 1), 0, "the drain swallowed everything");
    world.set_water_drain(1, 1, 1, false);
    assert_eq!(world.activity().water_active_cells, 0);
}

//! End-to-end scenario: a big school with all flocking rules zeroed and a
//! goal at the origin collapses onto the goal.

use glam::Vec3;
use shoal::{sim, Aabb, Params, Simulation};

#[test]
fn school_converges_on_the_goal() {
    // 1,000 fish in a 20x20x20 tank, goal seeking only.
    let params = Params {
        separation_weight: 0.0,
        alignment_weight: 0.0,
        cohesion_weight: 0.0,
        goal: Vec3::ZERO,
        goal_strength: 2.0,
        school_radius: 2.0,
        turn_rate: 6.0,
        min_speed: 1.0,
        max_speed: 2.0,
        volume: Aabb::cube(Vec3::ZERO, 10.0),
        ..Params::default()
    };
    let mut simulation = Simulation::with_seed(params, 2024).unwrap();
    simulation.spawn(1000);

    let dt = 0.05;

    // Warm up so every fish has had time to turn toward the goal.
    for _ in 0..80 {
        simulation.tick(dt);
    }

    let mut mean = sim::mean_distance(simulation.transforms(), Vec3::ZERO);
    let start_mean = mean;
    let epsilon = 1.5;
    let mut converged = false;

    for _ in 0..2000 {
        simulation.tick(dt);
        let next = sim::mean_distance(simulation.transforms(), Vec3::ZERO);
        if next < epsilon {
            converged = true;
            break;
        }
        assert!(
            next < mean,
            "mean distance to goal rose tick-over-tick: {next} >= {mean}"
        );
        mean = next;
    }

    assert!(
        converged,
        "school never converged: started at {start_mean:.2}, stuck at {mean:.2}"
    );
}

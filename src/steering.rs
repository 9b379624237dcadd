use glam::{Quat, Vec3};

use crate::octree::FishId;
use crate::params::Params;
use crate::school::Transform;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Fraction of each half extent treated as safe interior; past it the
/// containment ramp starts.
const BOUNDARY_MARGIN: f32 = 0.8;
/// Containment ramp slope: wall pull per unit of margin overshoot.
const BOUNDARY_RAMP: f32 = 5.0;
/// Containment never fully overrides steering, so wall-adjacent fish keep
/// a sliver of flock influence.
const BOUNDARY_MAX: f32 = 0.95;
/// Per-tick chance a fish redraws its cruise speed.
const SPEED_REDRAW_CHANCE: f32 = 0.1;
/// Below this squared length a direction is considered degenerate and
/// contributes nothing.
const EPS_SQ: f32 = 1e-12;

/// One fish's steering step: neighbor rules, goal bias, containment, turn,
/// advance. Pure function of the previous tick's snapshot plus a per-fish
/// RNG, so the parallel phase has no shared mutable state.
///
/// `neighbors` is whatever the index returned for the vision radius; the
/// cone filter and self-exclusion happen here. Returns the new transform
/// and cruise speed.
pub fn step_fish(
    fish: FishId,
    snapshot: &[Transform],
    speeds: &[f32],
    neighbors: &[FishId],
    params: &Params,
    dt: f32,
    rng: &mut fastrand::Rng,
) -> (Transform, f32) {
    let current = snapshot[fish as usize];
    let forward = current.forward();
    let pos = current.position;
    let cos_half = params.vision_cos_half_angle();

    // Single pass over the neighbor set, cone-filtered.
    let mut separation = Vec3::ZERO;
    let mut sep_count = 0u32;
    let mut heading_sum = Vec3::ZERO;
    let mut centroid_sum = Vec3::ZERO;
    let mut speed_sum = 0.0f32;
    let mut group = 0u32;

    for &other in neighbors {
        if other == fish {
            continue;
        }
        let other_t = &snapshot[other as usize];
        let to_other = other_t.position - pos;
        let dist_sq = to_other.length_squared();
        if dist_sq < EPS_SQ {
            // Coincident fish has no direction; skip rather than emit NaN.
            continue;
        }
        let dist = dist_sq.sqrt();
        let dir = to_other / dist;
        if forward.dot(dir) < cos_half {
            continue;
        }

        group += 1;
        heading_sum += other_t.forward();
        centroid_sum += other_t.position;
        speed_sum += speeds[other as usize];

        if dist < params.separation_distance {
            // Away from the neighbor, closer ones weighted harder.
            separation += -dir / dist;
            sep_count += 1;
        }
    }

    let to_goal = params.goal - pos;
    let goal_dist_sq = to_goal.length_squared();
    let home = if goal_dist_sq > EPS_SQ {
        to_goal / goal_dist_sq.sqrt()
    } else {
        Vec3::ZERO
    };

    let mut dir = if group > 0 {
        let separation = if sep_count > 0 {
            (separation / sep_count as f32).normalize_or_zero()
        } else {
            Vec3::ZERO
        };
        let alignment = (heading_sum / group as f32).normalize_or_zero();
        let cohesion = (centroid_sum / group as f32 - pos).normalize_or_zero();

        let combined = (separation * params.separation_weight
            + alignment * params.alignment_weight
            + cohesion * params.cohesion_weight)
            .normalize_or_zero();
        if combined == Vec3::ZERO {
            home
        } else {
            // Homeward bias grows with distance from the goal.
            let pull = (goal_dist_sq.sqrt() / params.school_radius * params.goal_strength)
                .clamp(0.0, 1.0);
            combined.lerp(home, pull).normalize_or_zero()
        }
    } else {
        // No visible neighbors: head for the goal.
        home
    };

    // Containment: blend hard toward the tank center past the margin.
    let overshoot = params.volume.margin_overshoot(pos, BOUNDARY_MARGIN);
    if overshoot > 0.0 {
        let to_center = (params.volume.center - pos).normalize_or_zero();
        let pull = (overshoot * BOUNDARY_RAMP).clamp(0.0, BOUNDARY_MAX);
        dir = dir.lerp(to_center, pull).normalize_or_zero();
        if dir == Vec3::ZERO {
            dir = to_center;
        }
    }

    let rotation = if dir == Vec3::ZERO {
        current.rotation
    } else {
        let target = Quat::from_rotation_arc(Vec3::Z, dir);
        current
            .rotation
            .slerp(target, (params.turn_rate * dt).clamp(0.0, 1.0))
            .normalize()
    };

    // Advance along the pre-turn heading at the current cruise speed;
    // rotation catches up over ticks.
    let cruise = speeds[fish as usize];
    let transform = Transform {
        position: pos + forward * cruise * dt,
        rotation,
        scale: current.scale,
    };

    // Next tick's speed: drift toward the visible group's average, with an
    // occasional redraw for population-wide variance.
    let mut speed = cruise;
    if group > 0 {
        speed = (speed_sum / group as f32).clamp(params.min_speed, params.max_speed);
    }
    if rng.f32() < SPEED_REDRAW_CHANCE {
        speed = params.min_speed + rng.f32() * (params.max_speed - params.min_speed);
    }
    (transform, speed)
}

use glam::{Quat, Vec3};

use crate::bounds::Aabb;
use crate::octree::FishId;

/// Position, orientation, and uniform scale of one fish.
/// Forward is `rotation * Vec3::Z`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: f32,
}

impl Transform {
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::Z
    }
}

/// Order-stable store of every fish in the tank.
///
/// Fish are addressed by index; growth appends at the end, shrink truncates
/// from the end, so surviving indices never move. Cruise speeds live in a
/// parallel array since the steering phase reads them alongside transforms.
#[derive(Default)]
pub struct School {
    transforms: Vec<Transform>,
    speeds: Vec<f32>,
}

impl School {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }

    pub fn transforms(&self) -> &[Transform] {
        &self.transforms
    }

    pub fn speeds(&self) -> &[f32] {
        &self.speeds
    }

    pub fn transform(&self, fish: FishId) -> Transform {
        self.transforms[fish as usize]
    }

    /// Overwrite a fish's state after a steering step.
    pub fn set(&mut self, fish: FishId, transform: Transform, speed: f32) {
        self.transforms[fish as usize] = transform;
        self.speeds[fish as usize] = speed;
    }

    /// Append `count` fish uniformly distributed in `volume` with random
    /// orientations and cruise speeds in [min_speed, max_speed].
    /// Returns the id range of the new fish.
    pub fn spawn(
        &mut self,
        count: usize,
        volume: &Aabb,
        min_speed: f32,
        max_speed: f32,
        rng: &mut fastrand::Rng,
    ) -> std::ops::Range<FishId> {
        let first = self.transforms.len() as FishId;
        self.transforms.reserve(count);
        self.speeds.reserve(count);
        for _ in 0..count {
            let position = volume.center
                + Vec3::new(
                    (rng.f32() * 2.0 - 1.0) * volume.half.x,
                    (rng.f32() * 2.0 - 1.0) * volume.half.y,
                    (rng.f32() * 2.0 - 1.0) * volume.half.z,
                );
            self.transforms.push(Transform {
                position,
                rotation: random_rotation(rng),
                scale: 1.0,
            });
            self.speeds.push(min_speed + rng.f32() * (max_speed - min_speed));
        }
        first..self.transforms.len() as FishId
    }

    /// Shrink to `count` fish, dropping from the end.
    pub fn truncate(&mut self, count: usize) {
        self.transforms.truncate(count);
        self.speeds.truncate(count);
    }
}

/// Uniformly distributed unit quaternion (Shoemake's method).
fn random_rotation(rng: &mut fastrand::Rng) -> Quat {
    use std::f32::consts::TAU;
    let u1 = rng.f32();
    let u2 = rng.f32() * TAU;
    let u3 = rng.f32() * TAU;
    let a = (1.0 - u1).sqrt();
    let b = u1.sqrt();
    Quat::from_xyzw(a * u2.sin(), a * u2.cos(), b * u3.sin(), b * u3.cos())
}

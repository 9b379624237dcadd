use glam::Vec3;
use rayon::prelude::*;

use crate::octree::{FishId, Octree};
use crate::params::{NeighborMode, ParamError, Params};
use crate::school::{School, Transform};
use crate::steering;

/// Batch size for bulk octree insertion during spawn.
const SPAWN_BATCH: usize = 100;

/// The whole simulation in one object: school, spatial index, tuning, RNG.
///
/// Created by whichever orchestrator drives the tank; every operation takes
/// `&mut self`, there are no globals. `tick` is a synchronous barrier — the
/// parallel steering phase joins before the sequential index update starts,
/// and both finish before it returns.
pub struct Simulation {
    params: Params,
    school: School,
    octree: Octree,
    rng: fastrand::Rng,
    /// Previous-tick transform copy the parallel phase reads from.
    snapshot: Vec<Transform>,
    speed_snapshot: Vec<f32>,
    tick_count: u64,
}

impl Simulation {
    /// Entropy-seeded simulation. Use [`Simulation::with_seed`] for
    /// reproducible runs.
    pub fn new(params: Params) -> Result<Self, ParamError> {
        Self::with_rng(params, fastrand::Rng::new())
    }

    pub fn with_seed(params: Params, seed: u64) -> Result<Self, ParamError> {
        Self::with_rng(params, fastrand::Rng::with_seed(seed))
    }

    fn with_rng(params: Params, rng: fastrand::Rng) -> Result<Self, ParamError> {
        params.validate()?;
        let octree = Octree::new(params.volume, params.max_occupancy, params.min_node_size);
        Ok(Self {
            params,
            school: School::new(),
            octree,
            rng,
            snapshot: Vec::new(),
            speed_snapshot: Vec::new(),
            tick_count: 0,
        })
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn school(&self) -> &School {
        &self.school
    }

    pub fn index(&self) -> &Octree {
        &self.octree
    }

    pub fn transforms(&self) -> &[Transform] {
        self.school.transforms()
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Swap in a new parameter set, applied from the next tick. Rebuilds
    /// the spatial index when its tuning (occupancy, node size, volume)
    /// changed.
    pub fn set_params(&mut self, params: Params) -> Result<(), ParamError> {
        params.validate()?;
        if params.index_changed(&self.params) {
            let mut octree =
                Octree::new(params.volume, params.max_occupancy, params.min_node_size);
            octree.insert_batch(
                self.school
                    .transforms()
                    .iter()
                    .enumerate()
                    .map(|(i, t)| (i as FishId, t.position)),
            );
            log::debug!(
                "index rebuilt: {} of {} fish indexed",
                octree.len(),
                self.school.len()
            );
            self.octree = octree;
        }
        self.params = params;
        Ok(())
    }

    /// Add `count` fish spawned uniformly in the tank volume.
    pub fn spawn(&mut self, count: usize) {
        let ids = self.school.spawn(
            count,
            &self.params.volume,
            self.params.min_speed,
            self.params.max_speed,
            &mut self.rng,
        );
        // Insert in batches; keeps subdivision work amortized on big spawns.
        let mut batch = Vec::with_capacity(SPAWN_BATCH);
        for id in ids.clone() {
            batch.push((id, self.school.transform(id).position));
            if batch.len() == SPAWN_BATCH {
                self.octree.insert_batch(batch.drain(..));
            }
        }
        self.octree.insert_batch(batch);
        log::info!("spawned {} fish ({} total)", ids.len(), self.school.len());
    }

    /// Grow or shrink the school to exactly `count` fish.
    pub fn set_population(&mut self, count: usize) {
        let len = self.school.len();
        if count > len {
            self.spawn(count - len);
        } else if count < len {
            for id in count..len {
                self.octree.remove(id as FishId);
            }
            self.school.truncate(count);
            log::info!("culled school to {count} fish");
        }
    }

    /// Advance the simulation one step: parallel steer over an immutable
    /// snapshot, write back, then sequentially re-index every fish.
    pub fn tick(&mut self, dt: f32) {
        let n = self.school.len();
        if n == 0 {
            self.tick_count += 1;
            return;
        }

        self.snapshot.clear();
        self.snapshot.extend_from_slice(self.school.transforms());
        self.speed_snapshot.clear();
        self.speed_snapshot.extend_from_slice(self.school.speeds());

        // One master draw per tick; each fish derives its own RNG from it,
        // so results are independent of worker scheduling.
        let tick_seed = self.rng.u64(..);

        let snapshot = &self.snapshot;
        let speeds = &self.speed_snapshot;
        let octree = &self.octree;
        let params = &self.params;

        let results: Vec<(Transform, f32)> = (0..n as FishId)
            .into_par_iter()
            .map_init(Vec::<FishId>::new, |neighbors, fish| {
                match params.neighbor_mode {
                    NeighborMode::Octree => {
                        octree.query_neighbors(
                            snapshot[fish as usize].position,
                            params.vision_distance,
                            neighbors,
                        );
                    }
                    NeighborMode::WindowSample { window } => {
                        sample_window(fish, n, window, neighbors);
                    }
                }
                let mut rng = fastrand::Rng::with_seed(tick_seed ^ mix(fish));
                steering::step_fish(fish, snapshot, speeds, neighbors, params, dt, &mut rng)
            })
            .collect();

        for (i, (transform, speed)) in results.into_iter().enumerate() {
            self.school.set(i as FishId, transform, speed);
        }

        // Sequential phase: the index is never mutated while workers read it.
        for i in 0..n as FishId {
            self.octree
                .update_position(i, self.school.transform(i).position);
        }

        self.tick_count += 1;
    }
}

/// Contiguous window of the flat fish array around `fish`, clamped to the
/// array ends. Approximate neighbor set for the sampling fast path.
fn sample_window(fish: FishId, n: usize, window: usize, out: &mut Vec<FishId>) {
    out.clear();
    let window = window.min(n);
    let half = window / 2;
    let start = (fish as usize).saturating_sub(half).min(n - window);
    for id in start..start + window {
        out.push(id as FishId);
    }
}

/// SplitMix64-style bit mix so consecutive fish ids get unrelated seeds.
fn mix(fish: FishId) -> u64 {
    let mut x = (fish as u64).wrapping_add(0x9E37_79B9_7F4A_7C15);
    x = (x ^ (x >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    x ^ (x >> 31)
}

/// Mean distance from every fish to `point`. Used by the demo's stats line
/// and the convergence tests.
pub fn mean_distance(transforms: &[Transform], point: Vec3) -> f32 {
    if transforms.is_empty() {
        return 0.0;
    }
    let sum: f32 = transforms
        .iter()
        .map(|t| t.position.distance(point))
        .sum();
    sum / transforms.len() as f32
}

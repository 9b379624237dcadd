//! 3D fish schooling simulation core.
//!
//! A few thousand fish steer by local rules (separation, alignment,
//! cohesion), a goal attraction point, and tank containment. Neighbors come
//! from an incrementally maintained octree so a tick is O(n log n) instead
//! of O(n²). Ticks run at a fixed rate; the presentation layer reads
//! interpolated transforms at whatever rate it likes.
//!
//! Main components:
//! - [`bounds`] — axis-aligned boxes for the tank and octree nodes.
//! - [`octree`] — the spatial index: insert / remove / move / radius query.
//! - [`school`] — the population store (transforms + cruise speeds).
//! - [`params`] — tuning, validated at set time.
//! - [`steering`] — the per-fish flocking rules.
//! - [`sim`] — the simulation context; `tick` runs steering in parallel.
//! - [`scheduler`] — fixed-interval tick driver + display interpolation.

pub mod bounds;
pub mod octree;
pub mod params;
pub mod scheduler;
pub mod school;
pub mod sim;
pub mod steering;

pub use bounds::Aabb;
pub use octree::{FishId, Octree};
pub use params::{NeighborMode, ParamError, Params};
pub use scheduler::Scheduler;
pub use school::{School, Transform};
pub use sim::Simulation;

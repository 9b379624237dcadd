use instant::Instant;

use crate::school::Transform;
use crate::sim::Simulation;

/// Max accumulated time before we clamp (prevents spiral of death when a
/// tick runs longer than the tick delay).
const MAX_ACCUMULATOR: f64 = 0.25;

/// Drives [`Simulation::tick`] at a fixed interval decoupled from the
/// presentation rate, and owns the previous/current snapshot pair used to
/// interpolate displayed transforms between ticks.
pub struct Scheduler {
    tick_delay: f64,
    accumulator: f64,
    last_advance: Option<Instant>,
    /// Transforms as they were before the most recent tick.
    prev: Vec<Transform>,
}

impl Scheduler {
    /// `tick_delay` is seconds between simulation steps.
    pub fn new(tick_delay: f64) -> Self {
        assert!(tick_delay > 0.0, "tick_delay must be positive");
        Self {
            tick_delay,
            accumulator: 0.0,
            last_advance: None,
            prev: Vec::new(),
        }
    }

    pub fn tick_delay(&self) -> f64 {
        self.tick_delay
    }

    /// Wall-clock entry point: measures elapsed time since the last call
    /// and runs as many fixed ticks as fit. Returns the number of ticks run.
    pub fn advance(&mut self, sim: &mut Simulation, now: Instant) -> u32 {
        let dt = match self.last_advance {
            Some(last) => now.duration_since(last).as_secs_f64(),
            None => 0.0,
        };
        self.last_advance = Some(now);
        self.advance_by(sim, dt)
    }

    /// Deterministic entry point: feed elapsed time directly.
    pub fn advance_by(&mut self, sim: &mut Simulation, dt: f64) -> u32 {
        self.accumulator += dt;
        if self.accumulator > MAX_ACCUMULATOR {
            self.accumulator = MAX_ACCUMULATOR;
        }

        let mut ticks = 0;
        while self.accumulator >= self.tick_delay {
            // Pre-tick transforms become "previous" for interpolation.
            self.prev.clear();
            self.prev.extend_from_slice(sim.transforms());
            sim.tick(self.tick_delay as f32);
            self.accumulator -= self.tick_delay;
            ticks += 1;
        }
        ticks
    }

    /// Normalized time since the last completed tick, for interpolation.
    pub fn alpha(&self) -> f32 {
        ((self.accumulator / self.tick_delay) as f32).clamp(0.0, 1.0)
    }

    /// Fill `out` with display transforms at the current interpolation
    /// fraction. Positions lerp, orientations slerp, scales lerp. Fish
    /// spawned since the previous snapshot show at their current transform.
    pub fn display_transforms(&self, sim: &Simulation, out: &mut Vec<Transform>) {
        self.display_at(sim, self.alpha(), out)
    }

    /// Same, at an explicit fraction in [0, 1].
    pub fn display_at(&self, sim: &Simulation, t: f32, out: &mut Vec<Transform>) {
        let t = t.clamp(0.0, 1.0);
        out.clear();
        let curr = sim.transforms();
        out.reserve(curr.len());
        for (i, c) in curr.iter().enumerate() {
            match self.prev.get(i) {
                Some(p) => out.push(Transform {
                    position: p.position.lerp(c.position, t),
                    rotation: p.rotation.slerp(c.rotation, t).normalize(),
                    scale: p.scale + (c.scale - p.scale) * t,
                }),
                None => out.push(*c),
            }
        }
    }
}

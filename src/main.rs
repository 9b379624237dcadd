use instant::Instant;

use shoal::{sim, Params, Scheduler, Simulation};

/// Simulation tick interval (seconds).
const TICK_DELAY: f64 = 1.0 / 30.0;
/// Pretend presentation rate for the headless loop.
const FRAME_DELAY: f64 = 1.0 / 60.0;
/// How many fish to spawn on startup.
const INITIAL_FISH_COUNT: usize = 5000;
/// How long the demo runs (seconds).
const RUN_SECONDS: f64 = 20.0;
/// How often to log stats (seconds).
const STATS_LOG_INTERVAL: f64 = 5.0;

struct FrameStats {
    last_log_time: Instant,
    frames_since_log: u32,
    ticks_since_log: u32,
}

impl FrameStats {
    fn new() -> Self {
        Self {
            last_log_time: Instant::now(),
            frames_since_log: 0,
            ticks_since_log: 0,
        }
    }

    fn record(&mut self, ticks: u32, sim: &Simulation) {
        self.frames_since_log += 1;
        self.ticks_since_log += ticks;

        let elapsed = self.last_log_time.elapsed().as_secs_f64();
        if elapsed >= STATS_LOG_INTERVAL {
            let mut nodes = 0u32;
            let mut max_depth = 0usize;
            sim.index().visit_nodes(|_, depth, _| {
                nodes += 1;
                max_depth = max_depth.max(depth);
            });
            log::info!(
                "frames/s: {:.0} | ticks/s: {:.1} | fish: {} (indexed {}) | octree: {} nodes, depth {} | mean dist to goal: {:.2}",
                self.frames_since_log as f64 / elapsed,
                self.ticks_since_log as f64 / elapsed,
                sim.school().len(),
                sim.index().len(),
                nodes,
                max_depth,
                sim::mean_distance(sim.transforms(), sim.params().goal),
            );
            self.last_log_time = Instant::now();
            self.frames_since_log = 0;
            self.ticks_since_log = 0;
        }
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let params = Params::default();
    let mut simulation = Simulation::new(params)?;
    simulation.spawn(INITIAL_FISH_COUNT);

    let mut scheduler = Scheduler::new(TICK_DELAY);
    let mut stats = FrameStats::new();
    let mut display = Vec::new();

    let started = Instant::now();
    while started.elapsed().as_secs_f64() < RUN_SECONDS {
        let ticks = scheduler.advance(&mut simulation, Instant::now());

        // A renderer would consume these; here they just keep the
        // interpolation path honest.
        scheduler.display_transforms(&simulation, &mut display);

        stats.record(ticks, &simulation);
        std::thread::sleep(std::time::Duration::from_secs_f64(FRAME_DELAY));
    }
    log::info!(
        "done: {} ticks over {:.1}s",
        simulation.tick_count(),
        started.elapsed().as_secs_f64()
    );
    Ok(())
}

fn main() {
    env_logger::init();
    log::info!("shoal demo starting up");

    if let Err(e) = run() {
        log::error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

//! Run a morning-rush batch against the default building and print the
//! resulting metrics.
//!
//! Run with: cargo run -p lift_core --example scenario_run

use lift_core::engine::Engine;
use lift_core::runner::RuntimeEnv;
use lift_core::scenario::SimParams;

fn main() {
    env_logger::init();

    const SEED: u64 = 123;
    const RUSH_COUNT: usize = 50;
    const SIM_MINUTES: u64 = 10;

    let env = RuntimeEnv::from_env();
    let tick_ms = env.tick_interval_ms as f64;

    let mut engine = Engine::new(
        SimParams::default()
            .with_seed(SEED)
            .with_request_frequency(30.0),
    );
    engine.start();
    engine
        .spawn_scenario("morningRush", Some(RUSH_COUNT))
        .expect("scenario within limits");

    let ticks = SIM_MINUTES * 60 * 1000 / env.tick_interval_ms;
    for _ in 0..ticks {
        engine.tick(tick_ms);
    }

    let snapshot = engine.snapshot();
    let metrics = engine.metrics_snapshot();
    println!(
        "--- Morning rush ({RUSH_COUNT} requests, seed {SEED}, {SIM_MINUTES} min at {}ms ticks) ---",
        env.tick_interval_ms
    );
    println!("Sim time: {} s", snapshot.time / 1000);
    println!("Served: {}", metrics.served_count);
    println!("Pending: {}", metrics.pending_count);
    println!(
        "Waits: avg {:.1} s, max {:.1} s",
        metrics.avg_wait / 1000.0,
        metrics.max_wait as f64 / 1000.0
    );
    println!(
        "Travel: avg {:.1} s, max {:.1} s",
        metrics.avg_travel / 1000.0,
        metrics.max_travel as f64 / 1000.0
    );
    println!(
        "Utilization: {:.1}% cumulative, {:.1}% last minute",
        metrics.utilization * 100.0,
        metrics.recent_util * 100.0
    );
    println!("Throughput: {:.1}/min", metrics.throughput_per_min);

    for car in &snapshot.elevators {
        println!(
            "  {}  floor {:>2}  {:?}  {} aboard  route {:?}",
            car.id, car.current_floor, car.direction, car.passenger_count, car.route
        );
    }
}

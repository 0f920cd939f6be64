//! Tick driver: advances the virtual clock and runs the per-tick systems in
//! a fixed order — motion for every car (in id order), then dispatch, then
//! metrics, then snapshot emission, then the periodic spawner. The driver
//! inserts [TickDelta] before running the schedule so every system sees the
//! same elapsed time.

use bevy_ecs::prelude::{Resource, Schedule, World};
use bevy_ecs::schedule::IntoSystemConfigs;

use crate::clock::SimClock;
use crate::systems::{
    dispatch::dispatch_system, metrics::metrics_system, motion::motion_system,
    snapshot::snapshot_system, spawner::spawner_system,
};

/// Real and simulated elapsed time for the tick being processed.
#[derive(Debug, Clone, Copy, Resource)]
pub struct TickDelta {
    pub real_dt_ms: f64,
    pub sim_dt_ms: u64,
}

/// Whether the tick driver is currently ticking. Command handlers flip this;
/// systems read it (the snapshot payload reports it to observers).
#[derive(Debug, Default, Resource)]
pub struct EngineStatus {
    pub running: bool,
}

/// Run exactly one tick: advance the clock, publish the delta, run the
/// schedule. The body runs to completion without yielding; command handlers
/// are serialized against it by the caller.
pub fn run_tick(world: &mut World, schedule: &mut Schedule, real_dt_ms: f64) {
    let sim_dt_ms = world.resource_mut::<SimClock>().advance(real_dt_ms);
    world.insert_resource(TickDelta {
        real_dt_ms,
        sim_dt_ms,
    });
    schedule.run(world);
}

/// Build the per-tick schedule. The systems are chained: within a tick the
/// order is fixed and each system sees the previous one's writes.
pub fn simulation_schedule() -> Schedule {
    let mut schedule = Schedule::default();
    schedule.add_systems(
        (
            motion_system,
            dispatch_system,
            metrics_system,
            snapshot_system,
            spawner_system,
        )
            .chain(),
    );
    schedule
}

pub const DEV_TICK_INTERVAL_MS: u64 = 200;
pub const PROD_TICK_INTERVAL_MS: u64 = 1000;

/// Process-level runtime settings. `PORT` is parsed for the transport layer
/// sitting above this crate; `SIM_ENV=production` selects the slower
/// production tick rate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeEnv {
    pub tick_interval_ms: u64,
    pub port: Option<u16>,
}

impl RuntimeEnv {
    pub fn from_env() -> Self {
        let production = std::env::var("SIM_ENV")
            .map(|v| v == "production")
            .unwrap_or(false);
        let port = std::env::var("PORT").ok().and_then(|v| v.parse().ok());
        Self {
            tick_interval_ms: if production {
                PROD_TICK_INTERVAL_MS
            } else {
                DEV_TICK_INTERVAL_MS
            },
            port,
        }
    }
}

//! Virtual simulation clock: a monotone sim-ms counter advanced by the tick
//! driver, scaled by a speed multiplier. All timestamps in the engine (request
//! lifecycle, elevator statusSince, utilization samples) come from this clock;
//! wall-clock time only enters through the real-time tick interval.

use bevy_ecs::prelude::Resource;

pub const ONE_SEC_MS: u64 = 1000;
pub const ONE_MIN_MS: u64 = 60 * ONE_SEC_MS;
pub const ONE_DAY_MS: u64 = 24 * 60 * ONE_MIN_MS;

/// Morning-rush window, expressed as sim-time-of-day: [09:00, 09:30],
/// both endpoints included.
pub const MORNING_RUSH_START_MS: u64 = 9 * 60 * ONE_MIN_MS;
pub const MORNING_RUSH_END_MS: u64 = MORNING_RUSH_START_MS + 30 * ONE_MIN_MS;

#[derive(Debug, Resource)]
pub struct SimClock {
    now_ms: u64,
    speed: f64,
    /// Sub-millisecond remainder of the last advance, so fractional speeds
    /// do not lose sim time across ticks.
    carry_ms: f64,
}

impl Default for SimClock {
    fn default() -> Self {
        Self {
            now_ms: 0,
            speed: 1.0,
            carry_ms: 0.0,
        }
    }
}

impl SimClock {
    /// Current simulation time in sim-ms.
    pub fn now(&self) -> u64 {
        self.now_ms
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Replace the speed multiplier. Callers validate positivity at the
    /// command boundary; the clock itself only stores the value.
    pub fn set_speed(&mut self, speed: f64) {
        self.speed = speed;
    }

    /// Advance by `real_dt_ms` of wall time, scaled by the speed multiplier.
    /// Returns the simulated delta in whole sim-ms.
    pub fn advance(&mut self, real_dt_ms: f64) -> u64 {
        let scaled = real_dt_ms.max(0.0) * self.speed + self.carry_ms;
        let sim_dt = scaled.floor() as u64;
        self.carry_ms = scaled - sim_dt as f64;
        self.now_ms += sim_dt;
        sim_dt
    }

    /// Sim-ms elapsed since the start of the current simulated day.
    pub fn time_of_day_ms(&self) -> u64 {
        self.now_ms % ONE_DAY_MS
    }

    pub fn in_morning_rush(&self) -> bool {
        in_morning_rush(self.time_of_day_ms())
    }
}

/// Whether a sim-time-of-day falls inside the morning-rush window.
pub fn in_morning_rush(time_of_day_ms: u64) -> bool {
    (MORNING_RUSH_START_MS..=MORNING_RUSH_END_MS).contains(&time_of_day_ms)
}

//! Periodic request spawner: injects synthetic hall calls at a real-time
//! cadence while the engine is running. The firing interval derives from a
//! requests-per-minute frequency, floored so a very high frequency cannot
//! busy-loop the tick driver.

use bevy_ecs::prelude::Resource;
use rand::Rng;

pub const MIN_SPAWN_INTERVAL_MS: f64 = 200.0;

/// Probability that a morning-rush spawn originates at the lobby.
pub const RUSH_LOBBY_BIAS: f64 = 0.7;

#[derive(Debug, Default, Resource)]
pub struct RequestSpawner {
    freq_per_min: f64,
    elapsed_real_ms: f64,
}

impl RequestSpawner {
    pub fn with_frequency(freq_per_min: f64) -> Self {
        Self {
            freq_per_min: freq_per_min.max(0.0),
            elapsed_real_ms: 0.0,
        }
    }

    pub fn frequency(&self) -> f64 {
        self.freq_per_min
    }

    /// Replace the frequency and restart the interval accumulator.
    pub fn set_frequency(&mut self, freq_per_min: f64) {
        self.freq_per_min = freq_per_min.max(0.0);
        self.elapsed_real_ms = 0.0;
    }

    /// Real-ms between firings, or `None` when the spawner is off. The raw
    /// interval is floored to whole ms before the minimum clamp.
    pub fn interval_ms(&self) -> Option<f64> {
        if self.freq_per_min <= 0.0 {
            return None;
        }
        Some((60_000.0 / self.freq_per_min).floor().max(MIN_SPAWN_INTERVAL_MS))
    }

    /// Accumulate `real_dt_ms` of wall time; returns how many spawns are due.
    pub fn advance(&mut self, real_dt_ms: f64) -> usize {
        let Some(interval) = self.interval_ms() else {
            return 0;
        };
        self.elapsed_real_ms += real_dt_ms.max(0.0);
        let due = (self.elapsed_real_ms / interval).floor();
        self.elapsed_real_ms -= due * interval;
        due as usize
    }
}

/// Uniform random (origin, destination) pair with distinct floors in
/// `[1, n_floors]`.
pub fn random_hall_pair<R: Rng>(rng: &mut R, n_floors: u8) -> (u8, u8) {
    let origin = rng.gen_range(1..=n_floors);
    let mut destination = rng.gen_range(1..=n_floors);
    while destination == origin {
        destination = rng.gen_range(1..=n_floors);
    }
    (origin, destination)
}

/// Uniform random floor strictly above the lobby.
pub fn random_upper_floor<R: Rng>(rng: &mut R, n_floors: u8, lobby_floor: u8) -> u8 {
    if lobby_floor >= n_floors {
        return n_floors;
    }
    rng.gen_range(lobby_floor + 1..=n_floors)
}

//! Multi-criteria scoring for (elevator, request) candidate pairs.
//!
//! The scheduler scores every idle-car / unassigned-request pair and assigns
//! greedily from the best score down. Higher scores are better matches.
//!
//! # Scoring formula
//!
//! ```text
//! score = priority
//!       + same_floor_boost   (car already at the pickup floor and free to serve it)
//!       + nearby_boost       (one floor away)
//!       + direction_boost    (car already moving the request's way)
//!       − eta × eta_weight
//!       − |route| × target_penalty
//!       − occupancy penalty  (near-full or full car)
//!       − util_time × fairness_weight
//!       + escalation_bonus   (request escalated)
//! ```
//!
//! The invariant is the relative ordering of the terms
//! (full ≫ same-floor ≫ escalated ≫ near ≫ direction ≫ targets ≫ fairness),
//! not the absolute values; all of them are tunable through [ScoringWeights].

use bevy_ecs::prelude::Resource;

use crate::ecs::{Direction, Elevator};
use crate::requests::Request;

/// Weight block for the pair-scoring function. Insert as a resource; the
/// defaults below are the design baseline.
#[derive(Debug, Clone, Resource)]
pub struct ScoringWeights {
    /// Car is already at the pickup floor and idle (or about to stop there).
    pub same_floor_boost: f64,
    /// Car is exactly one floor from the pickup.
    pub nearby_boost: f64,
    /// Car direction matches the request's travel direction.
    pub direction_boost: f64,
    /// Penalty per sim-ms of estimated time to reach the pickup.
    pub eta_weight: f64,
    /// Penalty per already-scheduled route stop.
    pub target_penalty: f64,
    /// Penalty once the car is at or above 80% of capacity.
    pub occupancy_penalty_near: f64,
    /// Penalty for a full car; dominates every boost except nothing.
    pub occupancy_penalty_full: f64,
    /// Penalty per sim-ms of cumulative utilization, spreading load across
    /// the fleet.
    pub fairness_weight: f64,
    /// Flat bonus for escalated requests.
    pub escalation_bonus: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            same_floor_boost: 10_000.0,
            nearby_boost: 75.0,
            direction_boost: 20.0,
            eta_weight: 0.0015,
            target_penalty: 12.0,
            occupancy_penalty_near: 200.0,
            occupancy_penalty_full: 10_000.0,
            fairness_weight: 0.000_08,
            escalation_bonus: 5_000.0,
        }
    }
}

fn floor_distance(a: u8, b: u8) -> u64 {
    (i16::from(a) - i16::from(b)).unsigned_abs() as u64
}

/// Estimate the sim-ms for `car` to reach `pickup`, walking its scheduled
/// route in service order. Each intermediate stop costs a door dwell; travel
/// costs `time_per_floor_ms` per floor.
pub fn estimate_eta(car: &Elevator, pickup: u8, time_per_floor_ms: u64, door_dwell_ms: u64) -> u64 {
    if car.route.is_empty() {
        return floor_distance(car.current_floor, pickup) * time_per_floor_ms;
    }
    let mut cursor = car.current_floor;
    let mut total = 0;
    for &stop in &car.route {
        total += floor_distance(cursor, stop) * time_per_floor_ms;
        if stop == pickup {
            return total;
        }
        total += door_dwell_ms;
        cursor = stop;
    }
    total + floor_distance(cursor, pickup) * time_per_floor_ms
}

pub fn occupancy_penalty(car: &Elevator, weights: &ScoringWeights) -> f64 {
    let near_full = (f64::from(car.capacity) * 0.8).floor() as u8;
    if car.passenger_count >= car.capacity {
        weights.occupancy_penalty_full
    } else if car.passenger_count >= near_full {
        weights.occupancy_penalty_near
    } else {
        0.0
    }
}

/// Score a candidate pairing. `eta_ms` is the precomputed [estimate_eta]
/// for this pair.
pub fn score_pair(car: &Elevator, request: &Request, eta_ms: u64, weights: &ScoringWeights) -> f64 {
    let pickup = request.pickup_floor();
    let mut score = request.priority;

    let stopping_here = car.direction == Direction::Idle || car.route.first() == Some(&pickup);
    if car.current_floor == pickup && stopping_here {
        score += weights.same_floor_boost;
    }
    if floor_distance(car.current_floor, pickup) == 1 {
        score += weights.nearby_boost;
    }
    if let Some(direction) = request.travel_direction() {
        if car.direction == direction {
            score += weights.direction_boost;
        }
    }

    score -= eta_ms as f64 * weights.eta_weight;
    score -= car.route.len() as f64 * weights.target_penalty;
    score -= occupancy_penalty(car, weights);
    score -= car.util_time_ms as f64 * weights.fairness_weight;

    if request.escalated {
        score += weights.escalation_bonus;
    }
    score
}

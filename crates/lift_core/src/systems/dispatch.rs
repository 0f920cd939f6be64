//! Hybrid dispatch scheduler, invoked once per tick after motion.
//!
//! Three passes: refresh every pending request's dynamic priority (waiting
//! time, escalation, morning-rush multiplier), then solve a greedy global
//! assignment over the idle cars, then batch pickups that lie on a busy
//! car's current trajectory.

use bevy_ecs::prelude::{Mut, Query, Res, ResMut};

use crate::clock::{in_morning_rush, SimClock, ONE_DAY_MS};
use crate::ecs::{Direction, Elevator};
use crate::requests::RequestBook;
use crate::scenario::SimParams;
use crate::scoring::{estimate_eta, score_pair, ScoringWeights};

/// Priority gained per sim-ms of waiting.
pub const WAIT_PRIORITY_RATE: f64 = 0.001;
/// Waiting time after which a request escalates, irreversibly.
pub const ESCALATION_THRESHOLD_MS: u64 = 30_000;
/// Flat priority added to escalated requests on every refresh.
pub const ESCALATION_PRIORITY_BONUS: f64 = 2000.0;
/// Multiplier for lobby-origin requests inside the morning-rush window.
pub const MORNING_RUSH_MULTIPLIER: f64 = 1.5;

pub fn dispatch_system(
    clock: Res<SimClock>,
    params: Res<SimParams>,
    weights: Res<ScoringWeights>,
    mut book: ResMut<RequestBook>,
    mut cars: Query<&mut Elevator>,
) {
    let now = clock.now();
    refresh_priorities(&mut book, now, &params);

    let mut cars: Vec<_> = cars.iter_mut().collect();
    cars.sort_by(|a, b| a.id.cmp(&b.id));
    assign_idle(&mut cars, &mut book, &params, &weights);
    batch_busy(&mut cars, &mut book);
}

/// Recompute every pending request's dynamic priority from its waiting time.
/// Escalation is a one-way latch; the bonus re-applies on each refresh so it
/// survives the recomputation from base priority.
pub fn refresh_priorities(book: &mut RequestBook, now: u64, params: &SimParams) {
    let rush_window = in_morning_rush(now % ONE_DAY_MS);
    for request in book.pending.iter_mut() {
        let waited = now.saturating_sub(request.created_at_ms);
        request.priority = request.base_priority + waited as f64 * WAIT_PRIORITY_RATE;
        if !request.escalated && waited >= ESCALATION_THRESHOLD_MS {
            request.escalated = true;
        }
        if request.escalated {
            request.priority += ESCALATION_PRIORITY_BONUS;
        }
        if (rush_window || request.morning_rush) && request.origin == Some(params.lobby_floor) {
            request.priority *= MORNING_RUSH_MULTIPLIER;
        }
    }
}

struct Candidate {
    car_idx: usize,
    req_idx: usize,
    score: f64,
    eta_ms: u64,
    escalated: bool,
    util_time_ms: u64,
}

/// Greedy global assignment over the idle cars: score every
/// (idle car, unassigned request) pair, sort escalated-first / score /
/// eta / fairness, then take pairs while respecting projected capacity.
fn assign_idle(
    cars: &mut [Mut<Elevator>],
    book: &mut RequestBook,
    params: &SimParams,
    weights: &ScoringWeights,
) {
    let idle: Vec<usize> = (0..cars.len()).filter(|&i| cars[i].route.is_empty()).collect();
    let unassigned: Vec<usize> = book
        .pending
        .iter()
        .enumerate()
        .filter(|(_, r)| r.is_assignable())
        .map(|(i, _)| i)
        .collect();
    if idle.is_empty() || unassigned.is_empty() {
        return;
    }

    let mut candidates = Vec::with_capacity(idle.len() * unassigned.len());
    for &car_idx in &idle {
        for &req_idx in &unassigned {
            let request = &book.pending[req_idx];
            let eta_ms = estimate_eta(
                &cars[car_idx],
                request.pickup_floor(),
                params.time_per_floor_ms,
                params.door_dwell_ms,
            );
            candidates.push(Candidate {
                car_idx,
                req_idx,
                score: score_pair(&cars[car_idx], request, eta_ms, weights),
                eta_ms,
                escalated: request.escalated,
                util_time_ms: cars[car_idx].util_time_ms,
            });
        }
    }
    // Stable sort; equal candidates keep generation order (car id, then
    // request submission order), so the pass is deterministic.
    candidates.sort_by(|a, b| {
        b.escalated
            .cmp(&a.escalated)
            .then(b.score.total_cmp(&a.score))
            .then(a.eta_ms.cmp(&b.eta_ms))
            .then(a.util_time_ms.cmp(&b.util_time_ms))
    });

    let mut car_taken = vec![false; cars.len()];
    let mut req_taken = vec![false; book.pending.len()];
    for candidate in &candidates {
        if car_taken[candidate.car_idx] || req_taken[candidate.req_idx] {
            continue;
        }
        if projected_load(&cars[candidate.car_idx], book) >= cars[candidate.car_idx].capacity as usize
        {
            continue;
        }
        let (origin, destination) = {
            let request = &book.pending[candidate.req_idx];
            (request.origin, request.destination)
        };
        let car = &mut cars[candidate.car_idx];
        book.pending[candidate.req_idx].assigned_to = Some(car.id.clone());
        if let Some(origin) = origin {
            car.push_target(origin);
        }
        car.push_target(destination);
        car_taken[candidate.car_idx] = true;
        req_taken[candidate.req_idx] = true;
    }
}

/// Passengers aboard plus requests already bound to this car that have not
/// boarded yet — including ones bound earlier in the current pass.
fn projected_load(car: &Elevator, book: &RequestBook) -> usize {
    let committed = book
        .pending
        .iter()
        .filter(|r| r.assigned_to.as_deref() == Some(car.id.as_str()) && r.pickup_at_ms.is_none())
        .count();
    car.passenger_count as usize + committed
}

/// Intra-trip batching: a moving car picks up requests whose pickup floor
/// lies strictly inside its remaining trajectory, capacity permitting.
fn batch_busy(cars: &mut [Mut<Elevator>], book: &mut RequestBook) {
    for car in cars.iter_mut() {
        if car.route.is_empty() {
            continue;
        }
        let (low, high) = match car.direction {
            Direction::Up => match car.route.iter().max() {
                Some(&top) => (car.current_floor, top),
                None => continue,
            },
            Direction::Down => match car.route.iter().min() {
                Some(&bottom) => (bottom, car.current_floor),
                None => continue,
            },
            Direction::Idle => continue,
        };
        for request in book.pending.iter_mut() {
            if !request.is_assignable() {
                continue;
            }
            let pickup = request.pickup_floor();
            if pickup > low && pickup < high && car.passenger_count < car.capacity {
                request.assigned_to = Some(car.id.clone());
                car.route.push(pickup);
            }
        }
        car.dedup_route();
    }
}

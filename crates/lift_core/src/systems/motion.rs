//! Elevator motion and door state machine, stepped once per tick with the
//! simulated delta. Arrival at the head of the route opens the door and runs
//! the pickup/dropoff sweeps over the pending set.

use bevy_ecs::prelude::{Query, Res, ResMut};

use crate::clock::SimClock;
use crate::ecs::{Direction, DoorState, Elevator};
use crate::requests::RequestBook;
use crate::runner::TickDelta;
use crate::scenario::SimParams;

pub fn motion_system(
    clock: Res<SimClock>,
    params: Res<SimParams>,
    delta: Res<TickDelta>,
    mut cars: Query<&mut Elevator>,
    mut book: ResMut<RequestBook>,
) {
    let now = clock.now();
    let mut cars: Vec<_> = cars.iter_mut().collect();
    cars.sort_by(|a, b| a.id.cmp(&b.id));
    for car in cars.iter_mut() {
        step_elevator(car, delta.sim_dt_ms, now, &params, &mut book);
    }
}

/// Advance one car by `sim_dt_ms`. Exactly one of the following happens:
/// the door dwell gate holds the car, the door closes, the car goes idle,
/// the car arrives at its head-of-route target, or the car travels.
pub fn step_elevator(
    car: &mut Elevator,
    sim_dt_ms: u64,
    now: u64,
    params: &SimParams,
    book: &mut RequestBook,
) {
    if car.door == DoorState::Open {
        // Boarding time: nothing moves until the dwell has elapsed.
        if now.saturating_sub(car.status_since_ms) < params.door_dwell_ms {
            return;
        }
        car.door = DoorState::Closed;
        car.status_since_ms = now;
    }

    if car.route.is_empty() {
        if car.direction != Direction::Idle {
            car.direction = Direction::Idle;
            car.status_since_ms = now;
        }
        return;
    }

    let target = car.route[0];
    if car.current_floor == target {
        car.door = DoorState::Open;
        car.status_since_ms = now;
        handle_arrival(car, now, book);
        car.route.remove(0);
        return;
    }

    car.move_accum_ms += sim_dt_ms;
    let floors_to_move = car.move_accum_ms / params.time_per_floor_ms;
    if floors_to_move == 0 {
        car.direction = car.direction_toward(target);
        return;
    }
    for _ in 0..floors_to_move {
        car.direction = car.direction_toward(target);
        match car.direction {
            Direction::Up => car.current_floor += 1,
            Direction::Down => car.current_floor -= 1,
            Direction::Idle => break,
        }
        if car.current_floor == target {
            break;
        }
    }
    car.move_accum_ms %= params.time_per_floor_ms;
    car.status_since_ms = now;
}

/// Arrival sweeps over the pending set: board waiting passengers first,
/// then let arriving passengers off. A waiting passenger facing a full car
/// loses its assignment and re-enters the unassigned pool.
fn handle_arrival(car: &mut Elevator, now: u64, book: &mut RequestBook) {
    let floor = car.current_floor;

    for request in book.pending.iter_mut() {
        let boarding = request.assigned_to.as_deref() == Some(car.id.as_str())
            && request.origin == Some(floor)
            && request.pickup_at_ms.is_none();
        if !boarding {
            continue;
        }
        if car.passenger_count < car.capacity {
            request.pickup_at_ms = Some(now);
            car.passenger_count += 1;
            car.push_target(request.destination);
        } else {
            request.assigned_to = None;
        }
    }

    let mut i = 0;
    while i < book.pending.len() {
        let request = &book.pending[i];
        let leaving = request.assigned_to.as_deref() == Some(car.id.as_str())
            && request.destination == floor
            && request.pickup_at_ms.is_some()
            && request.dropoff_at_ms.is_none();
        if leaving {
            let mut request = book.pending.remove(i);
            request.dropoff_at_ms = Some(now);
            car.passenger_count = car.passenger_count.saturating_sub(1);
            book.served.push(request);
        } else {
            i += 1;
        }
    }
}

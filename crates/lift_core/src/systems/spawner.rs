//! Periodic spawner system: fires the request spawner on real elapsed time
//! and submits the generated hall calls. Runs last in the tick so requests
//! born during tick N enter the scheduler in tick N+1.

use bevy_ecs::prelude::{Res, ResMut};
use rand::Rng;

use crate::clock::SimClock;
use crate::requests::{Request, RequestBook};
use crate::runner::{EngineStatus, TickDelta};
use crate::scenario::{SimParams, SimRng};
use crate::spawner::{random_hall_pair, random_upper_floor, RequestSpawner, RUSH_LOBBY_BIAS};

pub fn spawner_system(
    clock: Res<SimClock>,
    status: Res<EngineStatus>,
    params: Res<SimParams>,
    delta: Res<TickDelta>,
    mut spawner: ResMut<RequestSpawner>,
    mut rng: ResMut<SimRng>,
    mut book: ResMut<RequestBook>,
) {
    if !status.running {
        return;
    }
    let due = spawner.advance(delta.real_dt_ms);
    for _ in 0..due {
        let request = if clock.in_morning_rush() && rng.0.gen_bool(RUSH_LOBBY_BIAS) {
            let destination = random_upper_floor(&mut rng.0, params.n_floors, params.lobby_floor);
            let id = rng.request_id();
            Request::hall(id, clock.now(), params.lobby_floor, destination)
        } else {
            let (origin, destination) = random_hall_pair(&mut rng.0, params.n_floors);
            let id = rng.request_id();
            Request::hall(id, clock.now(), origin, destination)
        };
        book.submit(request);
    }
}

//! Per-tick metrics upkeep: accrue utilization time on occupied cars and
//! push one sample into the sliding window.

use bevy_ecs::prelude::{Query, Res, ResMut};

use crate::clock::SimClock;
use crate::ecs::Elevator;
use crate::requests::RequestBook;
use crate::runner::TickDelta;
use crate::telemetry::{UtilSample, UtilizationWindow};

pub fn metrics_system(
    clock: Res<SimClock>,
    delta: Res<TickDelta>,
    mut cars: Query<&mut Elevator>,
    book: Res<RequestBook>,
    mut window: ResMut<UtilizationWindow>,
) {
    let mut total_util_ms = 0;
    for mut car in cars.iter_mut() {
        if car.passenger_count > 0 {
            car.util_time_ms += delta.sim_dt_ms;
        }
        total_util_ms += car.util_time_ms;
    }
    window.push_sample(UtilSample {
        ts_ms: clock.now(),
        total_util_ms,
        served_count: book.served_count() as u64,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::{run_tick, simulation_schedule};
    use crate::scenario::{build_world, SimParams};
    use bevy_ecs::prelude::World;

    #[test]
    fn util_time_accrues_only_with_passengers() {
        let mut world = World::new();
        build_world(&mut world, &SimParams::default());
        let mut schedule = simulation_schedule();

        run_tick(&mut world, &mut schedule, 200.0);
        let mut query = world.query::<&Elevator>();
        assert!(query.iter(&world).all(|car| car.util_time_ms == 0));

        {
            let mut query = world.query::<&mut Elevator>();
            let mut car = query.iter_mut(&mut world).next().expect("car");
            car.passenger_count = 1;
        }
        run_tick(&mut world, &mut schedule, 200.0);
        let mut query = world.query::<&Elevator>();
        let with_util: Vec<u64> = query.iter(&world).map(|car| car.util_time_ms).collect();
        assert!(with_util.contains(&200));
    }

    #[test]
    fn each_tick_pushes_one_sample() {
        let mut world = World::new();
        build_world(&mut world, &SimParams::default());
        let mut schedule = simulation_schedule();

        for _ in 0..5 {
            run_tick(&mut world, &mut schedule, 200.0);
        }
        assert_eq!(world.resource::<UtilizationWindow>().sample_count(), 5);
    }
}

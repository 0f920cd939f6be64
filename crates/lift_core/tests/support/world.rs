#![allow(dead_code)]

use bevy_ecs::prelude::{Schedule, World};
use uuid::Uuid;

use lift_core::ecs::Elevator;
use lift_core::requests::{Request, RequestBook};
use lift_core::runner::{run_tick, simulation_schedule, EngineStatus};
use lift_core::scenario::{build_world, SimParams};

pub const TICK_MS: f64 = 200.0;

/// Builder for reproducible simulation worlds used across the integration
/// suites.
#[derive(Debug, Clone)]
pub struct TestWorldBuilder {
    params: SimParams,
    running: bool,
}

impl Default for TestWorldBuilder {
    fn default() -> Self {
        Self {
            params: SimParams::default().with_seed(42),
            running: true,
        }
    }
}

impl TestWorldBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.params = self.params.with_seed(seed);
        self
    }

    pub fn with_fleet(mut self, n_elevators: usize) -> Self {
        self.params = self.params.with_fleet(n_elevators);
        self
    }

    pub fn with_params(mut self, params: SimParams) -> Self {
        self.params = params;
        self
    }

    pub fn stopped(mut self) -> Self {
        self.running = false;
        self
    }

    pub fn build(self) -> (World, Schedule) {
        let mut world = World::new();
        build_world(&mut world, &self.params);
        world.resource_mut::<EngineStatus>().running = self.running;
        (world, simulation_schedule())
    }
}

/// Run `n` ticks of the default real-time interval.
pub fn tick_n(world: &mut World, schedule: &mut Schedule, n: usize) {
    for _ in 0..n {
        run_tick(world, schedule, TICK_MS);
    }
}

/// Submit a hall call with a test-local id.
pub fn submit_hall(world: &mut World, id: u128, origin: u8, destination: u8) {
    let now = world.resource::<lift_core::clock::SimClock>().now();
    world
        .resource_mut::<RequestBook>()
        .submit(Request::hall(Uuid::from_u128(id), now, origin, destination));
}

/// Fetch a car by id, cloned out of the world.
pub fn car(world: &mut World, id: &str) -> Elevator {
    let mut query = world.query::<&Elevator>();
    query
        .iter(world)
        .find(|car| car.id == id)
        .unwrap_or_else(|| panic!("no elevator {id}"))
        .clone()
}

/// All cars, sorted by id.
pub fn fleet(world: &mut World) -> Vec<Elevator> {
    let mut query = world.query::<&Elevator>();
    let mut cars: Vec<Elevator> = query.iter(world).cloned().collect();
    cars.sort_by(|a, b| a.id.cmp(&b.id));
    cars
}

//! Simulation parameters, world construction and one-shot scenario batches.

use bevy_ecs::prelude::{Resource, World};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use uuid::Uuid;

use crate::broadcast::Subscribers;
use crate::clock::SimClock;
use crate::ecs::Elevator;
use crate::requests::{Request, RequestBook};
use crate::runner::EngineStatus;
use crate::scoring::ScoringWeights;
use crate::spawner::{random_hall_pair, random_upper_floor, RequestSpawner};
use crate::telemetry::{SimSnapshots, UtilizationWindow};

/// Largest batch a scenario command may insert.
pub const MAX_SCENARIO_COUNT: usize = 250;

/// Building and timing parameters. Immutable while the engine is running;
/// `reconfig` rebuilds the world from a fresh copy.
#[derive(Debug, Clone, Resource)]
pub struct SimParams {
    pub n_elevators: usize,
    pub n_floors: u8,
    pub time_per_floor_ms: u64,
    pub door_dwell_ms: u64,
    pub lobby_floor: u8,
    pub capacity: u8,
    /// Periodic spawner frequency; 0 disables it.
    pub request_freq_per_min: f64,
    /// Seed for the engine RNG. `None` falls back to 0, keeping runs
    /// reproducible by default.
    pub seed: Option<u64>,
    pub snapshot_ring_capacity: usize,
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            n_elevators: 3,
            n_floors: 12,
            time_per_floor_ms: 1000,
            door_dwell_ms: 2000,
            lobby_floor: 1,
            capacity: 6,
            request_freq_per_min: 0.0,
            seed: None,
            snapshot_ring_capacity: 64,
        }
    }
}

impl SimParams {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_fleet(mut self, n_elevators: usize) -> Self {
        self.n_elevators = n_elevators;
        self
    }

    pub fn with_floors(mut self, n_floors: u8) -> Self {
        self.n_floors = n_floors;
        self
    }

    pub fn with_capacity(mut self, capacity: u8) -> Self {
        self.capacity = capacity;
        self
    }

    /// Travel time per floor and door dwell, both in sim-ms.
    pub fn with_timing(mut self, time_per_floor_ms: u64, door_dwell_ms: u64) -> Self {
        self.time_per_floor_ms = time_per_floor_ms;
        self.door_dwell_ms = door_dwell_ms;
        self
    }

    pub fn with_request_frequency(mut self, freq_per_min: f64) -> Self {
        self.request_freq_per_min = freq_per_min;
        self
    }
}

/// The engine's single seedable generator. Every random draw (spawner,
/// scenario batches, request ids) goes through this resource, which is what
/// makes fixed-seed runs bit-reproducible.
#[derive(Debug, Resource)]
pub struct SimRng(pub StdRng);

impl SimRng {
    pub fn from_params(params: &SimParams) -> Self {
        Self(StdRng::seed_from_u64(params.seed.unwrap_or(0)))
    }

    pub fn request_id(&mut self) -> Uuid {
        Uuid::from_u128(self.0.gen())
    }
}

/// Insert every engine resource and spawn the fleet. All cars start at the
/// lobby floor, idle, doors closed.
pub fn build_world(world: &mut World, params: &SimParams) {
    world.insert_resource(SimClock::default());
    world.insert_resource(SimRng::from_params(params));
    world.insert_resource(RequestBook::default());
    world.insert_resource(ScoringWeights::default());
    world.insert_resource(UtilizationWindow::default());
    world.insert_resource(SimSnapshots::with_capacity(params.snapshot_ring_capacity));
    world.insert_resource(RequestSpawner::with_frequency(params.request_freq_per_min));
    world.insert_resource(EngineStatus::default());
    world.insert_resource(Subscribers::default());
    for i in 0..params.n_elevators {
        world.spawn(Elevator::new(
            format!("lift-{}", i + 1),
            params.lobby_floor,
            params.capacity,
        ));
    }
    world.insert_resource(params.clone());
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioKind {
    MorningRush,
    RandomBurst,
    /// Unrecognized scenario names fall back to a small uniform batch.
    Fallback,
}

impl ScenarioKind {
    pub fn from_name(name: &str) -> Self {
        match name {
            "morningRush" => Self::MorningRush,
            "randomBurst" => Self::RandomBurst,
            _ => Self::Fallback,
        }
    }

    pub fn default_count(self) -> usize {
        match self {
            Self::MorningRush => 50,
            Self::RandomBurst => 100,
            Self::Fallback => 10,
        }
    }
}

/// Generate a one-shot request batch. Morning-rush batches bias 70% of the
/// requests to lobby → upper floor and flag them so the scheduler applies
/// the rush multiplier regardless of sim time of day.
pub fn scenario_batch(
    kind: ScenarioKind,
    count: usize,
    params: &SimParams,
    rng: &mut SimRng,
    now_ms: u64,
) -> Vec<Request> {
    let mut batch = Vec::with_capacity(count);
    match kind {
        ScenarioKind::MorningRush => {
            let biased = (count as f64 * 0.7).ceil() as usize;
            for _ in 0..biased {
                let destination = random_upper_floor(&mut rng.0, params.n_floors, params.lobby_floor);
                let id = rng.request_id();
                let mut request = Request::hall(id, now_ms, params.lobby_floor, destination);
                request.morning_rush = true;
                batch.push(request);
            }
            for _ in biased..count {
                let (origin, destination) = random_hall_pair(&mut rng.0, params.n_floors);
                let id = rng.request_id();
                batch.push(Request::hall(id, now_ms, origin, destination));
            }
        }
        ScenarioKind::RandomBurst | ScenarioKind::Fallback => {
            for _ in 0..count {
                let (origin, destination) = random_hall_pair(&mut rng.0, params.n_floors);
                let id = rng.request_id();
                batch.push(Request::hall(id, now_ms, origin, destination));
            }
        }
    }
    batch
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_world_spawns_fleet_at_lobby() {
        let params = SimParams::default();
        let mut world = World::new();
        build_world(&mut world, &params);

        let mut query = world.query::<&Elevator>();
        let mut cars: Vec<&Elevator> = query.iter(&world).collect();
        cars.sort_by(|a, b| a.id.cmp(&b.id));
        assert_eq!(cars.len(), 3);
        assert_eq!(cars[0].id, "lift-1");
        assert_eq!(cars[2].id, "lift-3");
        for car in cars {
            assert_eq!(car.current_floor, params.lobby_floor);
            assert!(car.is_idle());
            assert_eq!(car.capacity, 6);
        }
        assert_eq!(world.resource::<SimClock>().now(), 0);
        assert_eq!(world.resource::<RequestBook>().pending_count(), 0);
    }

    #[test]
    fn scenario_names_map_to_kinds() {
        assert_eq!(ScenarioKind::from_name("morningRush"), ScenarioKind::MorningRush);
        assert_eq!(ScenarioKind::from_name("randomBurst"), ScenarioKind::RandomBurst);
        assert_eq!(ScenarioKind::from_name("lunchtime"), ScenarioKind::Fallback);
        assert_eq!(ScenarioKind::Fallback.default_count(), 10);
    }

    #[test]
    fn morning_rush_batch_biases_lobby_origins() {
        let params = SimParams::default();
        let mut rng = SimRng::from_params(&params.clone().with_seed(11));
        let batch = scenario_batch(ScenarioKind::MorningRush, 50, &params, &mut rng, 0);
        assert_eq!(batch.len(), 50);
        let flagged = batch.iter().filter(|r| r.morning_rush).count();
        assert_eq!(flagged, 35); // ceil(0.7 × 50)
        for request in batch.iter().take(flagged) {
            assert_eq!(request.origin, Some(params.lobby_floor));
            assert!(request.destination > params.lobby_floor);
        }
        for request in &batch {
            assert_ne!(request.origin, Some(request.destination));
        }
    }

    #[test]
    fn random_burst_batch_is_uniform_pairs() {
        let params = SimParams::default();
        let mut rng = SimRng::from_params(&params.clone().with_seed(11));
        let batch = scenario_batch(ScenarioKind::RandomBurst, 100, &params, &mut rng, 500);
        assert_eq!(batch.len(), 100);
        for request in &batch {
            assert_eq!(request.created_at_ms, 500);
            assert!(!request.morning_rush);
            assert_ne!(request.origin, Some(request.destination));
        }
    }

    #[test]
    fn same_seed_produces_identical_batches() {
        let params = SimParams::default().with_seed(42);
        let mut rng_a = SimRng::from_params(&params);
        let mut rng_b = SimRng::from_params(&params);
        let a = scenario_batch(ScenarioKind::RandomBurst, 20, &params, &mut rng_a, 0);
        let b = scenario_batch(ScenarioKind::RandomBurst, 20, &params, &mut rng_b, 0);
        let ids_a: Vec<Uuid> = a.iter().map(|r| r.id).collect();
        let ids_b: Vec<Uuid> = b.iter().map(|r| r.id).collect();
        assert_eq!(ids_a, ids_b);
        let pairs_a: Vec<(Option<u8>, u8)> = a.iter().map(|r| (r.origin, r.destination)).collect();
        let pairs_b: Vec<(Option<u8>, u8)> = b.iter().map(|r| (r.origin, r.destination)).collect();
        assert_eq!(pairs_a, pairs_b);
    }
}

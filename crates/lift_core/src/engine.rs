//! Engine handle: owns the simulation world and schedule and exposes the
//! command surface. All commands mutate through `&mut self`, so any caller
//! that serializes access to the engine (see [crate::driver]) gets the
//! tick-atomic command semantics for free.

use bevy_ecs::prelude::World;
use bevy_ecs::schedule::Schedule;
use crossbeam_channel::Sender;
use thiserror::Error;

use crate::broadcast::{PushMessage, Subscribers};
use crate::clock::SimClock;
use crate::ecs::Elevator;
use crate::requests::{Request, RequestBook, RequestKind};
use crate::runner::{run_tick, simulation_schedule, EngineStatus};
use crate::scenario::{
    build_world, scenario_batch, ScenarioKind, SimParams, SimRng, MAX_SCENARIO_COUNT,
};
use crate::spawner::RequestSpawner;
use crate::telemetry::{
    metrics_report, snapshot_from_parts, MetricsReport, SimSnapshot, UtilizationWindow,
};

/// Command-boundary failure. Every variant maps to one machine-readable
/// error kind; the `Display` form is the human-readable message.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("elevator {0} is at capacity")]
    Full(String),
    #[error("unknown elevator {0}")]
    NotFound(String),
    #[error("invalid state: {0}")]
    State(String),
}

impl CommandError {
    /// Stable tag for reply framing, alongside the `Display` message.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::Full(_) => "FULL",
            Self::NotFound(_) => "NOT_FOUND",
            Self::State(_) => "STATE",
        }
    }
}

/// Manual request submission payload.
#[derive(Debug, Clone)]
pub struct NewRequest {
    pub kind: RequestKind,
    pub origin: Option<u8>,
    pub destination: u8,
    /// Target car for cab calls.
    pub elevator_id: Option<String>,
    pub morning_rush: bool,
}

impl NewRequest {
    pub fn hall(origin: u8, destination: u8) -> Self {
        Self {
            kind: RequestKind::Hall,
            origin: Some(origin),
            destination,
            elevator_id: None,
            morning_rush: false,
        }
    }

    pub fn cab(elevator_id: impl Into<String>, destination: u8) -> Self {
        Self {
            kind: RequestKind::Cab,
            origin: None,
            destination,
            elevator_id: Some(elevator_id.into()),
            morning_rush: false,
        }
    }
}

pub struct Engine {
    world: World,
    schedule: Schedule,
    params: SimParams,
}

impl Engine {
    pub fn new(params: SimParams) -> Self {
        let mut world = World::new();
        build_world(&mut world, &params);
        Self {
            world,
            schedule: simulation_schedule(),
            params,
        }
    }

    pub fn params(&self) -> &SimParams {
        &self.params
    }

    pub fn is_running(&self) -> bool {
        self.world.resource::<EngineStatus>().running
    }

    /// Begin ticking. Idempotent; the world is already initialized by
    /// construction.
    pub fn start(&mut self) {
        self.world.resource_mut::<EngineStatus>().running = true;
    }

    /// Halt ticking and the periodic spawner. Idempotent.
    pub fn stop(&mut self) {
        self.world.resource_mut::<EngineStatus>().running = false;
    }

    /// Stop, rebuild the world from the current parameters and emit one
    /// snapshot. Subscribers survive the rebuild.
    pub fn reset(&mut self) {
        let subscribers = self
            .world
            .remove_resource::<Subscribers>()
            .unwrap_or_default();
        let mut world = World::new();
        build_world(&mut world, &self.params);
        world.insert_resource(subscribers);
        self.world = world;
        self.schedule = simulation_schedule();

        let snapshot = self.snapshot();
        self.world
            .resource_mut::<Subscribers>()
            .broadcast(PushMessage::Snapshot { data: snapshot });
    }

    /// Update the clock speed; takes effect on the next tick.
    pub fn set_speed(&mut self, speed: f64) -> Result<(), CommandError> {
        if !speed.is_finite() || speed <= 0.0 {
            return Err(CommandError::InvalidInput(format!(
                "speed must be a positive number, got {speed}"
            )));
        }
        self.world.resource_mut::<SimClock>().set_speed(speed);
        Ok(())
    }

    /// Replace the parameters and reinitialize. Only legal while stopped.
    pub fn reconfig(&mut self, params: SimParams) -> Result<(), CommandError> {
        if self.is_running() {
            return Err(CommandError::State(
                "reconfig requires a stopped engine".to_string(),
            ));
        }
        self.params = params;
        self.reset();
        Ok(())
    }

    /// Configure the periodic spawner frequency (requests per minute).
    pub fn set_request_frequency(&mut self, freq_per_min: f64) -> Result<(), CommandError> {
        if !freq_per_min.is_finite() || freq_per_min < 0.0 {
            return Err(CommandError::InvalidInput(format!(
                "request frequency must be non-negative, got {freq_per_min}"
            )));
        }
        self.params.request_freq_per_min = freq_per_min;
        self.world.resource_mut::<SimParams>().request_freq_per_min = freq_per_min;
        self.world
            .resource_mut::<RequestSpawner>()
            .set_frequency(freq_per_min);
        Ok(())
    }

    /// Submit a manual request. Hall calls join the unassigned pool; cab
    /// calls take the fast path onto the named car (the passenger is
    /// already aboard) or fail without mutating anything.
    pub fn add_manual_request(&mut self, new: NewRequest) -> Result<Request, CommandError> {
        let n_floors = self.params.n_floors;
        let floor_ok = |floor: u8| (1..=n_floors).contains(&floor);
        if !floor_ok(new.destination) {
            return Err(CommandError::InvalidInput(format!(
                "destination floor {} outside [1, {n_floors}]",
                new.destination
            )));
        }
        if let Some(origin) = new.origin {
            if !floor_ok(origin) {
                return Err(CommandError::InvalidInput(format!(
                    "origin floor {origin} outside [1, {n_floors}]"
                )));
            }
        }

        match new.kind {
            RequestKind::Hall => {
                let origin = new.origin.ok_or_else(|| {
                    CommandError::InvalidInput("hall call requires an origin floor".to_string())
                })?;
                if origin == new.destination {
                    return Err(CommandError::InvalidInput(
                        "origin and destination must differ".to_string(),
                    ));
                }
                let now = self.world.resource::<SimClock>().now();
                let id = self.world.resource_mut::<SimRng>().request_id();
                let mut request = Request::hall(id, now, origin, new.destination);
                request.morning_rush = new.morning_rush;
                self.world
                    .resource_mut::<RequestBook>()
                    .submit(request.clone());
                Ok(request)
            }
            RequestKind::Cab => {
                let elevator_id = new.elevator_id.ok_or_else(|| {
                    CommandError::InvalidInput("cab call requires an elevator id".to_string())
                })?;
                let now = self.world.resource::<SimClock>().now();
                let id = self.world.resource_mut::<SimRng>().request_id();

                let mut query = self.world.query::<&mut Elevator>();
                let mut boarded = false;
                for mut car in query.iter_mut(&mut self.world) {
                    if car.id != elevator_id {
                        continue;
                    }
                    if car.is_full() {
                        return Err(CommandError::Full(elevator_id));
                    }
                    car.passenger_count += 1;
                    car.push_target(new.destination);
                    boarded = true;
                    break;
                }
                if !boarded {
                    return Err(CommandError::NotFound(elevator_id));
                }

                let mut request = Request::cab(id, now, new.destination);
                request.morning_rush = new.morning_rush;
                request.assigned_to = Some(elevator_id);
                request.pickup_at_ms = Some(now);
                self.world
                    .resource_mut::<RequestBook>()
                    .submit(request.clone());
                Ok(request)
            }
        }
    }

    /// Insert a one-shot scenario batch. Returns the number of requests
    /// inserted.
    pub fn spawn_scenario(
        &mut self,
        name: &str,
        count: Option<usize>,
    ) -> Result<usize, CommandError> {
        let kind = ScenarioKind::from_name(name);
        let count = count.unwrap_or_else(|| kind.default_count());
        if count > MAX_SCENARIO_COUNT {
            return Err(CommandError::InvalidInput(format!(
                "scenario count {count} exceeds the limit of {MAX_SCENARIO_COUNT}"
            )));
        }
        let now = self.world.resource::<SimClock>().now();
        let params = self.params.clone();
        let batch = {
            let mut rng = self.world.resource_mut::<SimRng>();
            scenario_batch(kind, count, &params, &mut rng, now)
        };
        let inserted = batch.len();
        let mut book = self.world.resource_mut::<RequestBook>();
        for request in batch {
            book.submit(request);
        }
        Ok(inserted)
    }

    /// Defensive deep copy of the visible engine state.
    pub fn snapshot(&mut self) -> SimSnapshot {
        let now = self.world.resource::<SimClock>().now();
        let running = self.is_running();
        let mut query = self.world.query::<&Elevator>();
        let cars: Vec<&Elevator> = query.iter(&self.world).collect();
        let book = self.world.resource::<RequestBook>();
        snapshot_from_parts(now, running, cars, &book.pending)
    }

    pub fn metrics_snapshot(&mut self) -> MetricsReport {
        let now = self.world.resource::<SimClock>().now();
        let mut query = self.world.query::<&Elevator>();
        let total_util_ms: u64 = query.iter(&self.world).map(|car| car.util_time_ms).sum();
        let book = self.world.resource::<RequestBook>();
        let window = self.world.resource::<UtilizationWindow>();
        metrics_report(now, self.params.n_elevators, total_util_ms, book, window)
    }

    /// Register a push subscriber; it receives the current snapshot
    /// immediately and every tick snapshot afterwards.
    pub fn subscribe(&mut self, sender: Sender<PushMessage>) {
        let snapshot = self.snapshot();
        if sender
            .send(PushMessage::Snapshot { data: snapshot })
            .is_err()
        {
            log::warn!("push subscriber disconnected before the initial snapshot");
            return;
        }
        self.world.resource_mut::<Subscribers>().add(sender);
    }

    /// Run one tick of `real_dt_ms` wall time, if running.
    pub fn tick(&mut self, real_dt_ms: f64) {
        if !self.is_running() {
            return;
        }
        run_tick(&mut self.world, &mut self.schedule, real_dt_ms);
    }

    /// Direct world access, for tests and the glue layers above this crate.
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::Direction;

    const TICK_MS: f64 = 200.0;

    fn engine() -> Engine {
        Engine::new(SimParams::default().with_seed(7))
    }

    #[test]
    fn start_and_stop_are_idempotent() {
        let mut engine = engine();
        assert!(!engine.is_running());
        engine.start();
        engine.start();
        assert!(engine.is_running());
        engine.stop();
        engine.stop();
        assert!(!engine.is_running());
    }

    #[test]
    fn tick_is_a_no_op_while_stopped() {
        let mut engine = engine();
        engine.tick(TICK_MS);
        assert_eq!(engine.snapshot().time, 0);
        engine.start();
        engine.tick(TICK_MS);
        assert_eq!(engine.snapshot().time, 200);
    }

    #[test]
    fn set_speed_rejects_non_positive_values() {
        let mut engine = engine();
        assert!(matches!(
            engine.set_speed(0.0),
            Err(CommandError::InvalidInput(_))
        ));
        assert!(matches!(
            engine.set_speed(-2.0),
            Err(CommandError::InvalidInput(_))
        ));
        assert!(matches!(
            engine.set_speed(f64::NAN),
            Err(CommandError::InvalidInput(_))
        ));
        assert!(engine.set_speed(4.0).is_ok());
    }

    #[test]
    fn reconfig_is_rejected_while_running() {
        let mut engine = engine();
        engine.start();
        assert!(matches!(
            engine.reconfig(SimParams::default()),
            Err(CommandError::State(_))
        ));
        engine.stop();
        let params = SimParams::default().with_fleet(5);
        assert!(engine.reconfig(params).is_ok());
        assert_eq!(engine.snapshot().elevators.len(), 5);
    }

    #[test]
    fn hall_call_validation() {
        let mut engine = engine();
        assert!(matches!(
            engine.add_manual_request(NewRequest::hall(4, 4)),
            Err(CommandError::InvalidInput(_))
        ));
        assert!(matches!(
            engine.add_manual_request(NewRequest::hall(0, 5)),
            Err(CommandError::InvalidInput(_))
        ));
        assert!(matches!(
            engine.add_manual_request(NewRequest::hall(1, 13)),
            Err(CommandError::InvalidInput(_))
        ));
        let request = engine
            .add_manual_request(NewRequest::hall(1, 5))
            .expect("valid hall call");
        assert_eq!(request.origin, Some(1));
        assert!(request.is_assignable());
        assert_eq!(engine.snapshot().pending_requests.len(), 1);
    }

    #[test]
    fn cab_call_fast_path_boards_immediately() {
        let mut engine = engine();
        let request = engine
            .add_manual_request(NewRequest::cab("lift-2", 7))
            .expect("cab call");
        assert_eq!(request.assigned_to.as_deref(), Some("lift-2"));
        assert_eq!(request.pickup_at_ms, Some(0));

        let snapshot = engine.snapshot();
        let car = snapshot
            .elevators
            .iter()
            .find(|car| car.id == "lift-2")
            .expect("lift-2");
        assert_eq!(car.passenger_count, 1);
        assert_eq!(car.route, vec![7]);
    }

    #[test]
    fn cab_call_to_unknown_car_is_not_found() {
        let mut engine = engine();
        let error = engine
            .add_manual_request(NewRequest::cab("lift-9", 7))
            .unwrap_err();
        assert!(matches!(error, CommandError::NotFound(_)));
        assert_eq!(error.kind(), "NOT_FOUND");
        assert_eq!(error.to_string(), "unknown elevator lift-9");
    }

    #[test]
    fn seventh_cab_call_hits_capacity_without_mutation() {
        let mut engine = engine();
        for _ in 0..6 {
            engine
                .add_manual_request(NewRequest::cab("lift-1", 7))
                .expect("within capacity");
        }
        let result = engine.add_manual_request(NewRequest::cab("lift-1", 7));
        assert!(matches!(result, Err(CommandError::Full(_))));

        let snapshot = engine.snapshot();
        let car = snapshot
            .elevators
            .iter()
            .find(|car| car.id == "lift-1")
            .expect("lift-1");
        assert_eq!(car.passenger_count, 6);
        assert_eq!(snapshot.pending_requests.len(), 6);
    }

    #[test]
    fn scenario_count_above_limit_is_rejected() {
        let mut engine = engine();
        assert!(matches!(
            engine.spawn_scenario("randomBurst", Some(251)),
            Err(CommandError::InvalidInput(_))
        ));
        assert_eq!(engine.spawn_scenario("randomBurst", None).unwrap(), 100);
        assert_eq!(engine.spawn_scenario("morningRush", None).unwrap(), 50);
        assert_eq!(engine.spawn_scenario("who-knows", None).unwrap(), 10);
    }

    #[test]
    fn reset_clears_lifecycle_state() {
        let mut engine = engine();
        engine.start();
        engine
            .add_manual_request(NewRequest::hall(1, 5))
            .expect("request");
        for _ in 0..40 {
            engine.tick(TICK_MS);
        }
        assert_eq!(engine.metrics_snapshot().served_count, 1);

        engine.reset();
        assert!(!engine.is_running());
        let snapshot = engine.snapshot();
        assert_eq!(snapshot.time, 0);
        assert!(snapshot.pending_requests.is_empty());
        for car in &snapshot.elevators {
            assert_eq!(car.current_floor, 1);
            assert_eq!(car.passenger_count, 0);
            assert!(car.route.is_empty());
            assert_eq!(car.direction, Direction::Idle);
        }
        let metrics = engine.metrics_snapshot();
        assert_eq!(metrics.served_count, 0);
        assert_eq!(metrics.pending_count, 0);
    }

    #[test]
    fn reset_keeps_subscribers_and_emits_a_snapshot() {
        let mut engine = engine();
        let (tx, rx) = crossbeam_channel::unbounded();
        engine.subscribe(tx);
        // Initial snapshot on subscription.
        assert!(matches!(rx.try_recv(), Ok(PushMessage::Snapshot { .. })));

        engine.reset();
        let message = rx.try_recv().expect("reset snapshot");
        match message {
            PushMessage::Snapshot { data } => assert_eq!(data.time, 0),
            other => panic!("expected snapshot, got {other:?}"),
        }
    }

    #[test]
    fn metrics_reflect_served_requests() {
        let mut engine = engine();
        engine.start();
        engine
            .add_manual_request(NewRequest::hall(1, 5))
            .expect("request");
        for _ in 0..40 {
            engine.tick(TICK_MS);
        }
        let metrics = engine.metrics_snapshot();
        assert_eq!(metrics.served_count, 1);
        assert_eq!(metrics.max_wait, 400);
        assert_eq!(metrics.max_travel, 6000);
        assert!(metrics.utilization > 0.0);
        assert!(metrics.throughput_per_min > 0.0);
    }
}

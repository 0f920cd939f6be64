use bevy_ecs::prelude::Component;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Idle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DoorState {
    Open,
    Closed,
}

/// One elevator car. Floors are 1-based; `route` is the ordered list of
/// floors the car will visit, head first, with no duplicates.
#[derive(Debug, Clone, Component)]
pub struct Elevator {
    pub id: String,
    pub current_floor: u8,
    pub route: Vec<u8>,
    pub direction: Direction,
    pub door: DoorState,
    /// Sim-ms timestamp of the last motion/door status change.
    pub status_since_ms: u64,
    pub passenger_count: u8,
    pub capacity: u8,
    /// Sub-floor travel progress carried across ticks.
    pub move_accum_ms: u64,
    /// Cumulative sim-ms spent carrying at least one passenger.
    pub util_time_ms: u64,
}

impl Elevator {
    pub fn new(id: impl Into<String>, floor: u8, capacity: u8) -> Self {
        Self {
            id: id.into(),
            current_floor: floor,
            route: Vec::new(),
            direction: Direction::Idle,
            door: DoorState::Closed,
            status_since_ms: 0,
            passenger_count: 0,
            capacity,
            move_accum_ms: 0,
            util_time_ms: 0,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.route.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.passenger_count >= self.capacity
    }

    pub fn direction_toward(&self, target: u8) -> Direction {
        match target.cmp(&self.current_floor) {
            std::cmp::Ordering::Greater => Direction::Up,
            std::cmp::Ordering::Less => Direction::Down,
            std::cmp::Ordering::Equal => Direction::Idle,
        }
    }

    /// Append a floor to the route unless it is already scheduled.
    pub fn push_target(&mut self, floor: u8) {
        if !self.route.contains(&floor) {
            self.route.push(floor);
        }
    }

    /// Remove duplicate floors from the route; first occurrence wins, order
    /// is otherwise preserved.
    pub fn dedup_route(&mut self) {
        let mut seen = std::collections::HashSet::new();
        self.route.retain(|&floor| seen.insert(floor));
    }
}

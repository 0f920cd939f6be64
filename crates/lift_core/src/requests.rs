//! Request ledger: the pending set and the served archive, with per-request
//! lifecycle timestamps. A request is served once both pickup and dropoff
//! are stamped; served records are retained for metrics until reset.

use bevy_ecs::prelude::Resource;
use serde::Serialize;
use uuid::Uuid;

use crate::ecs::Direction;

pub const DEFAULT_BASE_PRIORITY: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestKind {
    /// External call from a landing: origin and destination floors.
    Hall,
    /// Internal call from inside a named car: destination only.
    Cab,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    pub id: Uuid,
    pub created_at_ms: u64,
    pub kind: RequestKind,
    /// Boarding floor; `None` for cab calls (the passenger is already aboard).
    pub origin: Option<u8>,
    pub destination: u8,
    pub base_priority: f64,
    /// Dynamic priority, recomputed by the scheduler every tick.
    pub priority: f64,
    pub escalated: bool,
    pub morning_rush: bool,
    pub assigned_to: Option<String>,
    pub pickup_at_ms: Option<u64>,
    pub dropoff_at_ms: Option<u64>,
}

impl Request {
    pub fn hall(id: Uuid, now_ms: u64, origin: u8, destination: u8) -> Self {
        Self {
            id,
            created_at_ms: now_ms,
            kind: RequestKind::Hall,
            origin: Some(origin),
            destination,
            base_priority: DEFAULT_BASE_PRIORITY,
            priority: DEFAULT_BASE_PRIORITY,
            escalated: false,
            morning_rush: false,
            assigned_to: None,
            pickup_at_ms: None,
            dropoff_at_ms: None,
        }
    }

    pub fn cab(id: Uuid, now_ms: u64, destination: u8) -> Self {
        Self {
            id,
            created_at_ms: now_ms,
            kind: RequestKind::Cab,
            origin: None,
            destination,
            base_priority: DEFAULT_BASE_PRIORITY,
            priority: DEFAULT_BASE_PRIORITY,
            escalated: false,
            morning_rush: false,
            assigned_to: None,
            pickup_at_ms: None,
            dropoff_at_ms: None,
        }
    }

    /// Floor a car must reach to start serving this request.
    pub fn pickup_floor(&self) -> u8 {
        self.origin.unwrap_or(self.destination)
    }

    /// Travel direction implied by origin → destination, if both are known
    /// and distinct.
    pub fn travel_direction(&self) -> Option<Direction> {
        let origin = self.origin?;
        match self.destination.cmp(&origin) {
            std::cmp::Ordering::Greater => Some(Direction::Up),
            std::cmp::Ordering::Less => Some(Direction::Down),
            std::cmp::Ordering::Equal => None,
        }
    }

    /// Eligible for the scheduler's assignment pool: not yet bound to a car
    /// and not yet picked up. Cab calls never qualify (pickup is stamped at
    /// creation).
    pub fn is_assignable(&self) -> bool {
        self.assigned_to.is_none() && self.pickup_at_ms.is_none()
    }

    pub fn is_served(&self) -> bool {
        self.pickup_at_ms.is_some() && self.dropoff_at_ms.is_some()
    }

    /// Submission-to-pickup time, once picked up.
    pub fn wait_time_ms(&self) -> Option<u64> {
        self.pickup_at_ms
            .map(|pickup| pickup.saturating_sub(self.created_at_ms))
    }

    /// Pickup-to-dropoff time, once served.
    pub fn travel_time_ms(&self) -> Option<u64> {
        match (self.pickup_at_ms, self.dropoff_at_ms) {
            (Some(pickup), Some(dropoff)) => Some(dropoff.saturating_sub(pickup)),
            _ => None,
        }
    }
}

/// Authoritative store of request lifecycle state.
#[derive(Debug, Default, Resource)]
pub struct RequestBook {
    pub pending: Vec<Request>,
    pub served: Vec<Request>,
}

impl RequestBook {
    pub fn submit(&mut self, request: Request) {
        self.pending.push(request);
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn served_count(&self) -> usize {
        self.served.len()
    }

    /// Longest wait among still-pending requests.
    pub fn max_pending_wait_ms(&self, now_ms: u64) -> u64 {
        self.pending
            .iter()
            .map(|r| now_ms.saturating_sub(r.created_at_ms))
            .max()
            .unwrap_or(0)
    }
}

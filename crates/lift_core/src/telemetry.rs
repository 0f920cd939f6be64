//! Telemetry: tick snapshots, a bounded snapshot ring for late-joining
//! observers, the utilization sliding window, and the aggregate metrics
//! report.

use std::collections::VecDeque;

use bevy_ecs::prelude::Resource;
use serde::Serialize;

use crate::ecs::{Direction, DoorState, Elevator};
use crate::requests::{Request, RequestBook};

/// Immutable view of one elevator, detached from engine state.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ElevatorSnapshot {
    pub id: String,
    pub current_floor: u8,
    pub route: Vec<u8>,
    pub direction: Direction,
    pub door: DoorState,
    pub status_since: u64,
    pub passenger_count: u8,
    pub capacity: u8,
    pub util_time: u64,
}

impl From<&Elevator> for ElevatorSnapshot {
    fn from(car: &Elevator) -> Self {
        Self {
            id: car.id.clone(),
            current_floor: car.current_floor,
            route: car.route.clone(),
            direction: car.direction,
            door: car.door,
            status_since: car.status_since_ms,
            passenger_count: car.passenger_count,
            capacity: car.capacity,
            util_time: car.util_time_ms,
        }
    }
}

/// Full engine state visible to observers. A defensive deep copy: consumers
/// can never reach back into live engine state through it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimSnapshot {
    pub time: u64,
    pub elevators: Vec<ElevatorSnapshot>,
    pub pending_requests: Vec<Request>,
    pub running: bool,
}

/// Assemble a snapshot from borrowed engine parts. Elevators are emitted in
/// id order so snapshots of equal state compare equal.
pub fn snapshot_from_parts<'a>(
    time: u64,
    running: bool,
    elevators: impl IntoIterator<Item = &'a Elevator>,
    pending: &[Request],
) -> SimSnapshot {
    let mut elevators: Vec<ElevatorSnapshot> =
        elevators.into_iter().map(ElevatorSnapshot::from).collect();
    elevators.sort_by(|a, b| a.id.cmp(&b.id));
    SimSnapshot {
        time,
        elevators,
        pending_requests: pending.to_vec(),
        running,
    }
}

/// Bounded ring of recent snapshots.
#[derive(Debug, Resource)]
pub struct SimSnapshots {
    snapshots: VecDeque<SimSnapshot>,
    capacity: usize,
}

impl SimSnapshots {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            snapshots: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, snapshot: SimSnapshot) {
        self.snapshots.push_back(snapshot);
        while self.snapshots.len() > self.capacity {
            self.snapshots.pop_front();
        }
    }

    pub fn latest(&self) -> Option<&SimSnapshot> {
        self.snapshots.back()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

impl Default for SimSnapshots {
    fn default() -> Self {
        Self::with_capacity(64)
    }
}

/// One utilization sample, pushed once per tick.
#[derive(Debug, Clone, Copy)]
pub struct UtilSample {
    pub ts_ms: u64,
    pub total_util_ms: u64,
    pub served_count: u64,
}

pub const DEFAULT_WINDOW_MS: u64 = 60_000;

/// Sliding window over utilization samples. Samples older than twice the
/// window are pruned on push; rate computations span from the oldest sample
/// still inside the window to the latest.
#[derive(Debug, Resource)]
pub struct UtilizationWindow {
    window_ms: u64,
    samples: VecDeque<UtilSample>,
}

impl Default for UtilizationWindow {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_MS)
    }
}

impl UtilizationWindow {
    pub fn new(window_ms: u64) -> Self {
        Self {
            window_ms: window_ms.max(1),
            samples: VecDeque::new(),
        }
    }

    pub fn window_ms(&self) -> u64 {
        self.window_ms
    }

    pub fn push_sample(&mut self, sample: UtilSample) {
        let horizon = sample.ts_ms.saturating_sub(2 * self.window_ms);
        self.samples.push_back(sample);
        while self
            .samples
            .front()
            .is_some_and(|oldest| oldest.ts_ms < horizon)
        {
            self.samples.pop_front();
        }
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    fn window_endpoints(&self, now_ms: u64) -> Option<(&UtilSample, &UtilSample)> {
        let latest = self.samples.back()?;
        let cutoff = now_ms.saturating_sub(self.window_ms);
        let oldest = self.samples.iter().find(|s| s.ts_ms >= cutoff)?;
        Some((oldest, latest))
    }

    /// Fraction of fleet time spent carrying passengers over the window.
    pub fn recent_util(&self, now_ms: u64, n_elevators: usize) -> f64 {
        let Some((oldest, latest)) = self.window_endpoints(now_ms) else {
            return 0.0;
        };
        if n_elevators == 0 {
            return 0.0;
        }
        let dt = latest.ts_ms.saturating_sub(oldest.ts_ms).max(1);
        let util_delta = latest.total_util_ms.saturating_sub(oldest.total_util_ms);
        util_delta as f64 / (dt as f64 * n_elevators as f64)
    }

    /// Requests served per minute over the window.
    pub fn throughput_per_min(&self, now_ms: u64) -> f64 {
        let Some((oldest, latest)) = self.window_endpoints(now_ms) else {
            return 0.0;
        };
        let dt = latest.ts_ms.saturating_sub(oldest.ts_ms).max(1);
        let served_delta = latest.served_count.saturating_sub(oldest.served_count);
        served_delta as f64 * 60_000.0 / dt as f64
    }
}

/// Aggregate statistics over served and pending requests. Time-valued fields
/// are sim-ms; `utilization` and `recent_util` are fractions of fleet time.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsReport {
    pub served_count: usize,
    pub avg_wait: f64,
    pub max_wait: u64,
    pub avg_travel: f64,
    pub max_travel: u64,
    pub utilization: f64,
    pub recent_util: f64,
    pub throughput_per_min: f64,
    pub pending_count: usize,
    pub max_pending_wait: u64,
}

pub fn metrics_report(
    now_ms: u64,
    n_elevators: usize,
    total_util_ms: u64,
    book: &RequestBook,
    window: &UtilizationWindow,
) -> MetricsReport {
    let waits: Vec<u64> = book.served.iter().filter_map(|r| r.wait_time_ms()).collect();
    let travels: Vec<u64> = book
        .served
        .iter()
        .filter_map(|r| r.travel_time_ms())
        .collect();

    let avg = |values: &[u64]| {
        if values.is_empty() {
            0.0
        } else {
            values.iter().sum::<u64>() as f64 / values.len() as f64
        }
    };

    let fleet_time_ms = n_elevators as u64 * now_ms;
    let utilization = if fleet_time_ms == 0 {
        0.0
    } else {
        total_util_ms as f64 / fleet_time_ms as f64
    };

    MetricsReport {
        served_count: book.served_count(),
        avg_wait: avg(&waits),
        max_wait: waits.iter().copied().max().unwrap_or(0),
        avg_travel: avg(&travels),
        max_travel: travels.iter().copied().max().unwrap_or(0),
        utilization,
        recent_util: window.recent_util(now_ms, n_elevators),
        throughput_per_min: window.throughput_per_min(now_ms),
        pending_count: book.pending_count(),
        max_pending_wait: book.max_pending_wait_ms(now_ms),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn sample(ts_ms: u64, total_util_ms: u64, served_count: u64) -> UtilSample {
        UtilSample {
            ts_ms,
            total_util_ms,
            served_count,
        }
    }

    #[test]
    fn ring_drops_oldest_past_capacity() {
        let mut ring = SimSnapshots::with_capacity(2);
        for t in [1, 2, 3] {
            ring.push(snapshot_from_parts(t, true, [], &[]));
        }
        assert_eq!(ring.len(), 2);
        assert_eq!(ring.latest().map(|s| s.time), Some(3));
    }

    #[test]
    fn snapshot_orders_elevators_by_id() {
        let b = Elevator::new("lift-2", 3, 6);
        let a = Elevator::new("lift-1", 5, 6);
        let snap = snapshot_from_parts(0, false, [&b, &a], &[]);
        let ids: Vec<&str> = snap.elevators.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, ["lift-1", "lift-2"]);
    }

    #[test]
    fn window_prunes_beyond_twice_the_window() {
        let mut window = UtilizationWindow::new(60_000);
        window.push_sample(sample(0, 0, 0));
        window.push_sample(sample(60_000, 10_000, 1));
        window.push_sample(sample(121_000, 20_000, 2));
        // 0 < 121_000 − 120_000, so the first sample is gone.
        assert_eq!(window.sample_count(), 2);
    }

    #[test]
    fn recent_util_spans_window_endpoints() {
        let mut window = UtilizationWindow::new(60_000);
        // Outside the window; must not participate.
        window.push_sample(sample(0, 0, 0));
        window.push_sample(sample(40_000, 10_000, 2));
        window.push_sample(sample(100_000, 40_000, 8));
        let util = window.recent_util(100_000, 3);
        // (40_000 − 10_000) / ((100_000 − 40_000) × 3)
        assert!((util - 30_000.0 / 180_000.0).abs() < 1e-9);
        let throughput = window.throughput_per_min(100_000);
        assert!((throughput - 6.0 * 60_000.0 / 60_000.0).abs() < 1e-9);
    }

    #[test]
    fn rates_are_zero_without_samples() {
        let window = UtilizationWindow::default();
        assert_eq!(window.recent_util(5000, 3), 0.0);
        assert_eq!(window.throughput_per_min(5000), 0.0);
    }

    #[test]
    fn report_aggregates_served_requests() {
        let mut book = RequestBook::default();
        let mut a = Request::hall(Uuid::from_u128(1), 0, 1, 5);
        a.pickup_at_ms = Some(1000);
        a.dropoff_at_ms = Some(5000);
        let mut b = Request::hall(Uuid::from_u128(2), 0, 2, 8);
        b.pickup_at_ms = Some(3000);
        b.dropoff_at_ms = Some(10_000);
        book.served = vec![a, b];
        book.submit(Request::hall(Uuid::from_u128(3), 8_000, 3, 9));

        let window = UtilizationWindow::default();
        let report = metrics_report(10_000, 2, 4_000, &book, &window);
        assert_eq!(report.served_count, 2);
        assert_eq!(report.avg_wait, 2000.0);
        assert_eq!(report.max_wait, 3000);
        assert_eq!(report.avg_travel, 5500.0);
        assert_eq!(report.max_travel, 7000);
        assert!((report.utilization - 4_000.0 / 20_000.0).abs() < 1e-9);
        assert_eq!(report.pending_count, 1);
        assert_eq!(report.max_pending_wait, 2000);
    }
}

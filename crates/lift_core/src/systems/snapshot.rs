//! Snapshot emission: capture the visible engine state after every tick,
//! keep it in the ring buffer and fan it out to push subscribers.

use bevy_ecs::prelude::{Query, Res, ResMut};

use crate::broadcast::{PushMessage, Subscribers};
use crate::clock::SimClock;
use crate::ecs::Elevator;
use crate::requests::RequestBook;
use crate::runner::EngineStatus;
use crate::telemetry::{snapshot_from_parts, SimSnapshots};

pub fn snapshot_system(
    clock: Res<SimClock>,
    status: Res<EngineStatus>,
    cars: Query<&Elevator>,
    book: Res<RequestBook>,
    mut ring: ResMut<SimSnapshots>,
    mut subscribers: ResMut<Subscribers>,
) {
    let snapshot = snapshot_from_parts(clock.now(), status.running, cars.iter(), &book.pending);
    ring.push(snapshot.clone());
    subscribers.broadcast(PushMessage::Snapshot { data: snapshot });
}

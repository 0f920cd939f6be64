//! Push channel: fan-out of engine messages to subscribers.
//!
//! Subscribers hold the receiving end of a crossbeam channel; the engine
//! never blocks on them. A disconnected subscriber is dropped on the next
//! broadcast and the remaining subscribers are unaffected.

use bevy_ecs::prelude::Resource;
use crossbeam_channel::Sender;
use serde::Serialize;

use crate::telemetry::SimSnapshot;

/// Self-describing message pushed to subscribers. Serializes as
/// `{"type": "snapshot", "data": …}` / `{"type": "info", "message": …}` /
/// `{"type": "error", "message": …}`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PushMessage {
    Snapshot { data: SimSnapshot },
    Info { message: String },
    Error { message: String },
}

#[derive(Debug, Default, Resource)]
pub struct Subscribers {
    senders: Vec<Sender<PushMessage>>,
}

impl Subscribers {
    pub fn add(&mut self, sender: Sender<PushMessage>) {
        self.senders.push(sender);
    }

    pub fn len(&self) -> usize {
        self.senders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.senders.is_empty()
    }

    /// Send to every subscriber, dropping the ones whose channel has
    /// disconnected.
    pub fn broadcast(&mut self, message: PushMessage) {
        self.senders.retain(|sender| match sender.send(message.clone()) {
            Ok(()) => true,
            Err(_) => {
                log::warn!("dropping push subscriber: channel disconnected");
                false
            }
        });
    }
}

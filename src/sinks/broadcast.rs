//! Broadcast sinks
//!
//! A broadcast sink notifies out-of-process or otherwise decoupled observers of
//! every dispatched log call as a named event.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;

use crate::event::Severity;

/// Default buffer of a [`ChannelBroadcast`]
pub const DEFAULT_BROADCAST_CAPACITY: usize = 256;

/// Payload attached to a broadcast event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BroadcastPayload {
    pub message: Value,
    pub extra: Vec<Value>,
    pub timestamp: DateTime<Utc>,
}

/// A named log event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BroadcastEvent {
    /// Namespace followed by the severity tag, e.g. `fanlog:WARN`
    pub name: String,
    pub severity: Severity,
    pub payload: BroadcastPayload,
}

/// Broadcast capability
pub trait BroadcastSink: Send + Sync {
    fn dispatch(&self, event: &BroadcastEvent);
}

/// Broadcast sink publishing on a `tokio` broadcast channel
///
/// Lagging receivers lose the oldest events; publishing with no receivers
/// drops the event.
#[derive(Debug, Clone)]
pub struct ChannelBroadcast {
    sender: broadcast::Sender<BroadcastEvent>,
}

impl ChannelBroadcast {
    /// Create a channel buffering up to `capacity` events per receiver
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Subscribe to events dispatched from now on
    pub fn subscribe(&self) -> broadcast::Receiver<BroadcastEvent> {
        self.sender.subscribe()
    }

    /// Number of live receivers
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for ChannelBroadcast {
    fn default() -> Self {
        Self::new(DEFAULT_BROADCAST_CAPACITY)
    }
}

impl BroadcastSink for ChannelBroadcast {
    fn dispatch(&self, event: &BroadcastEvent) {
        if self.sender.send(event.clone()).is_err() {
            tracing::debug!(event = %event.name, "No broadcast receivers, dropping event");
        }
    }
}

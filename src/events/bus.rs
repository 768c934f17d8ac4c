//! # Diagnostic bus.
//!
//! [`Bus`] is a thin wrapper around [`tokio::sync::broadcast`] that every
//! pipeline task receives as its logging capability.
//!
//! ```text
//!   Emitter ──┐
//!   Reactor ──┼──► Bus ──► Runtime listener ──► SubscriberSet
//!   Runtime ──┘         └─► any other receiver (tests, custom sinks)
//! ```
//!
//! ## Rules
//! - **Non-blocking publish**: `publish()` never blocks.
//! - **Bounded capacity**: slow receivers get `RecvError::Lagged(n)`.
//! - **No persistence**: events are lost if nobody is subscribed at send time.

use tokio::sync::broadcast;

use super::event::Event;

/// Broadcast channel for diagnostic events.
///
/// Cheap to clone (internally holds an `Arc`-backed sender).
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a new bus with the given channel capacity (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel::<Event>(capacity.max(1));
        Self { tx }
    }

    /// Publishes an event to all active receivers; dropped if there are none.
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// Creates a receiver that observes events sent after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}

impl Default for Bus {
    /// A bus with the default capacity of 1024 events.
    fn default() -> Self {
        Self::new(1024)
    }
}

//! # Action dispatch sink.
//!
//! [`Dispatcher`] delivers [`Action`]s to every interested listener. Pipelines
//! only *produce* actions through it; reactors (and any host component) take
//! them back out through [`Dispatcher::subscribe`].
//!
//! ## Rules
//! - Delivery order equals dispatch order for every receiver.
//! - A receiver only sees actions dispatched after it subscribed.
//! - Receivers falling more than `capacity` actions behind observe `Lagged`.

use std::sync::Arc;

use tokio::sync::broadcast;

use super::action::Action;

/// Broadcast sink for typed actions.
///
/// Cheap to clone; all clones feed the same listeners.
#[derive(Debug)]
pub struct Dispatcher<P> {
    tx: broadcast::Sender<Action<P>>,
}

impl<P> Clone for Dispatcher<P> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<P> Dispatcher<P>
where
    P: Clone + Send + Sync + 'static,
{
    /// Creates a dispatcher with the given buffer capacity (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Dispatches an action; returns how many listeners received it.
    pub fn dispatch(&self, action: Action<P>) -> usize {
        self.tx.send(action).unwrap_or(0)
    }

    /// Dispatches a payload-less signal of the given kind.
    pub fn signal(&self, kind: impl Into<Arc<str>>) -> usize {
        self.dispatch(Action::signal(kind))
    }

    /// Creates a listener that observes subsequent actions.
    pub fn subscribe(&self) -> broadcast::Receiver<Action<P>> {
        self.tx.subscribe()
    }

    /// Number of live listeners.
    pub fn listener_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(flavor = "current_thread")]
    async fn listeners_see_actions_in_order() {
        let d = Dispatcher::<u32>::new(8);
        let mut rx = d.subscribe();
        assert_eq!(d.dispatch(Action::new("A", 1)), 1);
        d.signal("STOP");

        let first = rx.recv().await.expect("first");
        assert!(first.is("A"));
        assert_eq!(first.payload, Some(1));
        let second = rx.recv().await.expect("second");
        assert!(second.is("STOP"));
    }

    #[test]
    fn dispatch_without_listeners_is_dropped() {
        let d = Dispatcher::<u32>::new(0);
        assert_eq!(d.listener_count(), 0);
        assert_eq!(d.dispatch(Action::new("A", 1)), 0);
    }
}

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use callvisor::{CallbackBridge, Event, EventKind, Resolver};
use tokio::sync::broadcast;

/// Bridge owned by the test, with the resolver the callback source would hold.
pub fn bridge<T>() -> (Arc<CallbackBridge<T>>, Resolver<T>)
where
    T: Clone + Send + Sync + 'static,
{
    let mut hook = None;
    let bridge = CallbackBridge::new(|r| hook = Some(r));
    (Arc::new(bridge), hook.expect("configurer runs during construction"))
}

/// Delivers `frame` once the emitter is waiting for it.
pub async fn push<T>(bridge: &CallbackBridge<T>, resolver: &Resolver<T>, frame: T)
where
    T: Clone + Send + Sync + 'static,
{
    for _ in 0..1_000 {
        if bridge.is_pending() {
            assert!(resolver.resolve(frame), "pending pull must accept the frame");
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("emitter never pulled a frame");
}

/// Lets every ready task on the current-thread runtime make progress.
pub async fn settle() {
    for _ in 0..64 {
        tokio::task::yield_now().await;
    }
}

/// Collects every event published so far.
pub fn drain(rx: &mut broadcast::Receiver<Event>) -> Vec<Event> {
    let mut out = Vec::new();
    loop {
        match rx.try_recv() {
            Ok(ev) => out.push(ev),
            Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
            Err(_) => return out,
        }
    }
}

pub fn kinds(events: &[Event]) -> Vec<EventKind> {
    events.iter().map(|e| e.kind).collect()
}

pub fn count(events: &[Event], kind: EventKind) -> usize {
    events.iter().filter(|e| e.kind == kind).count()
}

/// Shared, ordered record of what reactions did.
#[derive(Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

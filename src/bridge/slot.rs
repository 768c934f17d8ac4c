//! # Deferred slot and resolver.
//!
//! ```text
//! external source ──► Resolver::resolve(frame)
//!                          │
//!                          ├─ slot pending → send frame, clear slot
//!                          └─ slot empty   → drop frame
//!
//! task ──► CallbackBridge::next_value()
//!               ├─ slot empty   → create slot (oneshot + shared future)
//!               └─ slot pending → clone the shared future
//! ```
//!
//! The slot only holds a weak handle to the shared future: once every waiter
//! dropped its pull (a cancelled emitter, say), the slot counts as empty again.

use std::sync::{Arc, Mutex, MutexGuard};

use futures::FutureExt;
use futures::future::{self, BoxFuture, Shared, WeakShared};
use tokio::sync::oneshot;

/// Awaitable returned by [`CallbackBridge::next_value`].
///
/// Resolves with `Some(frame)` for the first frame delivered after the pull,
/// or `None` once the bridge is closed.
pub type NextValue<T> = Shared<BoxFuture<'static, Option<T>>>;

/// One unresolved waiter.
struct Pending<T: Clone> {
    tx: oneshot::Sender<T>,
    rx: WeakShared<BoxFuture<'static, Option<T>>>,
}

impl<T: Clone> Pending<T> {
    /// The shared pull, if anybody still holds it.
    fn waiter(&self) -> Option<NextValue<T>> {
        self.rx.upgrade()
    }
}

struct Slot<T: Clone> {
    pending: Option<Pending<T>>,
    closed: bool,
}

struct Inner<T: Clone> {
    slot: Mutex<Slot<T>>,
}

impl<T: Clone> Inner<T> {
    fn lock(&self) -> MutexGuard<'_, Slot<T>> {
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Closes the bridge when the last [`Resolver`] clone is dropped.
struct ResolverGuard<T: Clone> {
    shared: Arc<Inner<T>>,
}

impl<T: Clone> Drop for ResolverGuard<T> {
    fn drop(&mut self) {
        let mut slot = self.shared.lock();
        slot.closed = true;
        // Dropping the sender wakes the waiter with `None`.
        slot.pending = None;
    }
}

/// Handle given to the callback configurer.
///
/// Cheap to clone; may be called from any thread. The bridge stays open as
/// long as at least one clone is alive.
pub struct Resolver<T: Clone> {
    guard: Arc<ResolverGuard<T>>,
}

impl<T: Clone> Clone for Resolver<T> {
    fn clone(&self) -> Self {
        Self {
            guard: Arc::clone(&self.guard),
        }
    }
}

impl<T: Clone> Resolver<T> {
    /// Delivers one frame.
    ///
    /// Returns `true` if a pending pull was resolved, `false` if the frame
    /// was dropped because nobody was waiting.
    pub fn resolve(&self, frame: T) -> bool {
        let pending = self.guard.shared.lock().pending.take();
        match pending {
            Some(p) => match p.waiter() {
                // Keep the waiter alive until the frame is in the channel.
                Some(_waiter) => p.tx.send(frame).is_ok(),
                None => false,
            },
            None => false,
        }
    }
}

/// Push-to-pull adapter over a callback-registering source.
///
/// ## Example
/// ```rust
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// use std::sync::{Arc, Mutex};
/// use callvisor::{CallbackBridge, Resolver};
///
/// let hook: Arc<Mutex<Option<Resolver<u32>>>> = Arc::default();
/// let h = hook.clone();
/// let bridge = CallbackBridge::new(move |resolve| {
///     *h.lock().unwrap() = Some(resolve);
/// });
///
/// let next = bridge.next_value();
/// hook.lock().unwrap().as_ref().unwrap().resolve(7);
/// assert_eq!(next.await, Some(7));
/// # }
/// ```
pub struct CallbackBridge<T: Clone> {
    shared: Arc<Inner<T>>,
}

impl<T> CallbackBridge<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Creates the bridge and invokes `configurer` exactly once with a resolver.
    pub fn new<F>(configurer: F) -> Self
    where
        F: FnOnce(Resolver<T>),
    {
        let shared = Arc::new(Inner {
            slot: Mutex::new(Slot {
                pending: None,
                closed: false,
            }),
        });
        let resolver = Resolver {
            guard: Arc::new(ResolverGuard {
                shared: Arc::clone(&shared),
            }),
        };
        configurer(resolver);
        Self { shared }
    }

    /// Returns an awaitable for the next frame delivered after this call.
    ///
    /// Calls made while a slot is pending return clones of the same future.
    pub fn next_value(&self) -> NextValue<T> {
        let mut slot = self.shared.lock();
        if slot.closed {
            return future::ready(None).boxed().shared();
        }
        if let Some(waiter) = slot.pending.as_ref().and_then(Pending::waiter) {
            return waiter;
        }

        let (tx, rx) = oneshot::channel::<T>();
        let rx = rx.map(Result::ok).boxed().shared();
        slot.pending = rx.downgrade().map(|weak| Pending { tx, rx: weak });
        rx
    }

    /// Returns `true` if a pull is waiting for a frame.
    pub fn is_pending(&self) -> bool {
        self.shared
            .lock()
            .pending
            .as_ref()
            .is_some_and(|p| p.waiter().is_some())
    }

    /// Returns `true` once every resolver has been dropped.
    pub fn is_closed(&self) -> bool {
        self.shared.lock().closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn capture<T: Clone + Send + Sync + 'static>() -> (CallbackBridge<T>, Resolver<T>) {
        let mut hook = None;
        let bridge = CallbackBridge::new(|r| hook = Some(r));
        (bridge, hook.expect("configurer called"))
    }

    #[test]
    fn configurer_runs_exactly_once() {
        let mut calls = 0;
        let _bridge: CallbackBridge<u8> = CallbackBridge::new(|_r| calls += 1);
        assert_eq!(calls, 1);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn frame_resolves_pending_pull() {
        let (bridge, resolve) = capture::<&'static str>();
        let next = bridge.next_value();
        assert!(bridge.is_pending());
        assert!(resolve.resolve("a"));
        assert!(!bridge.is_pending());
        assert_eq!(next.await, Some("a"));
    }

    #[test]
    fn frame_without_waiter_is_dropped() {
        let (bridge, resolve) = capture::<u32>();
        assert!(!resolve.resolve(1));
        assert!(!bridge.is_pending());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn second_frame_before_next_pull_is_dropped() {
        let (bridge, resolve) = capture::<u32>();
        let first = bridge.next_value();
        assert!(resolve.resolve(1));
        assert!(!resolve.resolve(2));
        assert_eq!(first.await, Some(1));

        let second = bridge.next_value();
        assert!(resolve.resolve(3));
        assert_eq!(second.await, Some(3));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn concurrent_pulls_share_one_slot() {
        let (bridge, resolve) = capture::<u32>();
        let a = bridge.next_value();
        let b = bridge.next_value();
        assert!(resolve.resolve(9));
        assert_eq!(a.await, Some(9));
        assert_eq!(b.await, Some(9));
        assert!(!bridge.is_pending());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn dropping_resolver_closes_bridge() {
        let (bridge, resolve) = capture::<u32>();
        let next = bridge.next_value();
        drop(resolve);
        assert!(bridge.is_closed());
        assert_eq!(next.await, None);
        assert_eq!(bridge.next_value().await, None);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn cloned_resolver_keeps_bridge_open() {
        let (bridge, resolve) = capture::<u32>();
        let other = resolve.clone();
        drop(resolve);
        assert!(!bridge.is_closed());
        let next = bridge.next_value();
        assert!(other.resolve(4));
        assert_eq!(next.await, Some(4));
    }

    #[test]
    fn abandoned_pull_frees_the_slot() {
        let (bridge, resolve) = capture::<u32>();
        let next = bridge.next_value();
        assert!(bridge.is_pending());
        drop(next);
        assert!(!bridge.is_pending());
        assert!(!resolve.resolve(1));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn pull_after_abandoned_one_gets_the_next_frame() {
        let (bridge, resolve) = capture::<u32>();
        drop(bridge.next_value());
        let next = bridge.next_value();
        assert!(resolve.resolve(2));
        assert_eq!(next.await, Some(2));
    }

    #[test]
    fn resolve_from_another_thread() {
        let (bridge, resolve) = capture::<u32>();
        let next = bridge.next_value();
        std::thread::spawn(move || resolve.resolve(5))
            .join()
            .expect("thread");
        assert_eq!(futures::executor::block_on(next), Some(5));
    }
}

//! # Diagnostic events emitted by pipelines, reactors and the host runtime.
//!
//! The [`EventKind`] enum classifies event types across four groups:
//! - **Emitter events**: the value-emitting task pulling from its bridge
//! - **Reactor events**: the reactive supervisor and the reactions it drives
//! - **Runtime events**: tasks spawned on the host [`Runtime`](crate::Runtime)
//! - **Subscriber events**: delivery problems inside the fan-out
//!
//! The [`Event`] struct carries metadata such as timestamps, task name and reason.
//! Events are diagnostics only: nothing in the pipeline reacts to them.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//!
//! ## Example
//! ```rust
//! use callvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::ReactionFailed)
//!     .with_task("tracker")
//!     .with_reason("connection reset")
//!     .with_attempt(2);
//!
//! assert_eq!(ev.kind, EventKind::ReactionFailed);
//! assert_eq!(ev.task.as_deref(), Some("tracker"));
//! assert_eq!(ev.attempt, Some(2));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of diagnostic events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    // === Emitter events ===
    /// Value-emitting task started and is waiting for its first frame.
    ///
    /// Sets: `task`
    EmitterStarting,

    /// A pull on the bridge resolved with a frame.
    ///
    /// Sets: `task`, `attempt` (1-based frame counter)
    ValueReceived,

    /// A frame was dispatched as an action.
    ///
    /// Sets: `task`, `attempt`, `reason` (action kind)
    ValueEmitted,

    /// Value-emitting task was cancelled from the outside.
    ///
    /// Sets: `task`
    EmitterCancelled,

    /// Value-emitting task finished on its own (one-shot done or source closed).
    ///
    /// Sets: `task`, `reason`
    EmitterCompleted,

    /// Value-emitting task panicked (for example inside a payload creator).
    ///
    /// Sets: `task`, `reason` (`emitter_panic`)
    EmitterFailed,

    // === Reactor events ===
    /// Reactive supervisor started (background emitter forked).
    ///
    /// Sets: `task`
    ReactorStarting,

    /// Reactive supervisor was cancelled from the outside.
    ///
    /// Sets: `task`
    ReactorCancelled,

    /// Reactive supervisor terminated on its own.
    ///
    /// Sets: `task`, `reason` (`cancel_signal`, `reaction_done`, `emitter_done`)
    ReactorCompleted,

    /// The configured cancel signal was observed.
    ///
    /// Sets: `task`, `reason` (signal kind)
    CancelSignalReceived,

    /// A reaction was started for an event.
    ///
    /// Sets: `task`, `attempt` (reaction generation)
    ReactionStarted,

    /// A running reaction is being cancelled because a newer event arrived.
    ///
    /// Sets: `task`, `attempt` (generation being replaced)
    ReactionReplaced,

    /// A reaction finished successfully.
    ///
    /// Sets: `task`, `attempt`
    ReactionStopped,

    /// A reaction exited through cancellation.
    ///
    /// Sets: `task`, `attempt`
    ReactionCancelled,

    /// A reaction returned an error or panicked.
    ///
    /// Sets: `task`, `attempt`, `reason`
    ReactionFailed,

    /// An action of the watched kind carried no payload and was skipped.
    ///
    /// Sets: `task`, `reason` (action kind)
    EventIgnored,

    /// The reactor's dispatch receiver fell behind and skipped actions.
    ///
    /// Sets: `task`, `reason` (skipped count)
    DispatchLagged,

    // === Runtime events ===
    /// A task spawned on the runtime is starting.
    ///
    /// Sets: `task`
    TaskStarting,

    /// A task finished successfully **or** exited through cancellation.
    ///
    /// Sets: `task`
    TaskStopped,

    /// A task returned an error.
    ///
    /// Sets: `task`, `reason`
    TaskFailed,

    /// Shutdown requested (OS signal or explicit call).
    ///
    /// Sets: `reason` (`requested` or the signal label, e.g. `signal_terminate`)
    ShutdownRequested,

    /// All tasks stopped within the configured grace period.
    AllStoppedWithin,

    /// Grace period exceeded; some tasks did not stop in time.
    GraceExceeded,

    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets: `task` (subscriber name), `reason` (panic message)
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets: `task` (subscriber name), `reason`
    SubscriberOverflow,
}

/// Diagnostic event with optional metadata.
#[derive(Debug, Clone)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Name of the pipeline/task, if applicable.
    pub task: Option<Arc<str>>,
    /// Human-readable reason (errors, action kinds, exit causes).
    pub reason: Option<Arc<str>>,
    /// Frame counter or reaction generation (starting from 1).
    pub attempt: Option<u64>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            task: None,
            reason: None,
            attempt: None,
        }
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a task name.
    #[inline]
    pub fn with_task(mut self, task: impl Into<Arc<str>>) -> Self {
        self.task = Some(task.into());
        self
    }

    /// Attaches a frame counter or reaction generation.
    #[inline]
    pub fn with_attempt(mut self, n: u64) -> Self {
        self.attempt = Some(n);
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_task(subscriber)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_task(subscriber)
            .with_reason(info)
    }

    #[inline]
    pub fn is_subscriber_overflow(&self) -> bool {
        matches!(self.kind, EventKind::SubscriberOverflow)
    }

    /// Returns `true` for the terminal diagnostics of emitters and reactors.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.kind,
            EventKind::EmitterCancelled
                | EventKind::EmitterCompleted
                | EventKind::EmitterFailed
                | EventKind::ReactorCancelled
                | EventKind::ReactorCompleted
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_is_monotonic() {
        let a = Event::new(EventKind::EmitterStarting);
        let b = Event::new(EventKind::ValueReceived);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn terminal_kinds() {
        assert!(Event::new(EventKind::ReactorCompleted).is_terminal());
        assert!(Event::new(EventKind::EmitterCancelled).is_terminal());
        assert!(!Event::new(EventKind::ReactionCancelled).is_terminal());
    }

    #[test]
    fn overflow_event_names_subscriber() {
        let ev = Event::subscriber_overflow("audit", "full");
        assert!(ev.is_subscriber_overflow());
        assert_eq!(ev.task.as_deref(), Some("audit"));
        assert_eq!(ev.reason.as_deref(), Some("subscriber=audit reason=full"));
    }
}

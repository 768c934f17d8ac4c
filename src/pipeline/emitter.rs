//! # Value-emitting task.
//!
//! Pulls frames from a [`CallbackBridge`] and dispatches each one as an
//! [`Action`](crate::Action).
//!
//! ## State machine
//! ```text
//! WaitingForValue ──frame──► Emitting ──repeating──► WaitingForValue
//!        │                      └──one-shot──► Terminated(OneShot)
//!        └──bridge closed──► Terminated(SourceClosed)
//!
//! any state ──token cancelled──► Terminated (reported as cancelled)
//! ```
//!
//! ## Rules
//! - Frames are dispatched in delivery order.
//! - The slot for the next frame is armed in the same poll that dispatched the
//!   previous one, so a listener that reacts to an action never races the re-arm.
//! - A pull that never resolves suspends until the token is cancelled.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::actions::{Dispatcher, EventBuilder};
use crate::bridge::CallbackBridge;
use crate::error::TaskError;
use crate::events::{Bus, Event, EventKind};

/// Why the emitter stopped on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Exit {
    OneShot,
    SourceClosed,
}

impl Exit {
    fn as_reason(self) -> &'static str {
        match self {
            Exit::OneShot => "one_shot",
            Exit::SourceClosed => "source_closed",
        }
    }
}

enum EmitterState<P> {
    WaitingForValue,
    Emitting(P),
    Terminated(Exit),
}

pub(crate) struct Emitter<P: Clone> {
    name: Arc<str>,
    bridge: Arc<CallbackBridge<P>>,
    builder: EventBuilder<P>,
    dispatcher: Dispatcher<P>,
    repeating: bool,
    bus: Bus,
}

impl<P> Emitter<P>
where
    P: Clone + Send + Sync + 'static,
{
    pub(crate) fn new(
        name: Arc<str>,
        bridge: Arc<CallbackBridge<P>>,
        builder: EventBuilder<P>,
        dispatcher: Dispatcher<P>,
        repeating: bool,
        bus: Bus,
    ) -> Self {
        Self {
            name,
            bridge,
            builder,
            dispatcher,
            repeating,
            bus,
        }
    }

    /// Runs until one-shot completion, source closure or cancellation.
    ///
    /// Returns `Err(TaskError::Canceled)` iff `ctx` was cancelled first.
    pub(crate) async fn run(self: Arc<Self>, ctx: CancellationToken) -> Result<(), TaskError> {
        self.publish(Event::new(EventKind::EmitterStarting));

        let exit = tokio::select! {
            biased;
            _ = ctx.cancelled() => None,
            exit = self.drive() => Some(exit),
        };

        match exit {
            Some(exit) => {
                self.publish(Event::new(EventKind::EmitterCompleted).with_reason(exit.as_reason()));
                Ok(())
            }
            None => {
                self.publish(Event::new(EventKind::EmitterCancelled));
                Err(TaskError::Canceled)
            }
        }
    }

    async fn drive(&self) -> Exit {
        let mut state = EmitterState::WaitingForValue;
        let mut frames: u64 = 0;

        loop {
            state = match state {
                EmitterState::WaitingForValue => match self.bridge.next_value().await {
                    Some(payload) => {
                        frames += 1;
                        self.publish(Event::new(EventKind::ValueReceived).with_attempt(frames));
                        EmitterState::Emitting(payload)
                    }
                    None => EmitterState::Terminated(Exit::SourceClosed),
                },
                EmitterState::Emitting(payload) => {
                    let action = self.builder.build(payload);
                    let kind = Arc::clone(&action.kind);
                    self.dispatcher.dispatch(action);
                    self.publish(
                        Event::new(EventKind::ValueEmitted)
                            .with_attempt(frames)
                            .with_reason(kind),
                    );
                    if self.repeating {
                        EmitterState::WaitingForValue
                    } else {
                        EmitterState::Terminated(Exit::OneShot)
                    }
                }
                EmitterState::Terminated(exit) => return exit,
            };
        }
    }

    fn publish(&self, ev: Event) {
        self.bus.publish(ev.with_task(Arc::clone(&self.name)));
    }
}

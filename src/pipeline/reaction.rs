//! # Reactions: tasks derived from an event payload.
//!
//! A [`Reaction`] is the consumer-supplied factory the reactor calls once per
//! event. Each call produces a future that receives the payload and a child
//! [`CancellationToken`]; it must observe the token and return after its own
//! cleanup.
//!
//! ## Outcome reporting
//! ```text
//! Ok(())               → ReactionStopped   (ReactionCancelled if the token was cancelled)
//! Err(Canceled)        → ReactionCancelled
//! Err(Fail / Fatal)    → ReactionFailed
//! panic                → ReactionFailed (reason "reaction_panic")
//! ```
//! Outcomes are diagnostics only; the reactor never propagates them.

use std::borrow::Cow;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::error::TaskError;
use crate::events::{Bus, Event, EventKind};
use crate::tasks::BoxTaskFuture;

type ReactionFn<P> = dyn Fn(P, CancellationToken) -> BoxTaskFuture + Send + Sync;

/// Function-backed reaction factory.
///
/// ## Example
/// ```rust
/// use tokio_util::sync::{CancellationToken, DropGuard};
/// use callvisor::{Reaction, TaskError};
///
/// let follow = Reaction::new("follow", |room: String, ctx: CancellationToken| async move {
///     // subscribe to `room` until replaced or cancelled
///     ctx.cancelled().await;
///     let _ = room;
///     Ok::<_, TaskError>(())
/// });
/// assert_eq!(follow.name(), "follow");
/// ```
pub struct Reaction<P> {
    name: Cow<'static, str>,
    f: Arc<ReactionFn<P>>,
}

impl<P> Clone for Reaction<P> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            f: Arc::clone(&self.f),
        }
    }
}

impl<P> fmt::Debug for Reaction<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reaction").field("name", &self.name).finish()
    }
}

impl<P: Send + 'static> Reaction<P> {
    /// Creates a reaction from a closure producing a fresh future per event.
    pub fn new<F, Fut>(name: impl Into<Cow<'static, str>>, f: F) -> Self
    where
        F: Fn(P, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), TaskError>> + Send + 'static,
    {
        let f: Arc<ReactionFn<P>> =
            Arc::new(move |payload: P, ctx: CancellationToken| -> BoxTaskFuture {
                Box::pin(f(payload, ctx))
            });
        Self {
            name: name.into(),
            f,
        }
    }

    /// Returns the reaction name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Produces the future for one payload.
    pub fn spawn(&self, payload: P, ctx: CancellationToken) -> BoxTaskFuture {
        (self.f)(payload, ctx)
    }
}

/// Handle to the single reaction a reactor keeps in flight.
///
/// Dropping the handle cancels the reaction.
pub(crate) struct RunningReaction {
    generation: u64,
    token: CancellationToken,
    _guard: DropGuard,
    join: JoinHandle<()>,
    task: Arc<str>,
    bus: Bus,
}

impl RunningReaction {
    /// Forks the reaction for `payload` under `token`.
    pub(crate) fn fork<P: Send + 'static>(
        reaction: &Reaction<P>,
        payload: P,
        token: CancellationToken,
        task: Arc<str>,
        bus: Bus,
        generation: u64,
    ) -> Self {
        bus.publish(
            Event::new(EventKind::ReactionStarted)
                .with_task(Arc::clone(&task))
                .with_attempt(generation),
        );
        let fut = reaction.spawn(payload, token.clone());
        let join = tokio::spawn(report(
            fut,
            token.clone(),
            Arc::clone(&task),
            bus.clone(),
            generation,
        ));
        Self {
            generation,
            _guard: token.clone().drop_guard(),
            token,
            join,
            task,
            bus,
        }
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn is_running(&self) -> bool {
        !self.join.is_finished()
    }

    /// Cancels the reaction and waits for its own cleanup to finish.
    pub(crate) async fn stop(self) {
        self.token.cancel();
        let res = self.join.await;
        if res.is_err() {
            publish_panic(&self.bus, &self.task, self.generation);
        }
    }

    /// Waits for the reaction to finish on its own.
    pub(crate) async fn finished(&mut self) {
        if (&mut self.join).await.is_err() {
            publish_panic(&self.bus, &self.task, self.generation);
        }
    }
}

/// Runs one reaction future and publishes exactly one outcome event.
async fn report(
    fut: BoxTaskFuture,
    token: CancellationToken,
    task: Arc<str>,
    bus: Bus,
    generation: u64,
) {
    let kind = match fut.await {
        Ok(()) if token.is_cancelled() => EventKind::ReactionCancelled,
        Ok(()) => EventKind::ReactionStopped,
        Err(TaskError::Canceled) => EventKind::ReactionCancelled,
        Err(e) => {
            bus.publish(
                Event::new(EventKind::ReactionFailed)
                    .with_task(task)
                    .with_attempt(generation)
                    .with_reason(e.to_string()),
            );
            return;
        }
    };
    bus.publish(Event::new(kind).with_task(task).with_attempt(generation));
}

fn publish_panic(bus: &Bus, task: &Arc<str>, generation: u64) {
    bus.publish(
        Event::new(EventKind::ReactionFailed)
            .with_task(Arc::clone(task))
            .with_attempt(generation)
            .with_reason("reaction_panic"),
    );
}

//! # CallbackReactor: latest-wins reactive dispatch supervisor.
//!
//! Forks the value-emitting task in the background, then races the next
//! matching event against the cancel signal. Every event replaces the running
//! reaction; the cancel signal tears everything down.
//!
//! ## Transition table
//! ```text
//! current reaction   occurrence        action
//! ─────────────────  ────────────────  ───────────────────────────────────────────
//! none / finished    event(payload)    fork reaction(payload)
//! running            event(payload)    cancel + await reaction, fork reaction(payload)
//! none / finished    cancel signal     cancel + await emitter, terminate
//! running            cancel signal     cancel + await reaction, then emitter, terminate
//! any                ctx cancelled     same as cancel signal, reported as cancelled
//! finished           (one-shot, no cancel signal configured) terminate
//! none               emitter exited (one-shot, no cancel signal) terminate
//! ```
//!
//! ## Rules
//! - At most one reaction is in flight; a replaced reaction has fully finished
//!   its cleanup before the next one is forked.
//! - Events and the cancel signal come from one dispatcher receiver, so each
//!   loop turn acts on exactly one occurrence, in dispatch order.
//! - The dispatcher is subscribed **before** the emitter is forked: the first
//!   emitted event cannot be missed.
//! - After termination the receiver is dropped; later actions have no effect.
//! - The reactor keeps its own dispatcher handle, so the dispatch channel stays
//!   open while it runs even if every caller-held [`Dispatcher`] is dropped.
//! - Dropping the `run` future cancels the reaction and the emitter.

use std::sync::Arc;

use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::actions::{Action, Dispatcher, EventSpec};
use crate::bridge::{CallbackBridge, Resolver};
use crate::error::{ConfigError, TaskError};
use crate::events::{Bus, Event, EventKind};
use crate::pipeline::config::{PipelineConfig, Resolved, Source};
use crate::pipeline::emitter::Emitter;
use crate::pipeline::reaction::{Reaction, RunningReaction};
use crate::tasks::{BoxTaskFuture, Task};

/// Builder for [`CallbackReactor`].
pub struct CallbackReactorBuilder<P: Clone> {
    cfg: PipelineConfig<P>,
    reaction: Reaction<P>,
}

impl<P> CallbackReactorBuilder<P>
where
    P: Clone + Send + Sync + 'static,
{
    /// Pulls repeatedly (`true`, default) or reacts to a single frame (`false`).
    pub fn repeating(mut self, repeating: bool) -> Self {
        self.cfg.repeating = repeating;
        self
    }

    /// Terminates the reactor when an action of this kind is dispatched.
    pub fn cancel_on(mut self, kind: impl Into<Arc<str>>) -> Self {
        self.cfg.cancel_on = Some(kind.into());
        self
    }

    /// Injects the diagnostic bus (shared with the emitter and reactions).
    pub fn with_bus(mut self, bus: Bus) -> Self {
        self.cfg.bus = Some(bus);
        self
    }

    /// Registers the callback configurer (invoked once, by [`build`](Self::build)).
    pub fn configure<F>(mut self, configurer: F) -> Self
    where
        F: FnOnce(Resolver<P>) + Send + 'static,
    {
        self.cfg.source = Source::Configurer(Box::new(configurer));
        self
    }

    /// Uses an already constructed bridge instead of a configurer.
    pub fn with_bridge(mut self, bridge: Arc<CallbackBridge<P>>) -> Self {
        self.cfg.source = Source::Bridge(bridge);
        self
    }

    /// Validates the configuration and builds the reactor.
    pub fn build(self) -> Result<CallbackReactor<P>, ConfigError> {
        Ok(CallbackReactor {
            inner: Arc::new(ReactorInner {
                pipeline: self.cfg.resolve()?,
                reaction: self.reaction,
            }),
        })
    }
}

struct ReactorInner<P: Clone> {
    pipeline: Resolved<P>,
    reaction: Reaction<P>,
}

impl<P: Clone> ReactorInner<P> {
    /// One-shot without a cancel signal ends with its reaction.
    fn ends_with_reaction(&self) -> bool {
        !self.pipeline.repeating && self.pipeline.cancel_on.is_none()
    }
}

/// Reactive dispatch supervisor over one callback source.
///
/// ## Example
/// ```rust
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use tokio_util::sync::CancellationToken;
/// use callvisor::{CallbackReactor, Dispatcher, EventSpec, Reaction, TaskError};
///
/// let dispatcher = Dispatcher::<String>::new(16);
/// let follow = Reaction::new("follow", |room: String, ctx: CancellationToken| async move {
///     let _ = room;
///     ctx.cancelled().await;
///     Ok::<_, TaskError>(())
/// });
///
/// let reactor = CallbackReactor::builder("rooms", dispatcher.clone(), EventSpec::named("ROOM"), follow)
///     .cancel_on("LOGOUT")
///     .configure(|_resolve| { /* hand the resolver to the callback source */ })
///     .build()?;
///
/// let run = tokio::spawn({
///     let reactor = reactor.clone();
///     async move { reactor.run(CancellationToken::new()).await }
/// });
/// tokio::task::yield_now().await;
/// dispatcher.signal("LOGOUT");
/// run.await??;
/// # Ok(())
/// # }
/// ```
pub struct CallbackReactor<P: Clone> {
    inner: Arc<ReactorInner<P>>,
}

impl<P: Clone> Clone for CallbackReactor<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// What one loop turn observed.
enum Occurrence<P> {
    Event(P),
    Signal,
    ReactionDone,
    EmitterDone,
    Shutdown,
}

/// Why the loop ended.
#[derive(Clone, Copy)]
enum Exit {
    Signal,
    ReactionDone,
    EmitterDone,
    Cancelled,
}

impl Exit {
    fn as_reason(self) -> &'static str {
        match self {
            Exit::Signal => "cancel_signal",
            Exit::ReactionDone => "reaction_done",
            Exit::EmitterDone => "emitter_done",
            Exit::Cancelled => "cancelled",
        }
    }
}

/// Background emitter handle, cancelled exactly once (or when dropped).
struct Background {
    token: CancellationToken,
    _guard: DropGuard,
    join: Option<JoinHandle<Result<(), TaskError>>>,
    task: Arc<str>,
    bus: Bus,
}

impl Background {
    fn fork<P>(emitter: &Arc<Emitter<P>>, token: CancellationToken, task: Arc<str>, bus: Bus) -> Self
    where
        P: Clone + Send + Sync + 'static,
    {
        let join = tokio::spawn(Arc::clone(emitter).run(token.clone()));
        Self {
            _guard: token.clone().drop_guard(),
            token,
            join: Some(join),
            task,
            bus,
        }
    }

    fn is_running(&self) -> bool {
        self.join.is_some()
    }

    /// Resolves when the emitter exits on its own; never once it was joined.
    async fn exited(&mut self) {
        let Some(join) = self.join.as_mut() else {
            return std::future::pending().await;
        };
        let res = join.await;
        self.join = None;
        self.report(res);
    }

    async fn stop(mut self) {
        self.token.cancel();
        if let Some(join) = self.join.take() {
            let res = join.await;
            self.report(res);
        }
    }

    fn report(&self, res: Result<Result<(), TaskError>, JoinError>) {
        if matches!(&res, Err(e) if e.is_panic()) {
            self.bus.publish(
                Event::new(EventKind::EmitterFailed)
                    .with_task(Arc::clone(&self.task))
                    .with_reason("emitter_panic"),
            );
        }
    }
}

impl<P> CallbackReactor<P>
where
    P: Clone + Send + Sync + 'static,
{
    /// Starts a builder; a configurer (or bridge) must be supplied before `build`.
    pub fn builder(
        name: impl Into<Arc<str>>,
        dispatcher: Dispatcher<P>,
        spec: impl Into<EventSpec<P>>,
        reaction: Reaction<P>,
    ) -> CallbackReactorBuilder<P> {
        CallbackReactorBuilder {
            cfg: PipelineConfig::new(name, dispatcher, spec.into()),
            reaction,
        }
    }

    /// Reactor name.
    pub fn name(&self) -> &str {
        &self.inner.pipeline.name
    }

    /// Runs the supervisor loop.
    ///
    /// Returns `Ok(())` when it terminated on its own (cancel signal, finished
    /// one-shot reaction, exited one-shot emitter) and `Err(TaskError::Canceled)`
    /// when `ctx` was cancelled.
    pub async fn run(&self, ctx: CancellationToken) -> Result<(), TaskError> {
        let inner = &self.inner;
        let p = &inner.pipeline;
        self.publish(Event::new(EventKind::ReactorStarting));

        let mut rx = p.dispatcher.subscribe();
        let mut background =
            Background::fork(&p.emitter, ctx.child_token(), Arc::clone(&p.name), p.bus.clone());
        let mut current: Option<RunningReaction> = None;
        let mut generation: u64 = 0;
        let ends_with_reaction = inner.ends_with_reaction();

        let exit = loop {
            let watch_reaction = ends_with_reaction && current.is_some();
            let watch_emitter = ends_with_reaction && background.is_running();
            let occurrence = tokio::select! {
                biased;
                _ = ctx.cancelled() => Occurrence::Shutdown,
                next = self.next_occurrence(&mut rx) => next,
                _ = wait_finished(&mut current), if watch_reaction => {
                    Occurrence::ReactionDone
                }
                _ = background.exited(), if watch_emitter => Occurrence::EmitterDone,
            };

            match occurrence {
                Occurrence::Event(payload) => {
                    if let Some(previous) = current.take() {
                        if previous.is_running() {
                            self.publish(
                                Event::new(EventKind::ReactionReplaced)
                                    .with_attempt(previous.generation()),
                            );
                        }
                        previous.stop().await;
                    }
                    generation += 1;
                    current = Some(RunningReaction::fork(
                        &inner.reaction,
                        payload,
                        ctx.child_token(),
                        Arc::clone(&p.name),
                        p.bus.clone(),
                        generation,
                    ));
                }
                Occurrence::Signal => {
                    if let Some(signal) = &p.cancel_on {
                        self.publish(
                            Event::new(EventKind::CancelSignalReceived)
                                .with_reason(Arc::clone(signal)),
                        );
                    }
                    break Exit::Signal;
                }
                Occurrence::ReactionDone => {
                    current = None;
                    break Exit::ReactionDone;
                }
                // Nothing left to react to; a running reaction still ends the loop.
                Occurrence::EmitterDone if current.is_none() => break Exit::EmitterDone,
                Occurrence::EmitterDone => {}
                Occurrence::Shutdown => break Exit::Cancelled,
            }
        };
        drop(rx);

        if let Some(running) = current.take() {
            running.stop().await;
        }
        background.stop().await;

        match exit {
            Exit::Cancelled => {
                self.publish(Event::new(EventKind::ReactorCancelled));
                Err(TaskError::Canceled)
            }
            other => {
                self.publish(Event::new(EventKind::ReactorCompleted).with_reason(other.as_reason()));
                Ok(())
            }
        }
    }

    /// Waits for the next matching event or the cancel signal.
    ///
    /// Cancel safe: an action is only consumed when this returns.
    async fn next_occurrence(&self, rx: &mut broadcast::Receiver<Action<P>>) -> Occurrence<P> {
        let p = &self.inner.pipeline;
        loop {
            match rx.recv().await {
                Ok(action) => {
                    if p.cancel_on.as_deref().is_some_and(|s| action.is(s)) {
                        return Occurrence::Signal;
                    }
                    if action.kind == p.event_kind {
                        match action.payload {
                            Some(payload) => return Occurrence::Event(payload),
                            None => self.publish(
                                Event::new(EventKind::EventIgnored).with_reason(action.kind),
                            ),
                        }
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    self.publish(
                        Event::new(EventKind::DispatchLagged).with_reason(format!("skipped={skipped}")),
                    );
                }
                // `p.dispatcher` keeps a sender alive for as long as the reactor.
                Err(RecvError::Closed) => return std::future::pending().await,
            }
        }
    }

    fn publish(&self, ev: Event) {
        let p = &self.inner.pipeline;
        p.bus.publish(ev.with_task(Arc::clone(&p.name)));
    }
}

impl<P> Task for CallbackReactor<P>
where
    P: Clone + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.inner.pipeline.name
    }

    fn spawn(&self, ctx: CancellationToken) -> BoxTaskFuture {
        let me = self.clone();
        Box::pin(async move { me.run(ctx).await })
    }
}

/// Resolves when the current reaction finishes; never if there is none.
async fn wait_finished(current: &mut Option<RunningReaction>) {
    match current {
        Some(running) => running.finished().await,
        None => std::future::pending().await,
    }
}

//! # Runtime: hosts pipelines and reactors, fans out diagnostics, shuts down gracefully.
//!
//! The [`Runtime`] owns the diagnostic [`Bus`], a [`SubscriberSet`] and the runtime
//! cancellation token. Every spawned [`Task`](crate::Task) runs under a child of that
//! token, so one `shutdown()` stops all emitters, reactors and their reactions.
//!
//! ```text
//! Runtime::spawn(task) ──► JoinSet ──► run_once(task, runtime_token.child_token())
//!                                           │
//!                                           └─► Bus ──► listener ──► SubscriberSet::emit()
//!
//! Shutdown path:
//!   shutdown() / run_until(trigger) / run_until_signal()
//!       └─► Bus.publish(ShutdownRequested, reason = trigger)
//!       └─► runtime_token.cancel()        → propagates to every task
//!       └─► wait within cfg.grace:
//!              ├─ all joined → Bus.publish(AllStoppedWithin)
//!              └─ timeout    → Bus.publish(GraceExceeded) + RuntimeError::GraceExceeded
//! ```
//!
//! ## Example
//! ```rust
//! use callvisor::{Config, Runtime, TaskError, TaskFn, TaskRef};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let rt = Runtime::builder(Config::default()).build();
//!
//!     let idle: TaskRef = TaskFn::arc("idle", |ctx: CancellationToken| async move {
//!         ctx.cancelled().await;
//!         Ok::<_, TaskError>(())
//!     });
//!     rt.spawn(idle);
//!
//!     rt.shutdown().await?;
//!     Ok(())
//! }
//! ```

use std::{
    collections::BTreeMap,
    future::Future,
    sync::{
        Arc, Mutex, MutexGuard,
        atomic::{AtomicU64, Ordering},
    },
};

use tokio::{
    sync::{broadcast::error::RecvError, watch},
    task::{AbortHandle, JoinHandle},
};
use tokio_util::sync::CancellationToken;

use super::{builder::RuntimeBuilder, config::Config, runner, shutdown};
use crate::{
    error::RuntimeError,
    events::{Bus, Event, EventKind},
    subscribers::SubscriberSet,
    tasks::TaskRef,
};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

struct Entry {
    name: Arc<str>,
    abort: Option<AbortHandle>,
}

/// Tasks that have not finished yet, keyed by spawn order.
struct Tracker {
    entries: Mutex<BTreeMap<u64, Entry>>,
    count: watch::Sender<usize>,
}

impl Tracker {
    fn new() -> Self {
        let (count, _) = watch::channel(0);
        Self {
            entries: Mutex::new(BTreeMap::new()),
            count,
        }
    }

    fn insert(&self, id: u64, name: Arc<str>) {
        let mut entries = lock(&self.entries);
        entries.insert(id, Entry { name, abort: None });
        self.count.send_replace(entries.len());
    }

    fn attach(&self, id: u64, abort: AbortHandle) {
        if let Some(entry) = lock(&self.entries).get_mut(&id) {
            entry.abort = Some(abort);
        }
    }

    fn remove(&self, id: u64) {
        let mut entries = lock(&self.entries);
        entries.remove(&id);
        self.count.send_replace(entries.len());
    }

    fn names(&self) -> Vec<String> {
        lock(&self.entries)
            .values()
            .map(|e| e.name.to_string())
            .collect()
    }

    fn abort_all(&self) {
        for entry in lock(&self.entries).values() {
            if let Some(abort) = &entry.abort {
                abort.abort();
            }
        }
    }

    async fn idle(&self) {
        let mut rx = self.count.subscribe();
        let _ = rx.wait_for(|n| *n == 0).await;
    }
}

/// Removes a task from the tracker when its future finishes or is dropped.
struct AliveGuard {
    id: u64,
    tracker: Arc<Tracker>,
}

impl Drop for AliveGuard {
    fn drop(&mut self) {
        self.tracker.remove(self.id);
    }
}

/// Host runtime for callback pipelines and reactors.
pub struct Runtime {
    cfg: Config,
    bus: Bus,
    token: CancellationToken,
    tracker: Arc<Tracker>,
    next_id: AtomicU64,
    listener: JoinHandle<()>,
}

impl Runtime {
    /// Starts building a runtime.
    pub fn builder(cfg: Config) -> RuntimeBuilder {
        RuntimeBuilder::new(cfg)
    }

    pub(super) fn new_internal(cfg: Config, bus: Bus, subs: SubscriberSet) -> Self {
        let listener = Self::subscriber_listener(&bus, subs);
        Self {
            cfg,
            bus,
            token: CancellationToken::new(),
            tracker: Arc::new(Tracker::new()),
            next_id: AtomicU64::new(1),
            listener,
        }
    }

    /// Forwards bus events to the subscriber set until the bus closes.
    fn subscriber_listener(bus: &Bus, subs: SubscriberSet) -> JoinHandle<()> {
        let mut rx = bus.subscribe();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(ev) => subs.emit(&ev),
                    Err(RecvError::Lagged(_)) => continue,
                    Err(RecvError::Closed) => break,
                }
            }
            subs.shutdown().await;
        })
    }

    /// Diagnostic bus shared by every task on this runtime.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Runtime configuration.
    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Runtime cancellation token; cancelling it stops every spawned task.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Names of the tasks that have not finished yet, in spawn order.
    pub fn alive(&self) -> Vec<String> {
        self.tracker.names()
    }

    /// Spawns a task under a child of the runtime token.
    ///
    /// Must be called inside a tokio runtime.
    pub fn spawn(&self, task: TaskRef) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.tracker.insert(id, Arc::from(task.name()));

        let guard = AliveGuard {
            id,
            tracker: Arc::clone(&self.tracker),
        };
        let bus = self.bus.clone();
        let parent = self.token.clone();

        let handle = tokio::spawn(async move {
            let _guard = guard;
            let _ = runner::run_once(task.as_ref(), &parent, &bus).await;
        });
        self.tracker.attach(id, handle.abort_handle());
    }

    /// Waits until every spawned task has finished.
    ///
    /// Cancellation safe: dropping the future leaves the tasks running.
    pub async fn wait(&self) {
        self.tracker.idle().await;
    }

    /// Cancels every task and waits for them within [`Config::grace`].
    ///
    /// Publishes [`EventKind::AllStoppedWithin`] on success, or
    /// [`EventKind::GraceExceeded`] and returns [`RuntimeError::GraceExceeded`]
    /// listing the tasks still running. Those tasks are aborted afterwards.
    pub async fn shutdown(&self) -> Result<(), RuntimeError> {
        self.shutdown_because("requested").await
    }

    async fn shutdown_because(&self, reason: &'static str) -> Result<(), RuntimeError> {
        self.bus
            .publish(Event::new(EventKind::ShutdownRequested).with_reason(reason));
        self.token.cancel();

        let grace = self.cfg.grace;
        match tokio::time::timeout(grace, self.wait()).await {
            Ok(()) => {
                self.bus.publish(Event::new(EventKind::AllStoppedWithin));
                Ok(())
            }
            Err(_) => {
                self.bus.publish(Event::new(EventKind::GraceExceeded));
                let stuck = self.tracker.names();
                self.tracker.abort_all();
                Err(RuntimeError::GraceExceeded { grace, stuck })
            }
        }
    }

    /// Runs until every task finishes or `trigger` completes.
    ///
    /// When `trigger` wins, performs [`Runtime::shutdown`].
    pub async fn run_until<F>(&self, trigger: F) -> Result<(), RuntimeError>
    where
        F: Future<Output = ()>,
    {
        self.drive_until(async {
            trigger.await;
            Some("requested")
        })
        .await
    }

    /// Runs until every task finishes or a termination signal arrives.
    ///
    /// On a signal performs [`Runtime::shutdown`], with the signal as the
    /// `ShutdownRequested` reason. If signal handlers cannot be installed,
    /// waits for the tasks to finish on their own.
    pub async fn run_until_signal(&self) -> Result<(), RuntimeError> {
        self.drive_until(async {
            shutdown::termination()
                .await
                .ok()
                .map(shutdown::ShutdownSignal::as_label)
        })
        .await
    }

    /// `None` from `trigger` means it can never fire.
    async fn drive_until<F>(&self, trigger: F) -> Result<(), RuntimeError>
    where
        F: Future<Output = Option<&'static str>>,
    {
        tokio::select! {
            fired = trigger => match fired {
                Some(reason) => self.shutdown_because(reason).await,
                None => {
                    self.wait().await;
                    Ok(())
                }
            },
            _ = self.wait() => Ok(()),
        }
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        self.token.cancel();
        self.listener.abort();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{error::TaskError, tasks::TaskFn};

    #[tokio::test(flavor = "current_thread")]
    async fn shutdown_stops_cooperative_tasks() {
        let rt = Runtime::builder(Config::default()).build();
        let mut rx = rt.bus().subscribe();

        rt.spawn(TaskFn::arc("idle", |ctx: CancellationToken| async move {
            ctx.cancelled().await;
            Ok::<_, TaskError>(())
        }));
        assert_eq!(rt.alive(), vec!["idle".to_string()]);

        rt.shutdown().await.unwrap();
        assert!(rt.alive().is_empty());

        let mut kinds = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            kinds.push(ev.kind);
        }
        assert!(kinds.contains(&EventKind::TaskStopped));
        assert_eq!(kinds.last(), Some(&EventKind::AllStoppedWithin));
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn shutdown_reports_stuck_tasks() {
        let cfg = Config {
            grace: Duration::from_millis(50),
            ..Config::default()
        };
        let rt = Runtime::builder(cfg).build();

        rt.spawn(TaskFn::arc("stubborn", |_ctx: CancellationToken| async move {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok::<_, TaskError>(())
        }));
        tokio::task::yield_now().await;

        match rt.shutdown().await {
            Err(RuntimeError::GraceExceeded { stuck, .. }) => {
                assert_eq!(stuck, vec!["stubborn".to_string()]);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test(flavor = "current_thread")]
    async fn wait_returns_when_tasks_finish() {
        let rt = Runtime::builder(Config::default()).build();
        rt.spawn(TaskFn::arc("quick", |_ctx: CancellationToken| async {
            Ok::<_, TaskError>(())
        }));
        rt.wait().await;
        assert!(rt.alive().is_empty());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn run_until_shuts_down_when_triggered() {
        let rt = Runtime::builder(Config::default()).build();
        let mut rx = rt.bus().subscribe();

        rt.spawn(TaskFn::arc("idle", |ctx: CancellationToken| async move {
            ctx.cancelled().await;
            Ok::<_, TaskError>(())
        }));
        rt.run_until(tokio::task::yield_now()).await.unwrap();
        assert!(rt.alive().is_empty());

        let mut requested = None;
        while let Ok(ev) = rx.try_recv() {
            if ev.kind == EventKind::ShutdownRequested {
                requested = ev.reason.clone();
            }
        }
        assert_eq!(requested.as_deref(), Some("requested"));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn run_until_returns_once_tasks_finish() {
        let rt = Runtime::builder(Config::default()).build();
        let mut rx = rt.bus().subscribe();

        rt.spawn(TaskFn::arc("quick", |_ctx: CancellationToken| async {
            Ok::<_, TaskError>(())
        }));
        rt.run_until(std::future::pending::<()>()).await.unwrap();
        assert!(rt.alive().is_empty());

        while let Ok(ev) = rx.try_recv() {
            assert_ne!(ev.kind, EventKind::ShutdownRequested);
        }
    }

    #[tokio::test(flavor = "current_thread")]
    async fn unavailable_trigger_falls_back_to_waiting() {
        let rt = Runtime::builder(Config::default()).build();
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();

        let gate = Arc::new(Mutex::new(Some(rx)));
        rt.spawn(TaskFn::arc("gated", move |_ctx: CancellationToken| {
            let gate = gate.lock().ok().and_then(|mut g| g.take());
            async move {
                if let Some(gate) = gate {
                    let _ = gate.await;
                }
                Ok::<_, TaskError>(())
            }
        }));
        let drive = rt.drive_until(async { None });
        let release = async {
            tokio::task::yield_now().await;
            assert_eq!(rt.alive(), vec!["gated".to_string()]);
            let _ = tx.send(());
        };
        let (res, ()) = tokio::join!(drive, release);
        res.unwrap();
        assert!(rt.alive().is_empty());
    }
}

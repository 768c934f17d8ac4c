//! # CallbackPipeline: bridge-to-event pipeline.
//!
//! Forks the value-emitting task over a callback source and waits for it.
//! With a cancel signal configured, observing that signal on the dispatcher
//! cancels the emitter (cooperatively, waiting for its cleanup) and ends the
//! pipeline.
//!
//! ```text
//! run(ctx)
//!   ├─► subscribe to dispatcher (only if a cancel signal is set)
//!   ├─► emitter.run(child token)
//!   └─► first of:
//!         ├─ emitter finished   → return its result
//!         └─ cancel signal seen → cancel emitter, await it, return Ok
//! ```

use std::sync::Arc;

use tokio::sync::broadcast::{self, error::RecvError};
use tokio_util::sync::CancellationToken;

use crate::actions::{Action, Dispatcher, EventSpec};
use crate::bridge::{CallbackBridge, Resolver};
use crate::error::{ConfigError, TaskError};
use crate::events::Bus;
use crate::pipeline::config::{PipelineConfig, Resolved, Source};
use crate::tasks::{BoxTaskFuture, Task};

/// Builder for [`CallbackPipeline`].
pub struct CallbackPipelineBuilder<P: Clone> {
    cfg: PipelineConfig<P>,
}

impl<P> CallbackPipelineBuilder<P>
where
    P: Clone + Send + Sync + 'static,
{
    /// Pulls repeatedly (`true`, default) or emits a single event (`false`).
    pub fn repeating(mut self, repeating: bool) -> Self {
        self.cfg.repeating = repeating;
        self
    }

    /// Stops the pipeline when an action of this kind is dispatched.
    pub fn cancel_on(mut self, kind: impl Into<Arc<str>>) -> Self {
        self.cfg.cancel_on = Some(kind.into());
        self
    }

    /// Injects the diagnostic bus.
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

    /// Validates the configuration and builds the pipeline.
    pub fn build(self) -> Result<CallbackPipeline<P>, ConfigError> {
        Ok(CallbackPipeline {
            inner: Arc::new(self.cfg.resolve()?),
        })
    }
}

/// One callback source feeding actions into a dispatcher.
///
/// ## Example
/// ```rust
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use tokio_util::sync::CancellationToken;
/// use callvisor::{CallbackPipeline, Dispatcher, EventSpec};
///
/// let dispatcher = Dispatcher::<u32>::new(16);
/// let mut rx = dispatcher.subscribe();
///
/// let pipeline = CallbackPipeline::builder("ready", dispatcher, EventSpec::named("READY"))
///     .repeating(false)
///     .configure(|resolve| {
///         std::thread::spawn(move || {
///             std::thread::sleep(std::time::Duration::from_millis(10));
///             resolve.resolve(1);
///         });
///     })
///     .build()?;
///
/// pipeline.run(CancellationToken::new()).await?;
/// assert_eq!(rx.recv().await?.payload, Some(1));
/// # Ok(())
/// # }
/// ```
pub struct CallbackPipeline<P: Clone> {
    inner: Arc<Resolved<P>>,
}

impl<P> Clone for CallbackPipeline<P>
where
    P: Clone,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<P> CallbackPipeline<P>
where
    P: Clone + Send + Sync + 'static,
{
    /// Starts a builder; a configurer (or bridge) must be supplied before `build`.
    pub fn builder(
        name: impl Into<Arc<str>>,
        dispatcher: Dispatcher<P>,
        spec: impl Into<EventSpec<P>>,
    ) -> CallbackPipelineBuilder<P> {
        CallbackPipelineBuilder {
            cfg: PipelineConfig::new(name, dispatcher, spec.into()),
        }
    }

    /// Pipeline name.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Runs the pipeline until the emitter finishes, the cancel signal arrives,
    /// or `ctx` is cancelled (`Err(TaskError::Canceled)`).
    pub async fn run(&self, ctx: CancellationToken) -> Result<(), TaskError> {
        let inner = &self.inner;
        let mut signals = inner.cancel_on.as_ref().map(|_| inner.dispatcher.subscribe());

        let token = ctx.child_token();
        let emit = Arc::clone(&inner.emitter).run(token.clone());
        tokio::pin!(emit);

        tokio::select! {
            res = &mut emit => res,
            _ = wait_signal(signals.as_mut(), inner.cancel_on.as_deref()) => {
                token.cancel();
                match emit.await {
                    Err(TaskError::Canceled) if !ctx.is_cancelled() => Ok(()),
                    other => other,
                }
            }
        }
    }
}

impl<P> Task for CallbackPipeline<P>
where
    P: Clone + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.inner.name
    }

    fn spawn(&self, ctx: CancellationToken) -> BoxTaskFuture {
        let me = self.clone();
        Box::pin(async move { me.run(ctx).await })
    }
}

/// Resolves once an action of kind `signal` is received; never without one.
async fn wait_signal<P: Clone>(
    rx: Option<&mut broadcast::Receiver<Action<P>>>,
    signal: Option<&str>,
) {
    let (Some(rx), Some(signal)) = (rx, signal) else {
        return std::future::pending().await;
    };
    loop {
        match rx.recv().await {
            Ok(action) if action.is(signal) => return,
            Ok(_) | Err(RecvError::Lagged(_)) => continue,
            Err(RecvError::Closed) => return std::future::pending().await,
        }
    }
}

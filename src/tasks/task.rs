//! # Task abstraction.
//!
//! A [`Task`] has a stable name and produces a fresh future per spawn. The
//! future receives a [`CancellationToken`]; cancellation is cooperative: the
//! task observes the token, runs its own cleanup and returns.
//!
//! Callback pipelines ([`CallbackPipeline`](crate::CallbackPipeline),
//! [`CallbackReactor`](crate::CallbackReactor)) implement this trait so a host
//! can run them next to plain [`TaskFn`](crate::TaskFn)s.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::error::TaskError;

/// Boxed future returned by [`Task::spawn`].
pub type BoxTaskFuture = Pin<Box<dyn Future<Output = Result<(), TaskError>> + Send + 'static>>;

/// Shared handle to a task object.
pub type TaskRef = Arc<dyn Task>;

/// # Asynchronous, cancelable unit.
///
/// # Example
/// ```
/// use tokio_util::sync::CancellationToken;
/// use callvisor::{BoxTaskFuture, Task};
///
/// struct Demo;
///
/// impl Task for Demo {
///     fn name(&self) -> &str { "demo" }
///
///     fn spawn(&self, ctx: CancellationToken) -> BoxTaskFuture {
///         Box::pin(async move {
///             ctx.cancelled().await;
///             Ok(())
///         })
///     }
/// }
/// ```
pub trait Task: Send + Sync + 'static {
    /// Returns a stable, human-readable task name.
    fn name(&self) -> &str;

    /// Creates a new future executing the task until completion or cancellation.
    fn spawn(&self, ctx: CancellationToken) -> BoxTaskFuture;
}

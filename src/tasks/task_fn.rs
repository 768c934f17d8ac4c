//! # Function-backed task (`TaskFn`)
//!
//! [`TaskFn`] wraps a closure `F: Fn(CancellationToken) -> Fut`, producing a fresh
//! future per spawn. If state must be shared between spawns, capture an `Arc<...>`
//! explicitly inside the closure.
//!
//! ## Example
//! ```rust
//! use tokio_util::sync::CancellationToken;
//! use callvisor::{TaskFn, TaskRef, TaskError};
//!
//! let t: TaskRef = TaskFn::arc("heartbeat", |ctx: CancellationToken| async move {
//!     ctx.cancelled().await;
//!     Ok::<_, TaskError>(())
//! });
//!
//! assert_eq!(t.name(), "heartbeat");
//! ```

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::error::TaskError;
use crate::tasks::task::{BoxTaskFuture, Task};

/// Function-backed task implementation.
#[derive(Debug)]
pub struct TaskFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> TaskFn<F> {
    /// Creates a new function-backed task.
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Creates the task and returns it as a shared handle.
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

impl<F, Fut> Task for TaskFn<F>
where
    F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), TaskError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn spawn(&self, ctx: CancellationToken) -> BoxTaskFuture {
        Box::pin((self.f)(ctx))
    }
}

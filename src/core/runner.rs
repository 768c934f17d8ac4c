//! # Run a task spawned on the runtime.
//!
//! Executes one [`Task`] with a child cancellation token and publishes its
//! lifecycle to the [`Bus`].
//!
//! ```text
//! Success:       task.spawn() → Ok(())          → TaskStopped
//! Cancellation:  task.spawn() → Err(Canceled)   → TaskStopped (graceful exit)
//! Failure:       task.spawn() → Err(Fail/Fatal) → TaskFailed
//! ```
//!
//! ## Rules
//! - Always publishes `TaskStarting` and **exactly one** terminal event.
//! - Child cancellation does **not** affect the parent.

use tokio_util::sync::CancellationToken;

use crate::{
    error::TaskError,
    events::{Bus, Event, EventKind},
    tasks::Task,
};

/// Runs `task` once under a child of `parent`.
pub async fn run_once<T: Task + ?Sized>(
    task: &T,
    parent: &CancellationToken,
    bus: &Bus,
) -> Result<(), TaskError> {
    bus.publish(Event::new(EventKind::TaskStarting).with_task(task.name()));

    let res = task.spawn(parent.child_token()).await;
    match &res {
        Ok(()) | Err(TaskError::Canceled) => {
            bus.publish(Event::new(EventKind::TaskStopped).with_task(task.name()));
        }
        Err(e) => {
            bus.publish(
                Event::new(EventKind::TaskFailed)
                    .with_task(task.name())
                    .with_reason(e.to_string()),
            );
        }
    }
    res
}

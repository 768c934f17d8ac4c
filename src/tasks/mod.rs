//! # Task abstractions.
//!
//! - [`Task`] - trait for cancelable units spawned by the runtime
//! - [`TaskFn`] - function-backed task implementation
//! - [`TaskRef`] - shared reference to a task (`Arc<dyn Task>`)

mod task;
mod task_fn;

pub use task::{BoxTaskFuture, Task, TaskRef};
pub use task_fn::TaskFn;

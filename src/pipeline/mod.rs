//! # Callback pipelines.
//!
//! ```text
//! callback source ──► CallbackBridge ──► Emitter ──► Dispatcher ──► CallbackReactor ──► Reaction
//!                                          (background)                (latest wins)
//! ```
//!
//! - [`CallbackPipeline`]: bridge-to-event pipeline with optional cancel signal
//! - [`CallbackReactor`]: reactive dispatch supervisor (one reaction in flight)
//! - [`Reaction`]: consumer-supplied factory producing one task per event
//!
//! Both entry points are built through a builder validated at `build()` and
//! implement [`Task`](crate::Task).

mod callback;
mod config;
mod emitter;
mod reaction;
mod reactor;

pub use callback::{CallbackPipeline, CallbackPipelineBuilder};
pub use config::DEFAULT_REPEATING;
pub use reaction::Reaction;
pub use reactor::{CallbackReactor, CallbackReactorBuilder};

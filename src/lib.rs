//! # callvisor
//!
//! **Callvisor** turns push-style callback sources into supervised, cancellable
//! async pipelines on top of tokio.
//!
//! A callback source (a GPS listener, a socket handler, a UI hook) is wired
//! once through a [`Resolver`]. Each value it produces is turned into an
//! [`Action`] and dispatched on a [`Dispatcher`]. A [`CallbackReactor`] can
//! then react to those actions with latest-wins semantics: every new value
//! cancels the reaction still working on the previous one.
//!
//! ## Architecture
//! ```text
//!   callback source
//!        │ resolve(frame)
//!        ▼
//! ┌──────────────────┐  next_value()  ┌──────────────────────┐  dispatch(Action)
//! │  CallbackBridge  │ ─────────────► │       Emitter        │ ──────────────────┐
//! │ (one pending slot│                │ (pull → build → emit)│                   │
//! │  frames dropped  │                └──────────────────────┘                   ▼
//! │  when no waiter) │                                                    ┌────────────┐
//! └──────────────────┘                                                    │ Dispatcher │
//!                                                                         └─────┬──────┘
//!                                 ┌─────────────────────────────────────────────┤
//!                                 ▼                                             ▼
//!                      ┌─────────────────────┐                         other listeners
//!                      │   CallbackReactor   │
//!                      │ event  → replace    │──► Reaction(payload, child token)
//!                      │ signal → terminate  │
//!                      └─────────────────────┘
//!
//! Every component publishes diagnostic Events on a Bus; the Runtime fans them
//! out to Subscribe implementations (LogWriter with the `logging` feature).
//! ```
//!
//! ## Entry points
//! - [`CallbackPipeline`]: bridge + emitter; dispatches one action per value.
//! - [`CallbackReactor`]: pipeline in the background + latest-wins reaction.
//! - [`Runtime`]: hosts pipelines and reactors, graceful shutdown, OS signals.
//!
//! ## Example
//! ```rust
//! use std::{sync::Arc, time::Duration};
//! use callvisor::{ActionCreator, CallbackPipeline, Config, Runtime};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let rt = Runtime::builder(Config::default()).build();
//!     let dispatcher = rt.config().dispatcher::<u32>();
//!     let mut actions = dispatcher.subscribe();
//!
//!     let pipeline = CallbackPipeline::builder("ticks", dispatcher.clone(), ActionCreator::new("TICK"))
//!         .with_bus(rt.bus().clone())
//!         .repeating(false)
//!         .configure(|resolve| {
//!             tokio::spawn(async move {
//!                 // Frames are dropped until the pipeline pulls.
//!                 while !resolve.resolve(7) {
//!                     tokio::time::sleep(Duration::from_millis(1)).await;
//!                 }
//!             });
//!         })
//!         .build()?;
//!
//!     rt.spawn(Arc::new(pipeline));
//!     let action = actions.recv().await?;
//!     assert_eq!(action.payload, Some(7));
//!
//!     rt.shutdown().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//! | Feature   | Description                                  |
//! |-----------|----------------------------------------------|
//! | `logging` | Exports `LogWriter`, a stdout event printer   |

mod actions;
mod bridge;
mod core;
mod error;
mod events;
mod pipeline;
mod subscribers;
mod tasks;

// ---- Public re-exports ----

pub use actions::{Action, ActionCreator, Dispatcher, EventBuilder, EventSpec};
pub use bridge::{CallbackBridge, NextValue, Resolver};
pub use core::{Config, Runtime, RuntimeBuilder};
pub use error::{ConfigError, RuntimeError, TaskError};
pub use events::{Bus, Event, EventKind};
pub use pipeline::{
    CallbackPipeline, CallbackPipelineBuilder, CallbackReactor, CallbackReactorBuilder,
    DEFAULT_REPEATING, Reaction,
};
pub use subscribers::{Subscribe, SubscriberSet};
pub use tasks::{BoxTaskFuture, Task, TaskFn, TaskRef};

// Optional: expose a simple built-in logger subscriber (enabled via the "logging" feature).
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;

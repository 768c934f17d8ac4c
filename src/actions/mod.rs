//! Typed actions and the dispatch sink.
//!
//! ## Contents
//! - [`Action`], [`ActionCreator`], [`EventSpec`], [`EventBuilder`]: what pipelines emit
//! - [`Dispatcher`]: thin wrapper over `tokio::sync::broadcast` delivering actions

mod action;
mod dispatcher;

pub use action::{Action, ActionCreator, EventBuilder, EventSpec};
pub use dispatcher::Dispatcher;

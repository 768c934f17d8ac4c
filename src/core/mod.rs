//! # Host runtime.
//!
//! - [`Config`]: grace period and buffer sizes
//! - [`Runtime`] / [`RuntimeBuilder`]: spawn pipelines, fan out diagnostics, shut down
//! - `runner`: runs one task and publishes its lifecycle
//! - `shutdown`: OS termination signals

mod builder;
mod config;
mod runner;
mod runtime;
mod shutdown;

pub use builder::RuntimeBuilder;
pub use config::Config;
pub use runtime::Runtime;

//! Diagnostic events: types and broadcast bus.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: the emitter, the reactor, the host runtime and
//!   `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: the runtime's subscriber listener (fans out to
//!   `SubscriberSet`) and any receiver obtained via [`Bus::subscribe`].

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};

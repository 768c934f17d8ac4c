//! # Diagnostic subscribers.
//!
//! ```text
//! Emitter / Reactor / Runtime ── publish(Event) ──► Bus ──► Runtime listener
//!                                                              │
//!                                                              ▼
//!                                                        SubscriberSet
//!                                                     ┌────────┼────────┐
//!                                                     ▼        ▼        ▼
//!                                                 LogWriter  Metrics  Custom
//! ```
//!
//! - [`Subscribe`]: trait implemented by consumers
//! - [`SubscriberSet`]: per-subscriber queues, panic isolation
//! - `LogWriter`: stdout printer (feature `logging`)

#[cfg(feature = "logging")]
mod log;
mod set;
mod subscribe;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;

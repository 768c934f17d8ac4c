//! # Event subscriber trait.
//!
//! [`Subscribe`] is the extension point for consuming diagnostic [`Event`]s
//! (logging, metrics, test recorders). Each subscriber gets a dedicated worker
//! and a bounded queue inside the [`SubscriberSet`](crate::SubscriberSet).
//!
//! ## Example
//! ```rust
//! use async_trait::async_trait;
//! use callvisor::{Event, EventKind, Subscribe};
//!
//! struct Replacements;
//!
//! #[async_trait]
//! impl Subscribe for Replacements {
//!     async fn on_event(&self, ev: &Event) {
//!         if matches!(ev.kind, EventKind::ReactionReplaced) {
//!             // bump a counter, etc.
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str { "replacements" }
//! }
//! ```

use async_trait::async_trait;

use crate::events::Event;

/// Diagnostic event consumer.
///
/// - Events arrive in FIFO order per subscriber.
/// - Panics are caught and published as `SubscriberPanicked`.
/// - A full queue drops the event for this subscriber only (`SubscriberOverflow`).
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Processes a single event.
    async fn on_event(&self, event: &Event);

    /// Subscriber name used in overflow/panic events.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Preferred queue capacity (clamped to at least 1). Default: 1024.
    fn queue_capacity(&self) -> usize {
        1024
    }
}

//! # Callback-to-pull bridge.
//!
//! [`CallbackBridge`] turns a push-style callback source into a pull
//! operation ([`CallbackBridge::next_value`]) that can be awaited from a task.
//!
//! ## Rules
//! - At most one pending slot exists at a time; concurrent pulls share it.
//! - A frame resolves the pending slot and clears it.
//! - A frame arriving while nobody waits is **dropped**, never queued.
//! - Once every [`Resolver`] is gone the bridge is closed and pulls yield `None`.

mod slot;

pub use slot::{CallbackBridge, NextValue, Resolver};

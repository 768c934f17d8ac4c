use std::sync::Arc;

use super::{config::Config, runtime::Runtime};
use crate::{
    events::Bus,
    subscribers::{Subscribe, SubscriberSet},
};

/// Builder for a [`Runtime`].
pub struct RuntimeBuilder {
    cfg: Config,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl RuntimeBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
        }
    }

    /// Sets diagnostic subscribers.
    ///
    /// Subscribers receive every event published on the runtime bus
    /// through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Builds the runtime: bus, subscriber workers and runtime token.
    ///
    /// Must be called inside a tokio runtime.
    pub fn build(self) -> Runtime {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let subs = SubscriberSet::new(self.subscribers, bus.clone());
        Runtime::new_internal(self.cfg, bus, subs)
    }
}

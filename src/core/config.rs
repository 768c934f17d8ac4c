//! # Runtime configuration.
//!
//! [`Config`] centralises the settings of the host [`Runtime`](crate::Runtime)
//! and the default buffer size for [`Dispatcher`](crate::Dispatcher)s.
//!
//! ## Sentinel values
//! - `grace = 0s` → do not wait on shutdown (report still-running tasks at once)
//! - capacities are clamped to a minimum of 1

use std::time::Duration;

/// Global configuration for the host runtime.
#[derive(Clone, Debug)]
pub struct Config {
    /// Maximum time to wait for tasks to stop after shutdown was requested.
    pub grace: Duration,

    /// Capacity of the diagnostic bus ring buffer.
    pub bus_capacity: usize,

    /// Capacity for dispatchers created through [`Config::dispatcher`].
    ///
    /// A reactor falling further behind than this observes `DispatchLagged`.
    pub dispatch_capacity: usize,
}

impl Config {
    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Returns a dispatch capacity clamped to a minimum of 1.
    #[inline]
    pub fn dispatch_capacity_clamped(&self) -> usize {
        self.dispatch_capacity.max(1)
    }

    /// Creates a dispatcher sized by this config.
    pub fn dispatcher<P>(&self) -> crate::Dispatcher<P>
    where
        P: Clone + Send + Sync + 'static,
    {
        crate::Dispatcher::new(self.dispatch_capacity_clamped())
    }
}

impl Default for Config {
    /// - `grace = 60s`
    /// - `bus_capacity = 1024`
    /// - `dispatch_capacity = 1024`
    fn default() -> Self {
        Self {
            grace: Duration::from_secs(60),
            bus_capacity: 1024,
            dispatch_capacity: 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_capacities_are_clamped() {
        let cfg = Config {
            bus_capacity: 0,
            dispatch_capacity: 0,
            ..Config::default()
        };
        assert_eq!(cfg.bus_capacity_clamped(), 1);
        assert_eq!(cfg.dispatch_capacity_clamped(), 1);
    }

    #[test]
    fn defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.grace, Duration::from_secs(60));
        assert_eq!(cfg.bus_capacity, 1024);
        let d = cfg.dispatcher::<u8>();
        assert_eq!(d.listener_count(), 0);
    }
}

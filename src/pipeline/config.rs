//! # Shared pipeline configuration.
//!
//! Both entry points ([`CallbackPipeline`](crate::CallbackPipeline) and
//! [`CallbackReactor`](crate::CallbackReactor)) collect the same knobs and
//! validate them the same way before the callback source is touched.
//!
//! ## Defaults
//! - `repeating = true` ([`DEFAULT_REPEATING`]) for both entry points
//! - no cancel signal
//! - a private [`Bus`] nobody listens to, unless one is injected

use std::sync::Arc;

use crate::actions::{Dispatcher, EventSpec};
use crate::bridge::{CallbackBridge, Resolver};
use crate::error::ConfigError;
use crate::events::Bus;
use crate::pipeline::emitter::Emitter;

/// Default repetition mode of both entry points.
pub const DEFAULT_REPEATING: bool = true;

type Configurer<P> = Box<dyn FnOnce(Resolver<P>) + Send>;

/// Where frames come from.
pub(crate) enum Source<P: Clone> {
    Missing,
    Configurer(Configurer<P>),
    Bridge(Arc<CallbackBridge<P>>),
}

pub(crate) struct PipelineConfig<P: Clone> {
    pub(crate) name: Arc<str>,
    pub(crate) dispatcher: Dispatcher<P>,
    pub(crate) spec: EventSpec<P>,
    pub(crate) repeating: bool,
    pub(crate) cancel_on: Option<Arc<str>>,
    pub(crate) bus: Option<Bus>,
    pub(crate) source: Source<P>,
}

/// Validated configuration, ready to run.
pub(crate) struct Resolved<P: Clone> {
    pub(crate) name: Arc<str>,
    pub(crate) emitter: Arc<Emitter<P>>,
    pub(crate) dispatcher: Dispatcher<P>,
    pub(crate) event_kind: Arc<str>,
    pub(crate) repeating: bool,
    pub(crate) cancel_on: Option<Arc<str>>,
    pub(crate) bus: Bus,
}

impl<P> PipelineConfig<P>
where
    P: Clone + Send + Sync + 'static,
{
    pub(crate) fn new(name: impl Into<Arc<str>>, dispatcher: Dispatcher<P>, spec: EventSpec<P>) -> Self {
        Self {
            name: name.into(),
            dispatcher,
            spec,
            repeating: DEFAULT_REPEATING,
            cancel_on: None,
            bus: None,
            source: Source::Missing,
        }
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::EmptyName);
        }
        let kind = self.spec.kind();
        if kind.trim().is_empty() {
            return Err(ConfigError::EmptyEventKind);
        }
        if let Some(signal) = &self.cancel_on {
            if signal.trim().is_empty() {
                return Err(ConfigError::EmptyCancelSignal);
            }
            if &**signal == kind {
                return Err(ConfigError::SignalCollision {
                    kind: kind.to_string(),
                });
            }
        }
        if matches!(self.source, Source::Missing) {
            return Err(ConfigError::MissingConfigurer);
        }
        Ok(())
    }

    /// Validates, then builds the bridge (running the configurer once).
    pub(crate) fn resolve(self) -> Result<Resolved<P>, ConfigError> {
        self.validate()?;

        let bridge = match self.source {
            Source::Configurer(configure) => Arc::new(CallbackBridge::new(configure)),
            Source::Bridge(bridge) => bridge,
            Source::Missing => return Err(ConfigError::MissingConfigurer),
        };
        let bus = self.bus.unwrap_or_default();
        let builder = self.spec.into_builder();
        let event_kind = Arc::clone(builder.kind());
        let emitter = Arc::new(Emitter::new(
            Arc::clone(&self.name),
            bridge,
            builder,
            self.dispatcher.clone(),
            self.repeating,
            bus.clone(),
        ));

        Ok(Resolved {
            name: self.name,
            emitter,
            dispatcher: self.dispatcher,
            event_kind,
            repeating: self.repeating,
            cancel_on: self.cancel_on,
            bus,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(name: &str, kind: &str) -> PipelineConfig<u32> {
        let mut cfg = PipelineConfig::new(name, Dispatcher::new(4), EventSpec::named(kind));
        cfg.source = Source::Configurer(Box::new(|_r| {}));
        cfg
    }

    #[test]
    fn defaults_are_explicit() {
        let cfg = config("p", "TICK");
        assert_eq!(cfg.repeating, DEFAULT_REPEATING);
        assert!(cfg.cancel_on.is_none());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn rejects_blank_names_and_kinds() {
        assert_eq!(config(" ", "TICK").validate(), Err(ConfigError::EmptyName));
        assert_eq!(config("p", "").validate(), Err(ConfigError::EmptyEventKind));

        let mut cfg = config("p", "TICK");
        cfg.cancel_on = Some("".into());
        assert_eq!(cfg.validate(), Err(ConfigError::EmptyCancelSignal));
    }

    #[test]
    fn rejects_signal_equal_to_event_kind() {
        let mut cfg = config("p", "TICK");
        cfg.cancel_on = Some("TICK".into());
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::SignalCollision {
                kind: "TICK".into()
            })
        );
    }

    #[test]
    fn requires_a_source() {
        let cfg = PipelineConfig::<u32>::new("p", Dispatcher::new(4), EventSpec::named("TICK"));
        assert_eq!(cfg.validate(), Err(ConfigError::MissingConfigurer));
    }

    #[test]
    fn invalid_config_never_runs_configurer() {
        let called = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let flag = Arc::clone(&called);
        let mut cfg = PipelineConfig::<u32>::new("", Dispatcher::new(4), EventSpec::named("TICK"));
        cfg.source = Source::Configurer(Box::new(move |_r| {
            flag.store(true, std::sync::atomic::Ordering::SeqCst);
        }));
        assert!(cfg.resolve().is_err());
        assert!(!called.load(std::sync::atomic::Ordering::SeqCst));
    }
}

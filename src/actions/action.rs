//! # Actions and event specs.
//!
//! An [`Action`] is the typed record a pipeline hands to the [`Dispatcher`](super::Dispatcher):
//! a `kind` plus an optional payload. Cancel signals are payload-less actions.
//!
//! How a pipeline builds its actions is described by an [`EventSpec`]:
//! - [`EventSpec::Constructed`] uses an [`ActionCreator`] (kind + payload mapping),
//! - [`EventSpec::Named`] wraps the payload as-is under a kind name.
//!
//! Both are resolved once, at build time, into an [`EventBuilder`].

use std::fmt;
use std::sync::Arc;

/// Typed action record.
#[derive(Clone, PartialEq, Eq)]
pub struct Action<P> {
    /// Action kind used for matching.
    pub kind: Arc<str>,
    /// Payload; `None` for signals.
    pub payload: Option<P>,
}

impl<P> Action<P> {
    /// Creates an action carrying `payload`.
    pub fn new(kind: impl Into<Arc<str>>, payload: P) -> Self {
        Self {
            kind: kind.into(),
            payload: Some(payload),
        }
    }

    /// Creates a payload-less signal action.
    pub fn signal(kind: impl Into<Arc<str>>) -> Self {
        Self {
            kind: kind.into(),
            payload: None,
        }
    }

    /// Returns `true` if the action has the given kind.
    #[inline]
    pub fn is(&self, kind: &str) -> bool {
        &*self.kind == kind
    }
}

impl<P: fmt::Debug> fmt::Debug for Action<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action")
            .field("kind", &self.kind)
            .field("payload", &self.payload)
            .finish()
    }
}

type PayloadFn<P> = Arc<dyn Fn(P) -> P + Send + Sync>;

/// Typed action constructor: a fixed kind plus an optional payload mapping.
///
/// ## Example
/// ```rust
/// use callvisor::ActionCreator;
///
/// let position = ActionCreator::with_payload("POSITION", |p: (f64, f64)| (p.0.round(), p.1.round()));
/// let action = position.create((1.4, 2.6));
/// assert_eq!(&*action.kind, "POSITION");
/// assert_eq!(action.payload, Some((1.0, 3.0)));
/// ```
pub struct ActionCreator<P> {
    kind: Arc<str>,
    map: Option<PayloadFn<P>>,
}

impl<P> Clone for ActionCreator<P> {
    fn clone(&self) -> Self {
        Self {
            kind: Arc::clone(&self.kind),
            map: self.map.clone(),
        }
    }
}

impl<P> fmt::Debug for ActionCreator<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionCreator")
            .field("kind", &self.kind)
            .field("maps_payload", &self.map.is_some())
            .finish()
    }
}

impl<P> ActionCreator<P> {
    /// Creator that wraps the payload unchanged.
    pub fn new(kind: impl Into<Arc<str>>) -> Self {
        Self {
            kind: kind.into(),
            map: None,
        }
    }

    /// Creator that maps the payload before wrapping it.
    pub fn with_payload<F>(kind: impl Into<Arc<str>>, f: F) -> Self
    where
        F: Fn(P) -> P + Send + Sync + 'static,
    {
        Self {
            kind: kind.into(),
            map: Some(Arc::new(f)),
        }
    }

    /// Returns the kind of the actions this creator builds.
    pub fn kind(&self) -> &Arc<str> {
        &self.kind
    }

    /// Builds an action from `payload`.
    pub fn create(&self, payload: P) -> Action<P> {
        let payload = match &self.map {
            Some(f) => f(payload),
            None => payload,
        };
        Action {
            kind: Arc::clone(&self.kind),
            payload: Some(payload),
        }
    }
}

/// How a pipeline turns frames into actions.
pub enum EventSpec<P> {
    /// Build actions through an [`ActionCreator`].
    Constructed(ActionCreator<P>),
    /// Build generic `{kind, payload}` actions under this kind.
    Named(Arc<str>),
}

impl<P> EventSpec<P> {
    /// Shorthand for [`EventSpec::Named`].
    pub fn named(kind: impl Into<Arc<str>>) -> Self {
        EventSpec::Named(kind.into())
    }

    /// Returns the kind of the actions this spec produces.
    pub fn kind(&self) -> &str {
        match self {
            EventSpec::Constructed(c) => &**c.kind(),
            EventSpec::Named(kind) => &**kind,
        }
    }

    /// Resolves the spec into a uniform builder.
    pub fn into_builder(self) -> EventBuilder<P> {
        let creator = match self {
            EventSpec::Constructed(c) => c,
            EventSpec::Named(kind) => ActionCreator::new(kind),
        };
        EventBuilder { creator }
    }
}

impl<P> From<ActionCreator<P>> for EventSpec<P> {
    fn from(c: ActionCreator<P>) -> Self {
        EventSpec::Constructed(c)
    }
}

impl<P> From<&str> for EventSpec<P> {
    fn from(kind: &str) -> Self {
        EventSpec::Named(kind.into())
    }
}

impl<P> From<String> for EventSpec<P> {
    fn from(kind: String) -> Self {
        EventSpec::Named(kind.into())
    }
}

/// Resolved [`EventSpec`]: one `build` operation and the kind it produces.
pub struct EventBuilder<P> {
    creator: ActionCreator<P>,
}

impl<P> Clone for EventBuilder<P> {
    fn clone(&self) -> Self {
        Self {
            creator: self.creator.clone(),
        }
    }
}

impl<P> EventBuilder<P> {
    /// Kind of every action built here.
    #[inline]
    pub fn kind(&self) -> &Arc<str> {
        self.creator.kind()
    }

    /// Builds the action for one frame.
    #[inline]
    pub fn build(&self, payload: P) -> Action<P> {
        self.creator.create(payload)
    }
}

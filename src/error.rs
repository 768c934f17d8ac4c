//! Error types used by callvisor pipelines, tasks and the host runtime.
//!
//! This module defines three error enums:
//!
//! - [`ConfigError`]: malformed pipeline configuration, rejected at build time.
//! - [`TaskError`]: errors raised by individual task executions (reactions included).
//! - [`RuntimeError`]: errors raised by the host runtime itself.
//!
//! All of them provide `as_label` (stable snake_case) for logs/metrics.

use std::time::Duration;
use thiserror::Error;

/// # Errors produced while building a pipeline.
///
/// Builders validate eagerly: a pipeline that could never be matched or
/// terminated is rejected before the callback source is touched.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The diagnostic name is empty.
    #[error("pipeline name must not be empty")]
    EmptyName,

    /// The event spec resolves to an empty event kind.
    #[error("event kind must not be empty")]
    EmptyEventKind,

    /// The cancel signal kind is empty.
    #[error("cancel signal kind must not be empty")]
    EmptyCancelSignal,

    /// The cancel signal has the same kind as emitted events.
    #[error("cancel signal {kind:?} collides with the emitted event kind")]
    SignalCollision {
        /// The shared kind.
        kind: String,
    },

    /// No callback configurer was supplied to the builder.
    #[error("no callback configurer supplied")]
    MissingConfigurer,
}

impl ConfigError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use callvisor::ConfigError;
    ///
    /// assert_eq!(ConfigError::EmptyName.as_label(), "config_empty_name");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ConfigError::EmptyName => "config_empty_name",
            ConfigError::EmptyEventKind => "config_empty_event_kind",
            ConfigError::EmptyCancelSignal => "config_empty_cancel_signal",
            ConfigError::SignalCollision { .. } => "config_signal_collision",
            ConfigError::MissingConfigurer => "config_missing_configurer",
        }
    }
}

/// # Errors produced by the host runtime.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Shutdown grace period was exceeded; some tasks were still running.
    #[error("shutdown timeout {grace:?} exceeded; stuck: {stuck:?}")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Names of the tasks that did not stop in time.
        stuck: Vec<String>,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
        }
    }
}

/// # Errors produced by task execution.
///
/// Pipelines return [`TaskError::Canceled`] when they were stopped from the
/// outside; reactions may return any variant, which the reactor only reports.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// Non-recoverable fatal error.
    #[error("fatal error: {error}")]
    Fatal {
        /// The underlying error message.
        error: String,
    },

    /// Task execution failed.
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// Task was cancelled through its token.
    #[error("context cancelled")]
    Canceled,
}

impl TaskError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use callvisor::TaskError;
    ///
    /// let err = TaskError::Fail { error: "boom".into() };
    /// assert_eq!(err.as_label(), "task_failed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            TaskError::Fatal { .. } => "task_fatal",
            TaskError::Fail { .. } => "task_failed",
            TaskError::Canceled => "task_canceled",
        }
    }

    /// Returns `true` if the error only reports cooperative cancellation.
    pub fn is_canceled(&self) -> bool {
        matches!(self, TaskError::Canceled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_labels_are_stable() {
        let err = ConfigError::SignalCollision {
            kind: "TICK".into(),
        };
        assert_eq!(err.as_label(), "config_signal_collision");
        assert!(err.to_string().contains("TICK"));
        assert_eq!(
            ConfigError::MissingConfigurer.as_label(),
            "config_missing_configurer"
        );
    }

    #[test]
    fn canceled_is_not_a_failure() {
        assert!(TaskError::Canceled.is_canceled());
        assert!(!TaskError::Fatal { error: "x".into() }.is_canceled());
        assert_eq!(TaskError::Canceled.as_label(), "task_canceled");
    }

    #[test]
    fn grace_exceeded_lists_stuck_tasks() {
        let err = RuntimeError::GraceExceeded {
            grace: Duration::from_secs(1),
            stuck: vec!["reactor".into()],
        };
        assert_eq!(err.as_label(), "runtime_grace_exceeded");
        assert!(err.to_string().contains("reactor"));
    }
}

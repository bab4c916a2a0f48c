//! Error types used by the coordination core.
//!
//! This module defines one enum per subsystem:
//!
//! - [`BusError`]: raised by the event bus (lifecycle misuse, shutdown).
//! - [`SubscriberError`]: returned by subscriber callbacks.
//! - [`ComponentError`]: raised by component hooks and invalid lifecycle transitions.
//! - [`ClockError`]: raised by clock rendezvous (`sync`).
//! - [`ConfigError`]: raised while loading or validating configuration.
//! - [`RuntimeError`]: raised by the supervisor.
//!
//! Every enum provides `as_label` (stable snake_case label for logs/metrics).
//! Programming-error invariant violations (acknowledgement underflow) are not
//! represented here: they panic at the offending call site.

use std::time::Duration;

use thiserror::Error;

use crate::core::ComponentState;

/// # Errors produced by the event bus.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BusError {
    /// The bus stopped accepting or dispatching events before delivery completed.
    #[error("event bus is shutting down")]
    ShuttingDown,

    /// The bus was already shut down and cannot be started again.
    #[error("event bus is not running")]
    NotRunning,

    /// `start` was called on a bus whose dispatch loop already runs.
    #[error("event bus dispatch loop already started")]
    AlreadyStarted,
}

impl BusError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use dtn_core::BusError;
    ///
    /// assert_eq!(BusError::ShuttingDown.as_label(), "bus_shutting_down");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            BusError::ShuttingDown => "bus_shutting_down",
            BusError::NotRunning => "bus_not_running",
            BusError::AlreadyStarted => "bus_already_started",
        }
    }
}

/// # Errors returned by subscriber callbacks.
///
/// A failing subscriber is logged and skipped; the error never reaches the
/// publisher or the other subscribers.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubscriberError {
    /// The subscriber could not process the event.
    #[error("subscriber failed: {reason}")]
    Failed {
        /// Human-readable failure reason.
        reason: String,
    },
}

impl SubscriberError {
    /// Shorthand for [`SubscriberError::Failed`].
    pub fn failed(reason: impl Into<String>) -> Self {
        SubscriberError::Failed {
            reason: reason.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            SubscriberError::Failed { .. } => "subscriber_failed",
        }
    }
}

/// # Errors produced by components and the lifecycle helper.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ComponentError {
    /// `component_up` failed.
    #[error("component '{component}' failed to come up: {reason}")]
    Up {
        /// Component name.
        component: String,
        /// Failure reason.
        reason: String,
    },

    /// The owned loop (`component_run`) returned an error.
    #[error("component '{component}' loop failed: {reason}")]
    Run {
        /// Component name.
        component: String,
        /// Failure reason.
        reason: String,
    },

    /// A lifecycle operation was requested in a state that does not allow it.
    #[error("component '{component}' cannot {op} while {from:?}")]
    InvalidTransition {
        /// Component name.
        component: String,
        /// State the component was in.
        from: ComponentState,
        /// Requested operation.
        op: &'static str,
    },
}

impl ComponentError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ComponentError::Up { .. } => "component_up_failed",
            ComponentError::Run { .. } => "component_run_failed",
            ComponentError::InvalidTransition { .. } => "component_invalid_transition",
        }
    }
}

/// # Errors produced while waiting on the clock.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClockError {
    /// The clock was stopped while the caller was waiting for a tick.
    #[error("clock stopped while waiting for the next tick")]
    Aborted,

    /// No tick fired within the caller-specified bound.
    #[error("no tick within {timeout:?}")]
    Timeout {
        /// The bound that elapsed.
        timeout: Duration,
    },
}

impl ClockError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ClockError::Aborted => "clock_aborted",
            ClockError::Timeout { .. } => "clock_timeout",
        }
    }
}

/// # Errors produced while loading configuration.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration text is not valid TOML for [`Config`](crate::Config).
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A field holds a value outside its allowed range.
    #[error("invalid config field '{field}': {reason}")]
    Invalid {
        /// Dotted field path (e.g. `clock.frequency`).
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

impl ConfigError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ConfigError::Io(_) => "config_io",
            ConfigError::Parse(_) => "config_parse",
            ConfigError::Invalid { .. } => "config_invalid",
        }
    }
}

/// # Errors produced by the supervisor runtime.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Shutdown grace period was exceeded; some components did not terminate in time.
    #[error("shutdown timeout {grace:?} exceeded; stuck: {stuck:?}")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Names of components that were still running.
        stuck: Vec<String>,
    },

    /// A component failed to initialize or start.
    #[error(transparent)]
    Component(#[from] ComponentError),

    /// The event bus could not be started.
    #[error(transparent)]
    Bus(#[from] BusError),

    /// Configuration was rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use dtn_core::RuntimeError;
    /// use std::time::Duration;
    ///
    /// let err = RuntimeError::GraceExceeded { grace: Duration::from_secs(5), stuck: vec![] };
    /// assert_eq!(err.as_label(), "runtime_grace_exceeded");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
            RuntimeError::Component(e) => e.as_label(),
            RuntimeError::Bus(e) => e.as_label(),
            RuntimeError::Config(e) => e.as_label(),
        }
    }
}

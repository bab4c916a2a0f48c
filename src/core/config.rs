//! # Global runtime configuration.
//!
//! Provides [`Config`], centralized settings for the bus, clock, registries
//! and supervisor.
//!
//! Config is used in three ways:
//! 1. **Supervisor creation**: `Supervisor::builder(config)`
//! 2. **Component wiring**: `EventBus::new(&cfg.bus)`, `Clock::new(bus, source, &cfg.clock)`
//! 3. **Files**: `Config::from_path("dtnd.toml")` / [`Config::from_toml_str`]
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use dtn_core::{Config, Execution, ShutdownMode};
//!
//! let cfg = Config::from_toml_str(r#"
//!     grace = "5s"
//!
//!     [bus]
//!     shutdown = "discard"
//!
//!     [clock]
//!     frequency = "2s"
//!     execution = "host-driven"
//! "#).unwrap();
//!
//! assert_eq!(cfg.grace, Duration::from_secs(5));
//! assert_eq!(cfg.bus.shutdown, ShutdownMode::Discard);
//! assert_eq!(cfg.clock.execution, Execution::HostDriven);
//! assert_eq!(cfg.clock.poll_interval, Duration::from_millis(100));
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::Execution;
use crate::error::ConfigError;

/// Global configuration for the coordination core.
///
/// ## Field semantics
/// - `grace`: Maximum wait for components to terminate (`0s` = no bound)
/// - `bus`: queue handling on shutdown
/// - `clock`: tick frequency, poll granularity, execution model
/// - `registry`: expiry guard and summary-vector sizing
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Maximum time to wait for graceful shutdown before giving up.
    ///
    /// When shutdown is requested:
    /// - Components are terminated in reverse start order
    /// - Supervisor waits up to `grace` for all of them
    /// - If exceeded, returns `RuntimeError::GraceExceeded`
    #[serde(with = "humantime_serde")]
    pub grace: Duration,

    /// Event bus settings.
    pub bus: BusConfig,

    /// Clock settings.
    pub clock: ClockConfig,

    /// Expiring registry settings.
    pub registry: RegistryConfig,
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `grace = 30s`
    /// - `bus.shutdown = drain`
    /// - `clock.frequency = 1s`, `clock.poll_interval = 100ms`, self-driven
    /// - `registry.min_quality = 0.0`, 8192-bit summary, 4 hashes
    fn default() -> Self {
        Self {
            grace: Duration::from_secs(30),
            bus: BusConfig::default(),
            clock: ClockConfig::default(),
            registry: RegistryConfig::default(),
        }
    }
}

impl Config {
    /// Parses and validates a TOML document. Missing fields take defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let cfg: Config = toml::from_str(text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reads, parses and validates a TOML file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Rejects values the runtime cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.clock.frequency.is_zero() {
            return Err(ConfigError::Invalid {
                field: "clock.frequency",
                reason: "must be at least one second".into(),
            });
        }
        if self.clock.poll_interval.is_zero() {
            return Err(ConfigError::Invalid {
                field: "clock.poll_interval",
                reason: "must be greater than zero".into(),
            });
        }
        if !(0.0..=1.0).contains(&self.registry.min_quality) {
            return Err(ConfigError::Invalid {
                field: "registry.min_quality",
                reason: format!("{} is outside [0, 1]", self.registry.min_quality),
            });
        }
        if self.registry.summary_bits == 0 || self.registry.summary_hashes == 0 {
            return Err(ConfigError::Invalid {
                field: "registry.summary_bits",
                reason: "summary vector needs at least one bit and one hash".into(),
            });
        }
        Ok(())
    }

    /// Returns the grace period as an `Option`.
    ///
    /// - `None` → wait for components to stop without a bound
    /// - `Some(d)` → wait at most `d`
    #[inline]
    pub fn grace_period(&self) -> Option<Duration> {
        if self.grace.is_zero() {
            None
        } else {
            Some(self.grace)
        }
    }
}

/// What the dispatch loop does with queued events on shutdown.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ShutdownMode {
    /// Dispatch everything already queued, then exit.
    #[default]
    Drain,
    /// Drop queued events; their waiters observe `BusError::ShuttingDown`.
    Discard,
}

/// Event bus settings.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// Queue handling on shutdown.
    pub shutdown: ShutdownMode,
}

/// Clock settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockConfig {
    /// Interval between ticks. DTN time has one-second resolution, so the
    /// effective interval is rounded up to whole seconds.
    #[serde(with = "humantime_serde")]
    pub frequency: Duration,

    /// How often the self-driven loop checks whether a tick is due.
    ///
    /// Bounds how long `terminate` takes to be observed.
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,

    /// Whether the clock owns its loop or waits for external `tick()` calls.
    pub execution: Execution,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            frequency: Duration::from_secs(1),
            poll_interval: Duration::from_millis(100),
            execution: Execution::SelfDriven,
        }
    }
}

impl ClockConfig {
    /// Tick interval in whole DTN seconds (at least 1).
    #[inline]
    pub fn frequency_secs(&self) -> u64 {
        let secs = self.frequency.as_secs();
        let round_up = u64::from(self.frequency.subsec_nanos() > 0);
        (secs + round_up).max(1)
    }
}

/// Expiring registry settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// `expire` evicts only when clock quality is strictly above this value.
    ///
    /// The default `0.0` means "any quality except none".
    pub min_quality: f64,

    /// Number of counters in the summary vector.
    pub summary_bits: usize,

    /// Number of hash functions applied per key.
    pub summary_hashes: u32,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            min_quality: 0.0,
            summary_bits: 8192,
            summary_hashes: 4,
        }
    }
}

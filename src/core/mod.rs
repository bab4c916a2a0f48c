//! Runtime core: configuration, component lifecycle and supervision.
//!
//! Internal modules:
//! - [`config`]: TOML-loadable settings for every subsystem;
//! - [`component`]: the [`Component`] contract and its execution models;
//! - [`lifecycle`]: [`Lifecycle`], the state machine that drives one component;
//! - [`supervisor`]: composes components, reacts to shutdown, enforces grace;
//! - [`shutdown`]: OS signal and token based shutdown triggers.

mod builder;
mod component;
mod config;
mod lifecycle;
mod shutdown;
mod supervisor;

pub use builder::SupervisorBuilder;
pub use component::{Component, ComponentState, Execution};
pub use config::{BusConfig, ClockConfig, Config, RegistryConfig, ShutdownMode};
pub use lifecycle::Lifecycle;
pub use supervisor::Supervisor;

//! # dtn-core
//!
//! **dtn-core** is the in-process coordination core of a delay-tolerant
//! networking (DTN) bundle daemon.
//!
//! It provides the pieces every daemon subsystem plugs into: an ordered
//! event bus, a component lifecycle with two execution models, a periodic
//! clock, and expiring bundle registries. Wire formats, convergence layers
//! and storage live outside this crate and talk to it through events.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!  ┌──────────────┐  ┌────────────────────┐  ┌──────────────────────┐
//!  │    Clock     │  │  ExpiryExtension   │  │ collaborators (CLs,  │
//!  │ (self-driven)│  │   (host-driven)    │  │ storage, routing...) │
//!  └──────┬───────┘  └───▲──────────┬─────┘  └──────┬───────────▲───┘
//!         │ time-tick    │ tick/rx  │ bundle-expired │ publish   │ on_event
//!         ▼              │ /removed ▼                ▼           │
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │ EventBus: FIFO queue ─► single dispatch loop ─► SubscriberSet[name]    │
//! │           publish / publish_and_wait (Delivery) / subscribe by name    │
//! └──────────────────────────────────────────────────────────────────────┘
//!         ▲
//!         │ start / global-shutdown / shutdown (drain | discard)
//! ┌───────┴──────────────────────────────────────────────────────────────┐
//! │ Supervisor: Lifecycle per component, start in order, stop in reverse │
//! │             within Config::grace, OS signals or shutdown_token()     │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ### Lifecycle
//! ```text
//! Idle ──initialize()──► Initialized ──startup()──► Running ──terminate()──► Stopped
//!        component_up                  spawn loop           abort, cancel, join,
//!                                      (self-driven)        component_down (once)
//! ```
//!
//! ### Expiry
//! ```text
//! time-tick(now) ──► BundleSummary::expire(now, quality)
//!                      ├─ quality <= min_quality → Untrusted (no-op)
//!                      └─ expiry < now, oldest first → bundle-expired(id) each
//! ```
//!
//! ## Features
//! | Area              | Description                                                   | Key types / traits                                  |
//! |-------------------|---------------------------------------------------------------|-----------------------------------------------------|
//! | **Events**        | Ordered publish / publish-and-wait by stable event name.      | [`EventBus`], [`Event`], [`names`], [`Delivery`]    |
//! | **Subscribers**   | React to events; failures and panics are isolated.            | [`Subscribe`], [`SubscriberSet`], [`LogWriter`]     |
//! | **Components**    | Start/stop contract, self-driven or host-driven.              | [`Component`], [`Lifecycle`], [`Execution`]         |
//! | **Supervision**   | Ordered startup, signal handling, shutdown grace.             | [`Supervisor`], [`SupervisorBuilder`]               |
//! | **Time**          | DTN time, clock quality, periodic ticks, rendezvous.          | [`Clock`], [`TimeSource`], [`DtnTime`]              |
//! | **Registries**    | Expiring ordered sets and summary vectors.                    | [`ExpiringRegistry`], [`BundleList`], [`BundleSummary`] |
//! | **Routing**       | Expire tracked bundles on every tick.                         | [`ExpiryExtension`]                                 |
//! | **Configuration** | TOML-loadable settings.                                       | [`Config`]                                          |
//! | **Errors**        | One typed error per subsystem.                                | [`BusError`], [`ComponentError`], [`RuntimeError`]  |
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use dtn_core::{
//!     Clock, Config, EventBus, ExpiryExtension, LogWriter, ManualClock, DtnTime, Supervisor,
//! };
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cfg = Config::default();
//!     let bus = EventBus::new(&cfg.bus);
//!     LogWriter::attach(&bus, LogWriter::default_names());
//!
//!     let time = Arc::new(ManualClock::new(DtnTime::from_secs(1_000)));
//!     let clock = Arc::new(Clock::new(bus.clone(), time.clone(), &cfg.clock));
//!     let expiry = Arc::new(ExpiryExtension::new(bus.clone(), time, &cfg.registry));
//!
//!     let sup = Supervisor::builder(cfg)
//!         .with_bus(bus)
//!         .with_component(clock)
//!         .with_component(expiry)
//!         .build()?;
//!
//!     // Stop right away; a daemon would wait for SIGTERM instead.
//!     sup.shutdown();
//!     sup.run().await?;
//!     Ok(())
//! }
//! ```

mod clock;
mod core;
mod error;
mod events;
mod registry;
mod routing;
mod subscribers;

// ---- Public re-exports ----

pub use clock::{
    Clock, ClockQuality, DTN_EPOCH_UNIX_OFFSET, DtnTime, ManualClock, SystemClock, TimeAction,
    TimeSource, TimeTick,
};
pub use core::{
    BusConfig, ClockConfig, Component, ComponentState, Config, Execution, Lifecycle,
    RegistryConfig, ShutdownMode, Supervisor, SupervisorBuilder,
};
pub use error::{BusError, ClockError, ComponentError, ConfigError, RuntimeError, SubscriberError};
pub use events::{Delivery, Event, EventBus, names};
pub use registry::{
    BundleId, BundleList, BundleSummary, EndpointId, Entry, ExpireOutcome, ExpiringRegistry,
    ExpiryObserver, IgnoreExpired, MetaBundle, SummaryVector,
};
pub use routing::ExpiryExtension;
pub use subscribers::{LogWriter, Subscribe, SubscriberSet};

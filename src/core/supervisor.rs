//! # Supervisor: composes components around one event bus.
//!
//! The [`Supervisor`] owns the [`EventBus`], one [`Lifecycle`] per registered
//! component and a shutdown token. It drives every component through the same
//! ordered lifecycle and enforces the shutdown grace period.
//!
//! ## High-level architecture
//! ```text
//! run():
//!   bus.start()
//!   initialize  C[0] ─► C[1] ─► ... ─► C[N-1]     (component_up, registration order)
//!   startup     C[0] ─► C[1] ─► ... ─► C[N-1]     (self-driven ones get a task)
//!
//!   wait: shutdown_token().cancelled()  |  SIGINT / SIGTERM / SIGQUIT
//!
//!   bus.publish(global-shutdown)
//!   terminate   C[N-1] ─► ... ─► C[1] ─► C[0]     (bounded by cfg.grace)
//!                 ├─ all done   → Ok(())
//!                 └─ timeout    → Err(GraceExceeded { stuck })
//!   bus.shutdown()                                (drain or discard per cfg.bus)
//! ```
//!
//! A failure while initializing or starting tears down whatever already came
//! up (reverse order), shuts the bus down and returns the error.
//!
//! ## Example
//! ```rust,no_run
//! use std::sync::Arc;
//! use dtn_core::{Clock, Config, EventBus, Supervisor, SystemClock};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cfg = Config::default();
//!     let bus = EventBus::new(&cfg.bus);
//!     let clock = Arc::new(Clock::new(bus.clone(), Arc::new(SystemClock::new()), &cfg.clock));
//!
//!     let sup = Supervisor::builder(cfg)
//!         .with_bus(bus)
//!         .with_component(clock)
//!         .build()?;
//!
//!     sup.run().await?; // returns after Ctrl-C
//!     Ok(())
//! }
//! ```

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::builder::SupervisorBuilder;
use super::config::Config;
use super::lifecycle::Lifecycle;
use super::shutdown;
use crate::error::{BusError, RuntimeError};
use crate::events::{Event, EventBus, names};

/// Drives registered components from startup to graceful shutdown.
pub struct Supervisor {
    cfg: Config,
    bus: EventBus,
    components: Vec<Lifecycle>,
    token: CancellationToken,
}

impl Supervisor {
    /// Starts a [`SupervisorBuilder`].
    pub fn builder(cfg: Config) -> SupervisorBuilder {
        SupervisorBuilder::new(cfg)
    }

    pub(super) fn new_internal(cfg: Config, bus: EventBus, components: Vec<Lifecycle>) -> Self {
        Self {
            cfg,
            bus,
            components,
            token: CancellationToken::new(),
        }
    }

    /// The bus shared with every component.
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Effective configuration.
    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Cancelling this token makes [`run`](Self::run) shut down as if a signal arrived.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Requests shutdown. Shorthand for `shutdown_token().cancel()`.
    pub fn shutdown(&self) {
        self.token.cancel();
    }

    /// Names of the registered components, in start order.
    pub fn component_names(&self) -> Vec<String> {
        self.components.iter().map(|c| c.name().to_string()).collect()
    }

    /// Runs until shutdown is requested, then stops everything.
    pub async fn run(&self) -> Result<(), RuntimeError> {
        match self.bus.start() {
            Ok(()) | Err(BusError::AlreadyStarted) => {}
            Err(e) => return Err(e.into()),
        }

        if let Err(e) = self.bring_up().await {
            warn!(error = %e, label = e.as_label(), "startup failed; tearing down");
            for lc in self.components.iter().rev() {
                lc.terminate().await;
            }
            self.bus.shutdown().await;
            return Err(e);
        }
        info!(components = self.components.len(), "supervisor running");

        let reason = shutdown::wait_for_stop(&self.token).await;
        self.bus.publish(
            Event::new(names::GLOBAL_SHUTDOWN)
                .with_source("supervisor")
                .with_reason(reason.as_str()),
        );

        let res = self.terminate_all().await;
        self.bus.shutdown().await;
        match &res {
            Ok(()) => info!("supervisor stopped"),
            Err(e) => warn!(error = %e, label = e.as_label(), "supervisor stopped with errors"),
        }
        res
    }

    async fn bring_up(&self) -> Result<(), RuntimeError> {
        for lc in &self.components {
            lc.initialize().await?;
        }
        for lc in &self.components {
            lc.startup()?;
        }
        Ok(())
    }

    /// Terminates components in reverse start order within the grace period.
    async fn terminate_all(&self) -> Result<(), RuntimeError> {
        let all = async {
            for lc in self.components.iter().rev() {
                lc.terminate().await;
            }
        };

        let Some(grace) = self.cfg.grace_period() else {
            all.await;
            return Ok(());
        };
        if tokio::time::timeout(grace, all).await.is_ok() {
            return Ok(());
        }

        let stuck: Vec<String> = self
            .components
            .iter()
            .filter(|lc| !lc.is_terminated())
            .map(|lc| lc.name().to_string())
            .collect();
        Err(RuntimeError::GraceExceeded { grace, stuck })
    }
}

//! # Component contract.
//!
//! Every subsystem the supervisor composes (clock, convergence layers,
//! routing extensions, storage) implements [`Component`]. The trait only
//! declares hooks; the state machine that calls them lives in
//! [`Lifecycle`](crate::Lifecycle), so implementors never deal with
//! start/stop races themselves.
//!
//! ```text
//! Idle ──initialize──► Initialized ──startup──► Running ──terminate──► Stopped
//!  │    (component_up)                (spawn component_run      (cancel, join,
//!  │                                   if SelfDriven)            component_down)
//!  └───────────────────────────terminate──────────────────────────────►┘
//! ```
//!
//! `component_abort` runs on every `terminate`, whatever the state, before the
//! owned task is joined. `component_down` runs only if `component_up` succeeded.
//!
//! Two execution models, selected by [`Component::execution`]:
//! - [`Execution::SelfDriven`]: the lifecycle spawns `component_run` on its own
//!   task and cancels/joins it on terminate.
//! - [`Execution::HostDriven`]: no task is spawned; the component only does
//!   work when something calls it (bus callbacks, an external scheduler).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::ComponentError;

/// Whether a component owns an execution context.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Execution {
    /// Owns a task running [`Component::component_run`].
    SelfDriven,
    /// Driven entirely by external calls.
    #[default]
    HostDriven,
}

/// Lifecycle states, in the only order they can be entered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ComponentState {
    Idle,
    Initialized,
    Running,
    Stopped,
}

/// # Supervised subsystem.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use tokio_util::sync::CancellationToken;
/// use dtn_core::{Component, ComponentError, Execution};
///
/// struct Beacon;
///
/// #[async_trait]
/// impl Component for Beacon {
///     fn name(&self) -> &str { "beacon" }
///     fn execution(&self) -> Execution { Execution::SelfDriven }
///
///     async fn component_run(&self, ctx: CancellationToken) -> Result<(), ComponentError> {
///         while !ctx.is_cancelled() {
///             // announce ourselves...
///             tokio::select! {
///                 _ = ctx.cancelled() => break,
///                 _ = tokio::time::sleep(std::time::Duration::from_secs(1)) => {}
///             }
///         }
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Component: Send + Sync + 'static {
    /// Stable, human-readable name (logs, stuck-component reports).
    fn name(&self) -> &str;

    /// Execution model. Host-driven unless overridden.
    fn execution(&self) -> Execution {
        Execution::HostDriven
    }

    /// Acquires resources and registers with collaborators (e.g. bus subscriptions).
    async fn component_up(&self) -> Result<(), ComponentError> {
        Ok(())
    }

    /// Owned loop of a self-driven component. Must return promptly once `ctx` is cancelled.
    ///
    /// Never called for host-driven components.
    async fn component_run(&self, ctx: CancellationToken) -> Result<(), ComponentError> {
        ctx.cancelled().await;
        Ok(())
    }

    /// Releases what `component_up` acquired. Called at most once.
    async fn component_down(&self) {}

    /// Unblocks anything waiting on the component. Called once per lifecycle,
    /// from any state, before the owned task is joined and before `component_down`.
    ///
    /// Must not block.
    fn component_abort(&self) {}
}

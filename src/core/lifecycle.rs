//! # Lifecycle: the state machine around one [`Component`].
//!
//! [`Lifecycle`] wraps any component and enforces the start/stop contract:
//!
//! - transitions are serialized by a mutex and checked against
//!   [`ComponentState`];
//! - a self-driven component gets its own task with a cancellation token;
//!   `terminate` cancels it and **waits** for it before calling
//!   `component_down`;
//! - `component_abort` runs on the first `terminate` from any state, so waiters
//!   on a component that never came up are released too;
//! - `component_down` runs at most once, however often `terminate` is called,
//!   including when `terminate` races a running `component_up`;
//! - dropping a `Lifecycle` that was never terminated cancels and aborts the
//!   owned task, so no loop outlives its handle.
//!
//! ## Event flow
//! ```text
//! initialize() ─► component_up()
//! startup()    ─► running=true ─► tokio::spawn(component_run(token)) ─► running=false on return
//! terminate()  ─► running=false ─► component_abort() ─► token.cancel() ─► join ─► component_down()
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::component::{Component, ComponentState, Execution};
use crate::error::ComponentError;

/// Start/stop contract around a shared component.
pub struct Lifecycle {
    component: Arc<dyn Component>,
    state: Mutex<ComponentState>,
    running: Arc<AtomicBool>,
    token: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
    down_called: AtomicBool,
    terminated: AtomicBool,
}

impl Lifecycle {
    /// Wraps `component` in the `Idle` state.
    pub fn new(component: Arc<dyn Component>) -> Self {
        Self {
            component,
            state: Mutex::new(ComponentState::Idle),
            running: Arc::new(AtomicBool::new(false)),
            token: CancellationToken::new(),
            task: Mutex::new(None),
            down_called: AtomicBool::new(false),
            terminated: AtomicBool::new(false),
        }
    }

    /// Name of the wrapped component.
    pub fn name(&self) -> &str {
        self.component.name()
    }

    /// Current state.
    pub fn state(&self) -> ComponentState {
        *self.lock_state()
    }

    /// True between `startup` and `terminate`; for self-driven components also
    /// false once `component_run` returned on its own.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// True once `terminate` finished (owned task joined, `component_down` done).
    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::Acquire)
    }

    /// `Idle → Initialized`, calling `component_up`.
    ///
    /// On failure the component stays `Idle`. If `terminate` ran while
    /// `component_up` was in flight, the acquired resources are released with
    /// `component_down` and the transition is reported as invalid.
    pub async fn initialize(&self) -> Result<(), ComponentError> {
        self.expect_state(ComponentState::Idle, "initialize")?;
        self.component.component_up().await?;

        let raced = {
            let mut state = self.lock_state();
            if *state == ComponentState::Idle {
                *state = ComponentState::Initialized;
                None
            } else {
                Some(*state)
            }
        };
        if let Some(from) = raced {
            // terminate() saw Idle and skipped component_down.
            if self.release() {
                self.component.component_down().await;
            }
            return Err(self.invalid(from, "initialize"));
        }
        debug!(component = self.name(), "component initialized");
        Ok(())
    }

    /// `Initialized → Running`; spawns the owned loop for self-driven components.
    ///
    /// Must be called from within a tokio runtime.
    pub fn startup(&self) -> Result<(), ComponentError> {
        let mut state = self.lock_state();
        if *state != ComponentState::Initialized {
            return Err(self.invalid(*state, "start"));
        }
        *state = ComponentState::Running;
        self.running.store(true, Ordering::Release);

        if self.component.execution() == Execution::SelfDriven {
            let component = Arc::clone(&self.component);
            let running = Arc::clone(&self.running);
            let token = self.token.child_token();
            let handle = tokio::spawn(async move {
                match component.component_run(token).await {
                    Ok(()) => debug!(component = component.name(), "component loop finished"),
                    Err(e) => error!(
                        component = component.name(),
                        error = %e,
                        label = e.as_label(),
                        "component loop failed"
                    ),
                }
                running.store(false, Ordering::Release);
            });
            *self.task.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
        }
        info!(component = self.name(), execution = ?self.component.execution(), "component started");
        Ok(())
    }

    /// Any state `→ Stopped`.
    ///
    /// ### Flow
    /// 1. Mark stopped (later calls return immediately)
    /// 2. Call `component_abort`
    /// 3. Cancel and join the owned task, if any
    /// 4. Call `component_down` once, unless the component never came up
    pub async fn terminate(&self) {
        let previous = {
            let mut state = self.lock_state();
            if *state == ComponentState::Stopped {
                return;
            }
            std::mem::replace(&mut *state, ComponentState::Stopped)
        };
        self.running.store(false, Ordering::Release);
        self.component.component_abort();
        self.token.cancel();

        let task = self.task.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                error!(component = self.name(), error = %e, "component loop panicked");
            }
        }

        if previous != ComponentState::Idle && self.release() {
            self.component.component_down().await;
        }
        self.terminated.store(true, Ordering::Release);
        info!(component = self.name(), from = ?previous, "component stopped");
    }

    /// Claims the single `component_down` call. True for the first caller only.
    fn release(&self) -> bool {
        !self.down_called.swap(true, Ordering::AcqRel)
    }

    fn lock_state(&self) -> MutexGuard<'_, ComponentState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn expect_state(&self, want: ComponentState, op: &'static str) -> Result<(), ComponentError> {
        let state = self.state();
        if state == want {
            Ok(())
        } else {
            Err(self.invalid(state, op))
        }
    }

    fn invalid(&self, from: ComponentState, op: &'static str) -> ComponentError {
        ComponentError::InvalidTransition {
            component: self.name().to_string(),
            from,
            op,
        }
    }
}

impl Drop for Lifecycle {
    fn drop(&mut self) {
        self.token.cancel();
        let task = self.task.get_mut().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(task) = task {
            task.abort();
        }
    }
}

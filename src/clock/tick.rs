//! # Clock: periodic `time-tick` publisher.
//!
//! [`Clock`] turns a [`TimeSource`] into a stream of [`TimeTick`] events on the
//! bus and lets any number of tasks rendezvous with the next tick.
//!
//! ```text
//! tick():
//!   lock(next)
//!   now = source.now()
//!   now <  next → return false                  (backward jumps never refire)
//!   now >= next → bus.publish(time-tick{now})
//!                 next = now + frequency
//!                 watch ◄── Tick{count+1, now}  ──► wakes every sync() waiter
//!
//! self-driven: loop { select!(cancelled → break, sleep(poll_interval) → tick()) }
//! host-driven: caller invokes tick()
//! component_abort: watch ◄── Stopped             ──► sync() waiters get Aborted
//! ```
//!
//! ## Rules
//! - at most one tick per `frequency` seconds of source time;
//! - the first tick fires `frequency` seconds after the clock came up;
//! - a stopped clock never ticks again.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use super::source::TimeSource;
use super::time::DtnTime;
use crate::core::{ClockConfig, Component, Execution};
use crate::error::{ClockError, ComponentError};
use crate::events::{Event, EventBus, names};

/// What a tick means to its receivers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum TimeAction {
    /// The clock advanced by its configured frequency.
    SecondTick,
}

/// Payload of every `time-tick` event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimeTick {
    pub timestamp: DtnTime,
    pub action: TimeAction,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum TickState {
    Idle,
    Tick { count: u64, at: DtnTime },
    Stopped,
}

#[derive(Debug)]
struct Schedule {
    next: DtnTime,
    fired: u64,
}

/// Periodic tick publisher.
pub struct Clock {
    bus: EventBus,
    source: Arc<dyn TimeSource>,
    frequency: u64,
    poll_interval: Duration,
    execution: Execution,
    schedule: Mutex<Schedule>,
    ticks: watch::Sender<TickState>,
}

impl Clock {
    /// Creates a clock publishing on `bus`, reading time from `source`.
    pub fn new(bus: EventBus, source: Arc<dyn TimeSource>, cfg: &ClockConfig) -> Self {
        let frequency = cfg.frequency_secs();
        let next = source.now().saturating_add(frequency);
        let (ticks, _) = watch::channel(TickState::Idle);
        Self {
            bus,
            source,
            frequency,
            poll_interval: cfg.poll_interval,
            execution: cfg.execution,
            schedule: Mutex::new(Schedule { next, fired: 0 }),
            ticks,
        }
    }

    /// The time source ticks are derived from.
    pub fn source(&self) -> &Arc<dyn TimeSource> {
        &self.source
    }

    /// Current source time.
    pub fn now(&self) -> DtnTime {
        self.source.now()
    }

    /// Tick interval in seconds.
    pub fn frequency(&self) -> u64 {
        self.frequency
    }

    /// Number of ticks fired so far.
    pub fn tick_count(&self) -> u64 {
        self.lock_schedule().fired
    }

    /// True once [`stop`](Self::stop) ran.
    pub fn is_stopped(&self) -> bool {
        matches!(*self.ticks.borrow(), TickState::Stopped)
    }

    /// Fires a tick if one is due. Returns whether it fired.
    pub fn tick(&self) -> bool {
        let mut schedule = self.lock_schedule();
        if self.is_stopped() {
            return false;
        }
        let now = self.source.now();
        if now < schedule.next {
            return false;
        }
        schedule.next = now.saturating_add(self.frequency);
        schedule.fired += 1;
        let count = schedule.fired;

        // Published under the lock so ticks reach the bus in order.
        self.bus.publish(Event::new(names::TIME_TICK).with_source("clock").with_payload(TimeTick {
            timestamp: now,
            action: TimeAction::SecondTick,
        }));
        self.ticks.send_replace(TickState::Tick { count, at: now });
        trace!(timestamp = now.as_secs(), "tick");
        true
    }

    /// Waits for the next tick and returns its timestamp.
    ///
    /// ### Errors
    /// [`ClockError::Aborted`] if the clock is (or becomes) stopped.
    pub async fn sync(&self) -> Result<DtnTime, ClockError> {
        let mut rx = self.ticks.subscribe();
        if matches!(*rx.borrow_and_update(), TickState::Stopped) {
            return Err(ClockError::Aborted);
        }
        loop {
            if rx.changed().await.is_err() {
                return Err(ClockError::Aborted);
            }
            match *rx.borrow_and_update() {
                TickState::Tick { at, .. } => return Ok(at),
                TickState::Stopped => return Err(ClockError::Aborted),
                TickState::Idle => continue,
            }
        }
    }

    /// [`sync`](Self::sync) bounded by `timeout`.
    pub async fn sync_timeout(&self, timeout: Duration) -> Result<DtnTime, ClockError> {
        tokio::time::timeout(timeout, self.sync())
            .await
            .map_err(|_| ClockError::Timeout { timeout })?
    }

    /// Stops ticking and releases every `sync` waiter with `Aborted`. Idempotent.
    pub fn stop(&self) {
        let schedule = self.lock_schedule();
        let changed = self.ticks.send_if_modified(|state| {
            if *state == TickState::Stopped {
                false
            } else {
                *state = TickState::Stopped;
                true
            }
        });
        if changed {
            debug!(ticks = schedule.fired, "clock stopped");
        }
    }

    fn lock_schedule(&self) -> MutexGuard<'_, Schedule> {
        self.schedule.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl Component for Clock {
    fn name(&self) -> &str {
        "clock"
    }

    fn execution(&self) -> Execution {
        self.execution
    }

    async fn component_up(&self) -> Result<(), ComponentError> {
        let now = self.source.now();
        self.lock_schedule().next = now.saturating_add(self.frequency);
        debug!(now = now.as_secs(), frequency = self.frequency, "clock up");
        Ok(())
    }

    async fn component_run(&self, ctx: CancellationToken) -> Result<(), ComponentError> {
        loop {
            tokio::select! {
                _ = ctx.cancelled() => break,
                _ = tokio::time::sleep(self.poll_interval) => {
                    self.tick();
                }
            }
        }
        Ok(())
    }

    // Runs on every terminate, also when the clock never came up.
    fn component_abort(&self) {
        self.stop();
    }
}

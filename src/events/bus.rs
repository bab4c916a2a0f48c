//! # Event bus: named subscriptions and a single ordered dispatch loop.
//!
//! [`EventBus`] decouples publishers (clock, convergence layers, storage,
//! routing) from the handlers that react to them. It is constructed
//! explicitly and injected into every component; clones share one queue and
//! one subscriber registry.
//!
//! ## Architecture
//! ```text
//! Publishers (many):                  Dispatch loop (one):
//!   Clock    ──┐
//!   Storage  ──┼──► FIFO (unbounded) ──► snapshot handlers[name] ──► h1, h2, ... hN
//!   Router   ──┤                              (under mutex)          (sequential,
//!   CL       ──┘                                                      registration order)
//! ```
//!
//! ## Rules
//! - **Non-blocking publish**: `publish()` only enqueues.
//! - **Wait mode**: `publish_and_wait()` resolves after every handler that was
//!   registered at dispatch time returned, or with [`BusError::ShuttingDown`].
//! - **Isolation**: a handler that errors or panics is logged and skipped; the
//!   loop keeps going and publishes `subscriber-failed`.
//! - **No subscriber**: the event is dropped silently.
//! - **Shutdown**: new events are refused, queued events are drained or
//!   discarded per [`ShutdownMode`], then the loop exits. A bus is never
//!   restarted after shutdown.

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::FutureExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, trace, warn};

use super::completion::{Completion, Delivery};
use super::event::Event;
use crate::core::{BusConfig, ShutdownMode};
use crate::error::BusError;
use crate::subscribers::{Subscribe, SubscriberSet};

/// Queue item: the event plus an optional wait-mode completion.
struct Envelope {
    event: Event,
    completion: Option<Completion>,
}

/// State shared by every bus handle and the dispatch loop.
struct Shared {
    subscribers: Mutex<SubscriberSet>,
    accepting: AtomicBool,
    shutdown: CancellationToken,
    /// Cancelled once the dispatch loop has exited (or the queue was settled inline).
    stopped: CancellationToken,
    receiver: Mutex<Option<mpsc::UnboundedReceiver<Envelope>>>,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
    mode: ShutdownMode,
}

impl Shared {
    fn subscribers(&self) -> MutexGuard<'_, SubscriberSet> {
        self.subscribers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Process-wide publish/subscribe bus.
///
/// ### Properties
/// - **Cloneable**: cheap to clone (sender plus `Arc`-backed state).
/// - **Ordered**: one consumer, FIFO across all publishers.
/// - **Explicit lifecycle**: [`start`](Self::start) once, [`shutdown`](Self::shutdown) once.
#[derive(Clone)]
pub struct EventBus {
    tx: mpsc::UnboundedSender<Envelope>,
    shared: Arc<Shared>,
}

impl EventBus {
    /// Creates a bus. Events published before [`start`](Self::start) are queued.
    pub fn new(cfg: &BusConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            subscribers: Mutex::new(SubscriberSet::new()),
            accepting: AtomicBool::new(true),
            shutdown: CancellationToken::new(),
            stopped: CancellationToken::new(),
            receiver: Mutex::new(Some(rx)),
            dispatcher: Mutex::new(None),
            mode: cfg.shutdown,
        });
        Self { tx, shared }
    }

    /// Spawns the dispatch loop.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// ### Errors
    /// - [`BusError::AlreadyStarted`] if the loop already runs.
    /// - [`BusError::NotRunning`] if the bus was shut down.
    pub fn start(&self) -> Result<(), BusError> {
        if !self.shared.accepting.load(Ordering::Acquire) {
            return Err(BusError::NotRunning);
        }
        let mut dispatcher = self
            .shared
            .dispatcher
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if dispatcher.is_some() {
            return Err(BusError::AlreadyStarted);
        }
        let rx = self
            .shared
            .receiver
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or(BusError::NotRunning)?;

        let worker = Dispatcher {
            shared: Arc::clone(&self.shared),
            tx: self.tx.downgrade(),
        };
        *dispatcher = Some(tokio::spawn(worker.run(rx)));
        debug!("event bus dispatch loop started");
        Ok(())
    }

    /// True while the bus accepts new events.
    pub fn is_running(&self) -> bool {
        self.shared.accepting.load(Ordering::Acquire)
    }

    /// Enqueues an event for dispatch (fire-and-forget).
    ///
    /// After shutdown the event is dropped.
    pub fn publish(&self, event: Event) {
        enqueue(&self.shared, &self.tx, Envelope {
            event,
            completion: None,
        });
    }

    /// Enqueues an event and waits until every handler registered for its
    /// name at dispatch time has returned.
    ///
    /// ### Errors
    /// [`BusError::ShuttingDown`] if the bus refused the event or discarded it
    /// during shutdown.
    pub async fn publish_and_wait(&self, event: Event) -> Result<Delivery, BusError> {
        let (completion, rx) = Completion::channel();
        if !enqueue(&self.shared, &self.tx, Envelope {
            event,
            completion: Some(completion),
        }) {
            return Err(BusError::ShuttingDown);
        }
        rx.await.map_err(|_| BusError::ShuttingDown)
    }

    /// Registers `sub` for events named `name`.
    ///
    /// Returns `false` if it was already registered for that name.
    pub fn subscribe(&self, name: impl Into<Arc<str>>, sub: Arc<dyn Subscribe>) -> bool {
        let name = name.into();
        let added = self.shared.subscribers().insert(Arc::clone(&name), sub);
        trace!(event = %name, added, "subscribe");
        added
    }

    /// Removes `sub` from events named `name`. Removing an absent handler is a no-op.
    pub fn unsubscribe(&self, name: &str, sub: &Arc<dyn Subscribe>) -> bool {
        let removed = self.shared.subscribers().remove(name, sub);
        trace!(event = %name, removed, "unsubscribe");
        removed
    }

    /// Number of handlers currently registered for `name`.
    pub fn subscriber_count(&self, name: &str) -> usize {
        self.shared.subscribers().count(name)
    }

    /// Stops the bus and waits for the dispatch loop to exit.
    ///
    /// ### Flow
    /// 1. Refuse new events
    /// 2. Drain or discard queued events per [`ShutdownMode`]
    /// 3. Release pending `publish_and_wait` callers
    ///
    /// Later and concurrent calls do no work of their own but still return only
    /// once the loop has exited.
    pub async fn shutdown(&self) {
        if !self.shared.accepting.swap(false, Ordering::AcqRel) {
            self.shared.stopped.cancelled().await;
            return;
        }
        let _stopped = self.shared.stopped.clone().drop_guard();
        self.shared.shutdown.cancel();

        let handle = self
            .shared
            .dispatcher
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        match handle {
            Some(handle) => {
                if let Err(e) = handle.await {
                    error!(error = %e, "event bus dispatch loop ended abnormally");
                }
            }
            None => {
                // Never started: settle whatever was queued so waiters are released.
                let rx = self
                    .shared
                    .receiver
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .take();
                if let Some(rx) = rx {
                    let worker = Dispatcher {
                        shared: Arc::clone(&self.shared),
                        tx: self.tx.downgrade(),
                    };
                    worker.finish(rx).await;
                }
            }
        }
        debug!("event bus stopped");
    }
}

/// Returns `false` if the event was refused.
fn enqueue(shared: &Shared, tx: &mpsc::UnboundedSender<Envelope>, env: Envelope) -> bool {
    if !shared.accepting.load(Ordering::Acquire) {
        debug!(event = %env.event.name(), "event bus stopped; dropping event");
        return false;
    }
    match tx.send(env) {
        Ok(()) => true,
        Err(mpsc::error::SendError(env)) => {
            debug!(event = %env.event.name(), "event bus queue closed; dropping event");
            false
        }
    }
}

/// The single consumer of the queue.
struct Dispatcher {
    shared: Arc<Shared>,
    tx: mpsc::WeakUnboundedSender<Envelope>,
}

impl Dispatcher {
    async fn run(self, mut rx: mpsc::UnboundedReceiver<Envelope>) {
        loop {
            tokio::select! {
                biased;
                _ = self.shared.shutdown.cancelled() => break,
                msg = rx.recv() => match msg {
                    Some(env) => self.dispatch(env).await,
                    None => break,
                }
            }
        }
        self.finish(rx).await;
    }

    /// Closes the queue and settles what is left in it.
    async fn finish(&self, mut rx: mpsc::UnboundedReceiver<Envelope>) {
        rx.close();
        let mut settled = 0usize;
        while let Some(env) = rx.recv().await {
            match self.shared.mode {
                ShutdownMode::Drain => self.dispatch(env).await,
                // Dropping the envelope drops its completion: waiters see ShuttingDown.
                ShutdownMode::Discard => drop(env),
            }
            settled += 1;
        }
        if settled > 0 {
            debug!(events = settled, mode = ?self.shared.mode, "event bus settled queued events");
        }
    }

    async fn dispatch(&self, env: Envelope) {
        let Envelope {
            event,
            mut completion,
        } = env;
        let handlers = self.shared.subscribers().snapshot(event.name());

        if let Some(c) = completion.as_mut() {
            c.arm(handlers.len());
        }
        if handlers.is_empty() {
            trace!(event = %event.name(), seq = event.seq, "no subscriber");
            return;
        }

        for sub in handlers {
            let ok = self.invoke(sub.as_ref(), &event).await;
            if let Some(c) = completion.as_mut() {
                c.ack(ok);
            }
        }
    }

    async fn invoke(&self, sub: &dyn Subscribe, event: &Event) -> bool {
        let reason = match AssertUnwindSafe(sub.on_event(event)).catch_unwind().await {
            Ok(Ok(())) => return true,
            Ok(Err(e)) => e.to_string(),
            Err(panic) => panic_message(panic.as_ref()),
        };

        warn!(
            subscriber = sub.name(),
            event = %event.name(),
            seq = event.seq,
            %reason,
            "subscriber failed"
        );
        // A failing failure handler must not feed itself.
        if !event.is_subscriber_failure() {
            if let Some(tx) = self.tx.upgrade() {
                enqueue(&self.shared, &tx, Envelope {
                    event: Event::subscriber_failed(sub.name(), reason),
                    completion: None,
                });
            }
        }
        false
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

//! # ExpiryExtension: turns clock ticks into `bundle-expired` events.
//!
//! A host-driven component: it owns no task and only reacts to bus events.
//!
//! ```text
//! bundle-received(MetaBundle) ──► summary.add(bundle, quality)
//! bundle-removed(BundleId)    ──► summary.remove(id)
//! time-tick(TimeTick)         ──► summary.expire(tick.timestamp, quality)
//!                                   └─► for each evicted id: publish bundle-expired(BundleId)
//! ```
//!
//! The summary lock is released before anything is published.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tracing::{debug, info};

use crate::clock::{TimeSource, TimeTick};
use crate::core::{Component, Execution, RegistryConfig};
use crate::error::{ComponentError, SubscriberError};
use crate::events::{Event, EventBus, names};
use crate::registry::{BundleId, BundleSummary, Entry, ExpireOutcome, MetaBundle, SummaryVector};
use crate::subscribers::Subscribe;

const SOURCE: &str = "expiry";

const WATCHED: [&str; 3] = [names::TIME_TICK, names::BUNDLE_RECEIVED, names::BUNDLE_REMOVED];

/// Tracks known bundles and expires them on every tick.
pub struct ExpiryExtension {
    bus: EventBus,
    tracker: Arc<Tracker>,
}

struct Tracker {
    bus: EventBus,
    source: Arc<dyn TimeSource>,
    summary: Mutex<BundleSummary>,
}

impl ExpiryExtension {
    pub fn new(bus: EventBus, source: Arc<dyn TimeSource>, cfg: &RegistryConfig) -> Self {
        let tracker = Arc::new(Tracker {
            bus: bus.clone(),
            source,
            summary: Mutex::new(BundleSummary::new(cfg)),
        });
        Self { bus, tracker }
    }

    /// Starts tracking `bundle` without going through the bus.
    pub fn track(&self, bundle: &MetaBundle) -> bool {
        self.tracker.track(bundle)
    }

    /// Stops tracking `id` without going through the bus.
    pub fn forget(&self, id: &BundleId) -> bool {
        self.tracker.lock().remove(id)
    }

    pub fn contains(&self, id: &BundleId) -> bool {
        self.tracker.lock().contains(id)
    }

    /// Number of tracked bundles.
    pub fn known(&self) -> usize {
        self.tracker.lock().len()
    }

    /// Snapshot of the summary vector.
    pub fn summary(&self) -> SummaryVector {
        self.tracker.lock().summary()
    }

    pub fn version(&self) -> u64 {
        self.tracker.lock().version()
    }

    fn handler(&self) -> Arc<dyn Subscribe> {
        self.tracker.clone()
    }
}

impl Tracker {
    fn lock(&self) -> MutexGuard<'_, BundleSummary> {
        self.summary.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn track(&self, bundle: &MetaBundle) -> bool {
        let quality = self.source.quality();
        self.lock().add(bundle, quality)
    }

    fn on_tick(&self, tick: &TimeTick) {
        let quality = self.source.quality();
        let mut expired = Vec::new();
        let outcome = self
            .lock()
            .expire(tick.timestamp, quality, &mut |e: &Entry<BundleId>| expired.push(e.key.clone()));

        match outcome {
            ExpireOutcome::Untrusted => {
                debug!(quality = quality.value(), "clock untrusted; skipping expiry");
            }
            ExpireOutcome::Evicted(0) => {}
            ExpireOutcome::Evicted(n) => {
                info!(evicted = n, timestamp = tick.timestamp.as_secs(), "bundles expired");
                for id in expired {
                    self.bus
                        .publish(Event::new(names::BUNDLE_EXPIRED).with_source(SOURCE).with_payload(id));
                }
            }
        }
    }
}

#[async_trait]
impl Subscribe for Tracker {
    async fn on_event(&self, e: &Event) -> Result<(), SubscriberError> {
        match e.name() {
            names::TIME_TICK => {
                let tick = e
                    .payload::<TimeTick>()
                    .ok_or_else(|| SubscriberError::failed("time-tick without TimeTick payload"))?;
                self.on_tick(tick);
            }
            names::BUNDLE_RECEIVED => {
                let bundle = e
                    .payload::<MetaBundle>()
                    .ok_or_else(|| SubscriberError::failed("bundle-received without MetaBundle payload"))?;
                self.track(bundle);
            }
            names::BUNDLE_REMOVED => {
                let id = e
                    .payload::<BundleId>()
                    .ok_or_else(|| SubscriberError::failed("bundle-removed without BundleId payload"))?;
                self.lock().remove(id);
            }
            _ => {}
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "ExpiryExtension"
    }
}

#[async_trait]
impl Component for ExpiryExtension {
    fn name(&self) -> &str {
        SOURCE
    }

    fn execution(&self) -> Execution {
        Execution::HostDriven
    }

    async fn component_up(&self) -> Result<(), ComponentError> {
        let handler = self.handler();
        for name in WATCHED {
            self.bus.subscribe(name, Arc::clone(&handler));
        }
        Ok(())
    }

    async fn component_down(&self) {
        let handler = self.handler();
        for name in WATCHED {
            self.bus.unsubscribe(name, &handler);
        }
        debug!(known = self.known(), "expiry extension detached");
    }
}

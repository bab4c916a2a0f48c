//! # LogWriter: event tracer
//!
//! A subscriber that renders well-known daemon events through `tracing`.
//! Attach it to the names you want to watch; unknown names are logged at
//! debug level with their sequence number only.
//!
//! ## Example output
//! ```text
//! INFO  time tick timestamp=781920000
//! INFO  bundle received bundle=dtn://node1/app@781919990.3 expires=781923590
//! INFO  bundle expired bundle=dtn://node1/app@781919990.3
//! WARN  subscriber failed subscriber="storage" reason="disk full"
//! INFO  global shutdown reason="signal"
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::clock::TimeTick;
use crate::error::SubscriberError;
use crate::events::{Event, EventBus, names};
use crate::registry::{BundleId, MetaBundle};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Creates a writer and subscribes it to every name in `event_names`.
    pub fn attach<'a>(
        bus: &EventBus,
        event_names: impl IntoIterator<Item = &'a str>,
    ) -> Arc<dyn Subscribe> {
        let writer: Arc<dyn Subscribe> = Arc::new(Self::new());
        for name in event_names {
            bus.subscribe(name, Arc::clone(&writer));
        }
        writer
    }

    /// The names the daemon itself publishes.
    pub fn default_names() -> [&'static str; 5] {
        [
            names::TIME_TICK,
            names::BUNDLE_RECEIVED,
            names::BUNDLE_EXPIRED,
            names::SUBSCRIBER_FAILED,
            names::GLOBAL_SHUTDOWN,
        ]
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) -> Result<(), SubscriberError> {
        match e.name() {
            names::TIME_TICK => match e.payload::<TimeTick>() {
                Some(tick) => info!(timestamp = tick.timestamp.as_secs(), "time tick"),
                None => debug!(seq = e.seq, "time tick without payload"),
            },
            names::BUNDLE_RECEIVED => match e.payload::<MetaBundle>() {
                Some(b) => info!(bundle = %b.id, lifetime = b.lifetime, "bundle received"),
                None => debug!(seq = e.seq, "bundle received without payload"),
            },
            names::BUNDLE_EXPIRED | names::BUNDLE_REMOVED => {
                let what = if e.is(names::BUNDLE_EXPIRED) {
                    "bundle expired"
                } else {
                    "bundle removed"
                };
                match e.payload::<BundleId>() {
                    Some(id) => info!(bundle = %id, "{what}"),
                    None => debug!(seq = e.seq, "{what} without payload"),
                }
            }
            names::SUBSCRIBER_FAILED => {
                warn!(
                    subscriber = e.source.as_deref().unwrap_or("unknown"),
                    reason = e.reason.as_deref().unwrap_or("unknown"),
                    "subscriber failed"
                );
            }
            names::GLOBAL_SHUTDOWN => {
                info!(reason = e.reason.as_deref().unwrap_or("requested"), "global shutdown");
            }
            other => debug!(event = other, seq = e.seq, "event"),
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}

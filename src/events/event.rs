//! # Events carried by the bus.
//!
//! An [`Event`] is an immutable message identified by a stable type name (not a
//! Rust type name) plus an optional payload that is opaque to the bus.
//! Subscribers register per name; the payload is recovered by downcast.
//!
//! The names used by the daemon itself live in [`names`]. Collaborators outside
//! the core (convergence layers, storage) publish under the same strings.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore publication order when correlating logs.
//!
//! ## Example
//! ```rust
//! use dtn_core::{Event, names};
//!
//! #[derive(Debug, PartialEq)]
//! struct Stored { bytes: usize }
//!
//! let ev = Event::new(names::STORAGE_CHANGED).with_payload(Stored { bytes: 512 });
//!
//! assert_eq!(ev.name(), "storage-changed");
//! assert_eq!(ev.payload::<Stored>(), Some(&Stored { bytes: 512 }));
//! assert!(ev.payload::<String>().is_none());
//! ```

use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Stable type names of the events exchanged inside the daemon.
pub mod names {
    /// Periodic tick published by the [`Clock`](crate::Clock); payload [`TimeTick`](crate::TimeTick).
    pub const TIME_TICK: &str = "time-tick";
    /// A bundle arrived from a convergence layer; payload [`MetaBundle`](crate::MetaBundle).
    pub const BUNDLE_RECEIVED: &str = "bundle-received";
    /// A bundle was deleted from storage; payload [`BundleId`](crate::BundleId).
    pub const BUNDLE_REMOVED: &str = "bundle-removed";
    /// A bundle lifetime elapsed; payload [`BundleId`](crate::BundleId).
    pub const BUNDLE_EXPIRED: &str = "bundle-expired";
    /// A convergence layer finished sending a bundle.
    pub const TRANSFER_COMPLETED: &str = "transfer-completed";
    /// A convergence layer gave up sending a bundle.
    pub const TRANSFER_ABORTED: &str = "transfer-aborted";
    /// Bundle storage contents changed.
    pub const STORAGE_CHANGED: &str = "storage-changed";
    /// A subscriber returned an error or panicked; see [`Event::reason`](crate::Event::reason).
    pub const SUBSCRIBER_FAILED: &str = "subscriber-failed";
    /// The supervisor is going down.
    pub const GLOBAL_SHUTDOWN: &str = "global-shutdown";
}

/// Bus message: a stable type name with optional metadata and payload.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - `source`/`reason`: set by the core for diagnostic events
#[derive(Clone)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp of creation.
    pub at: SystemTime,
    /// Name of the publisher, if it chose to identify itself.
    pub source: Option<Arc<str>>,
    /// Human-readable reason (failures, shutdown cause).
    pub reason: Option<Arc<str>>,

    name: Arc<str>,
    payload: Option<Arc<dyn Any + Send + Sync>>,
}

impl Event {
    /// Creates a new event with the given type name, current timestamp and next sequence number.
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            source: None,
            reason: None,
            name: name.into(),
            payload: None,
        }
    }

    /// Stable type name used for subscriber lookup.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Attaches a payload. The bus never inspects it.
    #[inline]
    pub fn with_payload<T: Any + Send + Sync>(mut self, payload: T) -> Self {
        self.payload = Some(Arc::new(payload));
        self
    }

    /// Attaches the publisher's name.
    #[inline]
    pub fn with_source(mut self, source: impl Into<Arc<str>>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Returns the payload if it is a `T`.
    #[inline]
    pub fn payload<T: Any>(&self) -> Option<&T> {
        self.payload.as_deref().and_then(|p| p.downcast_ref::<T>())
    }

    /// True if the event carries any payload.
    #[inline]
    pub fn has_payload(&self) -> bool {
        self.payload.is_some()
    }

    /// True if this event was published under `name`.
    #[inline]
    pub fn is(&self, name: &str) -> bool {
        &*self.name == name
    }

    /// Creates a subscriber failure event.
    #[inline]
    pub fn subscriber_failed(subscriber: &'static str, reason: impl Into<Arc<str>>) -> Self {
        Event::new(names::SUBSCRIBER_FAILED)
            .with_source(subscriber)
            .with_reason(reason)
    }

    /// True for [`names::SUBSCRIBER_FAILED`] events, which the bus never re-reports.
    #[inline]
    pub fn is_subscriber_failure(&self) -> bool {
        self.is(names::SUBSCRIBER_FAILED)
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("seq", &self.seq)
            .field("name", &self.name)
            .field("source", &self.source)
            .field("reason", &self.reason)
            .field("has_payload", &self.payload.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_numbers_increase() {
        let a = Event::new("a");
        let b = Event::new("b");
        assert!(b.seq > a.seq);
    }

    #[test]
    fn payload_downcast_matches_type_only() {
        let ev = Event::new(names::BUNDLE_REMOVED).with_payload(42u64);
        assert_eq!(ev.payload::<u64>(), Some(&42));
        assert_eq!(ev.payload::<u32>(), None);
        assert!(ev.has_payload());
        assert!(!Event::new("x").has_payload());
    }

    #[test]
    fn clones_share_payload() {
        let ev = Event::new("blob").with_payload(vec![1u8, 2, 3]);
        let copy = ev.clone();
        assert_eq!(copy.seq, ev.seq);
        assert_eq!(copy.payload::<Vec<u8>>(), Some(&vec![1, 2, 3]));
    }

    #[test]
    fn subscriber_failure_carries_source_and_reason() {
        let ev = Event::subscriber_failed("router", "boom");
        assert!(ev.is_subscriber_failure());
        assert_eq!(ev.source.as_deref(), Some("router"));
        assert_eq!(ev.reason.as_deref(), Some("boom"));
    }
}

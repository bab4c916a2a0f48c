//! Bundle identity and the bundle list.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use super::expiring::ExpiringRegistry;
use crate::clock::{ClockQuality, DtnTime};

/// Endpoint identifier (e.g. `dtn://node1/app`). Cheap to clone.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EndpointId(Arc<str>);

impl EndpointId {
    pub fn new(eid: impl Into<Arc<str>>) -> Self {
        Self(eid.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EndpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EndpointId {
    fn from(eid: &str) -> Self {
        Self::new(eid)
    }
}

/// Globally unique bundle identity.
///
/// Ordered by creation timestamp, then sequence number, then source, so
/// older bundles sort first.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct BundleId {
    pub source: EndpointId,
    pub timestamp: DtnTime,
    pub sequence: u64,
}

impl BundleId {
    pub fn new(source: impl Into<EndpointId>, timestamp: DtnTime, sequence: u64) -> Self {
        Self {
            source: source.into(),
            timestamp,
            sequence,
        }
    }
}

impl Ord for BundleId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.timestamp
            .cmp(&other.timestamp)
            .then(self.sequence.cmp(&other.sequence))
            .then_with(|| self.source.cmp(&other.source))
    }
}

impl PartialOrd for BundleId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for BundleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}.{}", self.source, self.timestamp, self.sequence)
    }
}

/// What the registries need to know about a bundle.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MetaBundle {
    pub id: BundleId,
    /// Lifetime in seconds from `id.timestamp`.
    pub lifetime: u64,
}

impl MetaBundle {
    pub fn new(id: BundleId, lifetime: u64) -> Self {
        Self { id, lifetime }
    }

    /// Expiry instant given the current clock quality.
    ///
    /// See [`ClockQuality::expire_time`].
    pub fn expire_time(&self, quality: ClockQuality) -> DtnTime {
        quality.expire_time(self.id.timestamp, self.lifetime)
    }
}

/// Expiring set of bundle ids.
pub type BundleList = ExpiringRegistry<BundleId>;

impl ExpiringRegistry<BundleId> {
    /// Adds `bundle` with its quality-adjusted expiry.
    pub fn add_bundle(&mut self, bundle: &MetaBundle, quality: ClockQuality) -> bool {
        self.add(bundle.id.clone(), bundle.expire_time(quality))
    }
}

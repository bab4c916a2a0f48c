//! Expiring registries.
//!
//! - [`ExpiringRegistry`]: generic ordered set evicted by `expire(now)`;
//! - [`BundleList`]: the registry keyed by [`BundleId`];
//! - [`BundleSummary`]: a bundle list with a [`SummaryVector`] kept in lockstep.

mod bundle;
mod expiring;
mod summary;

pub use bundle::{BundleId, BundleList, EndpointId, MetaBundle};
pub use expiring::{Entry, ExpireOutcome, ExpiringRegistry, ExpiryObserver, IgnoreExpired};
pub use summary::{BundleSummary, SummaryVector};

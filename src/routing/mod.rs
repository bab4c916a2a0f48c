//! Routing extensions built on the core.
//!
//! - [`ExpiryExtension`]: expires tracked bundles on every clock tick.

mod expiry;

pub use expiry::ExpiryExtension;

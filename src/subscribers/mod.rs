//! # Event subscribers.
//!
//! This module provides the [`Subscribe`] trait, the per-name registry the bus
//! dispatches from, and the built-in [`LogWriter`].
//!
//! ## Architecture
//! ```text
//! Event flow:
//!   Clock ── publish("time-tick") ──► EventBus ──► SubscriberSet["time-tick"]
//!                                                        │
//!                                          ┌─────────────┼─────────────┐
//!                                          ▼             ▼             ▼
//!                                      LogWriter  ExpiryExtension  Storage ...
//! ```
//!
//! ## Subscriber types
//! - **Passive subscribers** - observe and react to events (logging, metrics)
//! - **Stateful subscribers** - maintain state driven by events (`ExpiryExtension`)

mod log;
mod set;
mod subscribe;

pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;

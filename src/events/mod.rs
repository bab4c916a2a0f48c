//! Bus events: data model, wait-mode completion and the bus itself.
//!
//! ## Contents
//! - [`Event`], [`names`] event payload carrier and the daemon's stable names
//! - [`Delivery`] outcome of `publish_and_wait`
//! - [`EventBus`] subscriptions, FIFO queue and the dispatch loop
//!
//! ## Quick reference
//! - **Publishers**: `Clock`, `ExpiryExtension`, `Supervisor`, the dispatch loop
//!   itself (`subscriber-failed`), and collaborators outside the core.
//! - **Consumers**: any [`Subscribe`](crate::Subscribe) registered by name.

mod bus;
mod completion;
mod event;

pub use bus::EventBus;
pub use completion::Delivery;
pub use event::{Event, names};

//! # Core subscriber trait
//!
//! `Subscribe` is the extension point for plugging event handlers into the
//! bus. A handler is registered under one or more event names with
//! [`EventBus::subscribe`](crate::EventBus::subscribe) and is invoked from the
//! single dispatch loop, in registration order.
//!
//! ## Contract
//! - Handlers run **sequentially** on the dispatch loop: a slow handler delays
//!   every event behind it. Hand long work to your own task.
//! - Returning `Err` or panicking is isolated: the failure is logged, a
//!   `subscriber-failed` event is published, and delivery continues with the
//!   next handler.
//! - Never hold a lock across `.await` inside `on_event`.
//!
//! ## Example
//! ```rust
//! use async_trait::async_trait;
//! use dtn_core::{Event, Subscribe, SubscriberError};
//!
//! struct Audit;
//!
//! #[async_trait]
//! impl Subscribe for Audit {
//!     async fn on_event(&self, ev: &Event) -> Result<(), SubscriberError> {
//!         if ev.reason.is_some() {
//!             return Err(SubscriberError::failed("unexpected reason"));
//!         }
//!         Ok(())
//!     }
//!     fn name(&self) -> &'static str { "audit" }
//! }
//! ```

use async_trait::async_trait;

use crate::error::SubscriberError;
use crate::events::Event;

/// Contract for event subscribers.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Handle a single event for this subscriber.
    ///
    /// # Parameters
    /// - `event`: Reference to the event (does not transfer ownership)
    async fn on_event(&self, event: &Event) -> Result<(), SubscriberError>;

    /// Human-readable name (for logs/metrics).
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

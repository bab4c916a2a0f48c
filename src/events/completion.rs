//! # Wait-mode delivery tracking.
//!
//! `publish_and_wait` hands the bus a [`Completion`] together with the event.
//! The dispatch loop arms it with the number of subscribers it is about to
//! call and acknowledges once per returned callback (success, error or panic).
//! The last acknowledgement resolves the publisher's oneshot.
//!
//! ```text
//! publisher ──► (event, Completion) ──► dispatch loop
//!     ▲                                    ├─ arm(n)
//!     │                                    ├─ ack() × n
//!     └──────── oneshot<Delivery> ◄────────┘ (pending == 0)
//! ```
//!
//! If the envelope is dropped before that (bus discarded its queue), the
//! oneshot sender is dropped and the publisher observes a shutdown.

use tokio::sync::oneshot;

/// Outcome of a `publish_and_wait` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Delivery {
    /// Number of subscribers the event was dispatched to.
    pub subscribers: usize,
    /// How many of them returned an error or panicked.
    pub failed: usize,
}

/// Publisher-owned completion signal for one wait-mode event.
#[derive(Debug)]
pub(crate) struct Completion {
    pending: usize,
    delivery: Delivery,
    tx: Option<oneshot::Sender<Delivery>>,
}

impl Completion {
    /// Creates a completion and the receiver the publisher waits on.
    pub(crate) fn channel() -> (Self, oneshot::Receiver<Delivery>) {
        let (tx, rx) = oneshot::channel();
        let completion = Self {
            pending: 0,
            delivery: Delivery::default(),
            tx: Some(tx),
        };
        (completion, rx)
    }

    /// Records how many subscribers must acknowledge. Resolves at once for zero.
    pub(crate) fn arm(&mut self, subscribers: usize) {
        self.pending = subscribers;
        self.delivery.subscribers = subscribers;
        if subscribers == 0 {
            self.finish();
        }
    }

    /// Acknowledges one subscriber.
    ///
    /// # Panics
    /// Panics if every recorded subscriber already acknowledged. An extra
    /// acknowledgement means the dispatch bookkeeping is broken.
    pub(crate) fn ack(&mut self, ok: bool) {
        self.pending = match self.pending.checked_sub(1) {
            Some(n) => n,
            None => panic!(
                "delivery ack underflow: {} subscribers recorded, all already acknowledged",
                self.delivery.subscribers
            ),
        };
        if !ok {
            self.delivery.failed += 1;
        }
        if self.pending == 0 {
            self.finish();
        }
    }

    #[cfg(test)]
    pub(crate) fn pending(&self) -> usize {
        self.pending
    }

    fn finish(&mut self) {
        if let Some(tx) = self.tx.take() {
            // The publisher may have stopped waiting; nothing to report then.
            let _ = tx.send(self.delivery);
        }
    }
}

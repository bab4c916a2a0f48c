//! DTN time, time sources and the periodic clock component.
//!
//! - [`DtnTime`] / [`ClockQuality`]: seconds since 2000-01-01 and how far they can be trusted;
//! - [`TimeSource`]: where time comes from ([`SystemClock`], [`ManualClock`]);
//! - [`Clock`]: publishes `time-tick` events and lets callers `sync` with them.

mod source;
mod tick;
mod time;

pub use source::{ManualClock, SystemClock, TimeSource};
pub use tick::{Clock, TimeAction, TimeTick};
pub use time::{ClockQuality, DTN_EPOCH_UNIX_OFFSET, DtnTime};

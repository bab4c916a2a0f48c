//! # Time sources.
//!
//! The clock and every registry owner consume time through [`TimeSource`]:
//! - [`SystemClock`]: wall time from `chrono`, with a settable quality
//!   (updated by whatever synchronizes the node) and a fixed timezone offset;
//! - [`ManualClock`]: fully caller-controlled, for tests and simulations.

use std::sync::atomic::{AtomicU64, Ordering};

use super::time::{ClockQuality, DtnTime};

/// Source of DTN time and its trustworthiness.
pub trait TimeSource: Send + Sync + 'static {
    /// Current DTN time.
    fn now(&self) -> DtnTime;

    /// Current clock quality.
    fn quality(&self) -> ClockQuality;
}

/// Quality stored as `f64` bits so readers never lock.
#[derive(Debug)]
struct AtomicQuality(AtomicU64);

impl AtomicQuality {
    fn new(q: ClockQuality) -> Self {
        Self(AtomicU64::new(q.value().to_bits()))
    }

    fn load(&self) -> ClockQuality {
        ClockQuality::new(f64::from_bits(self.0.load(Ordering::Acquire)))
    }

    fn store(&self, q: ClockQuality) {
        self.0.store(q.value().to_bits(), Ordering::Release);
    }
}

/// Wall clock.
///
/// Starts trusted; a node without time synchronization should call
/// [`set_quality`](Self::set_quality) with something lower.
#[derive(Debug)]
pub struct SystemClock {
    quality: AtomicQuality,
    timezone_hours: i32,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            quality: AtomicQuality::new(ClockQuality::TRUSTED),
            timezone_hours: 0,
        }
    }

    /// Shifts reported time by whole hours (local clocks not kept in UTC).
    #[inline]
    pub fn with_timezone_hours(mut self, hours: i32) -> Self {
        self.timezone_hours = hours;
        self
    }

    #[inline]
    pub fn with_quality(self, quality: ClockQuality) -> Self {
        self.quality.store(quality);
        self
    }

    pub fn set_quality(&self, quality: ClockQuality) {
        self.quality.store(quality);
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for SystemClock {
    fn now(&self) -> DtnTime {
        let unix = chrono::Utc::now().timestamp();
        DtnTime::from_unix(unix.saturating_add(i64::from(self.timezone_hours) * 3600))
    }

    fn quality(&self) -> ClockQuality {
        self.quality.load()
    }
}

/// Caller-controlled clock.
///
/// # Example
/// ```
/// use dtn_core::{DtnTime, ManualClock, TimeSource};
///
/// let clock = ManualClock::new(DtnTime::from_secs(100));
/// clock.advance(5);
/// assert_eq!(clock.now().as_secs(), 105);
/// ```
#[derive(Debug)]
pub struct ManualClock {
    now: AtomicU64,
    quality: AtomicQuality,
}

impl ManualClock {
    /// A trusted clock standing at `now`.
    pub fn new(now: DtnTime) -> Self {
        Self {
            now: AtomicU64::new(now.as_secs()),
            quality: AtomicQuality::new(ClockQuality::TRUSTED),
        }
    }

    pub fn set(&self, now: DtnTime) {
        self.now.store(now.as_secs(), Ordering::Release);
    }

    pub fn advance(&self, secs: u64) {
        let _ = self
            .now
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |t| Some(t.saturating_add(secs)));
    }

    pub fn set_quality(&self, quality: ClockQuality) {
        self.quality.store(quality);
    }
}

impl TimeSource for ManualClock {
    fn now(&self) -> DtnTime {
        DtnTime::from_secs(self.now.load(Ordering::Acquire))
    }

    fn quality(&self) -> ClockQuality {
        self.quality.load()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_clock_is_after_2000() {
        let clock = SystemClock::new();
        // 2020-01-01 in DTN seconds.
        assert!(clock.now().as_secs() > 631_152_000);
        assert_eq!(clock.quality(), ClockQuality::TRUSTED);
    }

    #[test]
    fn timezone_offset_shifts_whole_hours() {
        let utc = SystemClock::new();
        let plus_two = SystemClock::new().with_timezone_hours(2);
        let diff = plus_two.now().saturating_since(utc.now());
        // Allow the second to roll over between the two reads.
        assert!((7199..=7201).contains(&diff), "diff = {diff}");
    }

    #[test]
    fn quality_is_settable() {
        let clock = SystemClock::new().with_quality(ClockQuality::new(0.25));
        assert_eq!(clock.quality().value(), 0.25);
        clock.set_quality(ClockQuality::UNTRUSTED);
        assert_eq!(clock.quality(), ClockQuality::UNTRUSTED);
    }

    #[test]
    fn manual_clock_moves_both_ways() {
        let clock = ManualClock::new(DtnTime::from_secs(10));
        clock.advance(5);
        assert_eq!(clock.now().as_secs(), 15);
        clock.set(DtnTime::from_secs(3));
        assert_eq!(clock.now().as_secs(), 3);
    }
}

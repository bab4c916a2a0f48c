//! DTN time and clock quality.

use std::fmt;

/// Seconds between the Unix epoch and the DTN epoch (2000-01-01T00:00:00Z).
pub const DTN_EPOCH_UNIX_OFFSET: u64 = 946_684_800;

/// Seconds since the DTN epoch.
///
/// Unix times before 2000 clamp to zero.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DtnTime(u64);

impl DtnTime {
    /// The DTN epoch itself.
    pub const ZERO: DtnTime = DtnTime(0);

    #[inline]
    pub const fn from_secs(secs: u64) -> Self {
        Self(secs)
    }

    #[inline]
    pub const fn as_secs(self) -> u64 {
        self.0
    }

    /// Converts Unix seconds, clamping anything before 2000 to [`DtnTime::ZERO`].
    pub fn from_unix(unix_secs: i64) -> Self {
        let secs = u64::try_from(unix_secs).unwrap_or(0);
        Self(secs.saturating_sub(DTN_EPOCH_UNIX_OFFSET))
    }

    /// Back to Unix seconds.
    pub fn to_unix(self) -> u64 {
        self.0.saturating_add(DTN_EPOCH_UNIX_OFFSET)
    }

    #[inline]
    pub fn saturating_add(self, secs: u64) -> Self {
        Self(self.0.saturating_add(secs))
    }

    /// Seconds from `earlier` to `self`, zero if `earlier` is later.
    #[inline]
    pub fn saturating_since(self, earlier: DtnTime) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

impl fmt::Display for DtnTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for DtnTime {
    fn from(secs: u64) -> Self {
        Self(secs)
    }
}

/// How far the local clock can be trusted, in `[0, 1]`.
///
/// `0` means the clock has never been synchronized: nothing may expire
/// based on it.
#[derive(Clone, Copy, Debug, Default, PartialEq, PartialOrd)]
pub struct ClockQuality(f64);

impl ClockQuality {
    /// Unsynchronized clock.
    pub const UNTRUSTED: ClockQuality = ClockQuality(0.0);
    /// Perfectly synchronized clock.
    pub const TRUSTED: ClockQuality = ClockQuality(1.0);

    /// Clamps `value` into `[0, 1]`; NaN becomes untrusted.
    pub fn new(value: f64) -> Self {
        if value.is_nan() {
            return Self::UNTRUSTED;
        }
        Self(value.clamp(0.0, 1.0))
    }

    #[inline]
    pub fn value(self) -> f64 {
        self.0
    }

    /// True if the quality is strictly above `threshold`.
    #[inline]
    pub fn exceeds(self, threshold: f64) -> bool {
        self.0 > threshold
    }

    /// Expiry instant for something created at `timestamp` living `lifetime` seconds.
    ///
    /// With a trusted clock this is `timestamp + lifetime`. As quality drops
    /// the lifetime is stretched by `lifetime * (1 - quality)` so that clock
    /// error cannot expire bundles early. An untrusted clock applies no
    /// stretch; `expire` refuses to run on it anyway.
    pub fn expire_time(self, timestamp: DtnTime, lifetime: u64) -> DtnTime {
        let base = timestamp.saturating_add(lifetime);
        if self.0 <= 0.0 {
            return base;
        }
        let sigma = (lifetime as f64 * (1.0 - self.0)).floor() as u64;
        base.saturating_add(sigma)
    }
}

//! Common time helpers for centerout_core.

use std::time::Duration;

/// Number of milliseconds in one second.
pub const MILLIS_PER_SEC: u64 = 1_000;

/// Convert a configured duration in seconds to a `Duration`.
/// - Negative, NaN and infinite inputs map to zero instead of panicking.
/// - Values beyond `Duration::MAX` saturate.
#[inline]
pub fn secs_to_duration(secs: f64) -> Duration {
    if !secs.is_finite() || secs <= 0.0 {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
}

/// Whole milliseconds in `d`, saturating at `u64::MAX`.
#[inline]
pub fn duration_ms(d: Duration) -> u64 {
    (d.as_millis().min(u128::from(u64::MAX))) as u64
}

use std::time::Duration;

/// Whole milliseconds in `d`, saturating at `u64::MAX` for log fields.
#[must_use]
pub fn saturating_millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

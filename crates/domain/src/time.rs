//! Time and timestamp helpers.

use chrono::{DateTime, Datelike, FixedOffset, TimeDelta, Timelike, Utc};

/// UTC timestamp used for `observed_at`, `fused_at`, `since`, etc.
pub type Timestamp = DateTime<Utc>;

/// Return the current UTC time.
#[must_use]
pub fn now() -> Timestamp {
    Utc::now()
}

/// Convert a whole number of seconds into a [`TimeDelta`], saturating at
/// the largest representable span.
#[must_use]
pub fn seconds(secs: u64) -> TimeDelta {
    i64::try_from(secs)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .unwrap_or(TimeDelta::MAX)
}

/// Hour of day (0–23) of `ts` seen from the given offset.
#[must_use]
pub fn local_hour(ts: Timestamp, offset: FixedOffset) -> u32 {
    ts.with_timezone(&offset).hour()
}

/// Month of year (1–12) of `ts` seen from the given offset.
#[must_use]
pub fn local_month(ts: Timestamp, offset: FixedOffset) -> u32 {
    ts.with_timezone(&offset).month()
}

use chrono::{DateTime, Utc};

/// 100ns intervals per millisecond.
const TICKS_PER_MILLI: i64 = 10_000;

/// Milliseconds between 1601-01-01 and 1970-01-01 (UTC).
const FILETIME_UNIX_OFFSET_MS: i64 = 11_644_473_600_000;

/// Converts a Windows FILETIME tick count (100ns intervals since 1601-01-01 UTC)
/// to a UTC instant. Resolution is truncated to milliseconds before the epoch
/// shift so the arithmetic cannot overflow.
pub fn filetime_to_utc(ticks: i64) -> DateTime<Utc> {
    let millis = ticks / TICKS_PER_MILLI - FILETIME_UNIX_OFFSET_MS;
    // i64::MAX / 10_000 ms is well inside chrono's representable range.
    DateTime::from_timestamp_millis(millis).unwrap_or(DateTime::<Utc>::MIN_UTC)
}

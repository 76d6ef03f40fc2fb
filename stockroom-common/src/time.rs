//! Timestamp utilities
//!
//! Cached rows store wall-clock time as unix milliseconds.

use chrono::{DateTime, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Current time truncated to the millisecond precision the cache stores
pub fn now_millis() -> DateTime<Utc> {
    from_millis(to_millis(&now()))
}

/// Convert a stored unix-millisecond value back to a timestamp
///
/// Out-of-range values clamp to the unix epoch.
pub fn from_millis(millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis).unwrap_or_default()
}

/// Convert a timestamp to unix milliseconds for storage
pub fn to_millis(timestamp: &DateTime<Utc>) -> i64 {
    timestamp.timestamp_millis()
}

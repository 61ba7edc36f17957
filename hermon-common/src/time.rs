//! Timestamp utilities

use chrono::{DateTime, SecondsFormat, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Current time as an RFC 3339 string with millisecond precision
///
/// Stored timestamps use this format so that lexicographic order matches
/// chronological order.
pub fn now_rfc3339() -> String {
    to_rfc3339(now())
}

/// Format a timestamp the way it is persisted
pub fn to_rfc3339(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_returns_recent_timestamp() {
        let timestamp = now();
        assert!(timestamp.timestamp() > 946_684_800); // 2000-01-01
        assert!(timestamp.timestamp() < 4_102_444_800); // 2100-01-01
    }

    #[test]
    fn test_rfc3339_sorts_chronologically() {
        let earlier = to_rfc3339(DateTime::from_timestamp(1_700_000_000, 0).unwrap());
        let later = to_rfc3339(DateTime::from_timestamp(1_700_000_001, 5_000_000).unwrap());
        assert!(earlier < later);
        assert!(earlier.ends_with('Z'));
    }
}

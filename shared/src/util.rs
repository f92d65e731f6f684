/// Current UTC timestamp in milliseconds
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Convert provider timestamps (Unix seconds) to stored milliseconds
pub fn secs_to_millis(secs: i64) -> i64 {
    secs.saturating_mul(1000)
}

/// Render a millisecond timestamp as RFC 3339 (UTC)
pub fn millis_to_rfc3339(millis: i64) -> Option<String> {
    chrono::DateTime::<chrono::Utc>::from_timestamp_millis(millis)
        .map(|dt| dt.to_rfc3339_opts(chrono::SecondsFormat::Secs, true))
}

use std::time::{SystemTime, UNIX_EPOCH};

/// Wall clock in unix milliseconds. Samples and job timestamps share this unit.
pub fn current_time_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// RFC 3339 rendering for the dashboard; falls back to the epoch on overflow.
pub fn format_timestamp_ms(ts: u64) -> String {
    chrono::DateTime::from_timestamp_millis(ts as i64)
        .unwrap_or_default()
        .to_rfc3339()
}

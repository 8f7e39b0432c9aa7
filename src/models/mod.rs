//! Data model shared by the sink, the primary backend and the HTTP layer.

pub mod entry;
pub mod stats;

pub use entry::{ClientInfo, LogEntry, LogPage, LogType, Partition, PartitionSelector};
pub use stats::{SizeInfo, Stats};

use chrono::{SecondsFormat, Utc};

/// Current server time as an ISO-8601 string with millisecond precision.
pub fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_iso_format() {
        let ts = now_iso();
        assert!(ts.ends_with('Z'));
        // 2024-01-20T10:11:12.345Z
        assert_eq!(ts.len(), 24);
        assert!(chrono::DateTime::parse_from_rfc3339(&ts).is_ok());
    }
}

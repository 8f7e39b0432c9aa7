use serde::{Deserialize, Serialize};

use super::{now_iso, LogEntry, LogType};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Running counters of ingested records by type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total_requests: u64,
    pub total_responses: u64,
    pub total_errors: u64,
    pub last_updated: String,
}

impl Stats {
    pub fn zeroed() -> Self {
        Self {
            total_requests: 0,
            total_responses: 0,
            total_errors: 0,
            last_updated: now_iso(),
        }
    }

    pub fn record(&mut self, log_type: LogType) {
        match log_type {
            LogType::Request => self.total_requests += 1,
            LogType::Response => self.total_responses += 1,
            LogType::Error => self.total_errors += 1,
        }
        self.last_updated = now_iso();
    }

    /// Count a batch of entries by type
    pub fn tally(entries: &[LogEntry]) -> Self {
        let mut stats = Self::zeroed();
        for entry in entries {
            stats.record(entry.log_type);
        }
        stats.last_updated = now_iso();
        stats
    }
}

/// On-disk size of the local streams
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SizeInfo {
    pub request_log_size: u64,
    pub error_log_size: u64,
    #[serde(rename = "requestLogSizeMB")]
    pub request_log_size_mb: String,
    #[serde(rename = "errorLogSizeMB")]
    pub error_log_size_mb: String,
}

impl SizeInfo {
    pub fn from_bytes(request_log_size: u64, error_log_size: u64) -> Self {
        Self {
            request_log_size,
            error_log_size,
            request_log_size_mb: format!("{:.2}", request_log_size as f64 / BYTES_PER_MB),
            error_log_size_mb: format!("{:.2}", error_log_size as f64 / BYTES_PER_MB),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ClientInfo;
    use serde_json::json;

    #[test]
    fn test_record_increments_matching_counter() {
        let mut stats = Stats::zeroed();
        stats.record(LogType::Request);
        stats.record(LogType::Request);
        stats.record(LogType::Error);

        assert_eq!(stats.total_requests, 2);
        assert_eq!(stats.total_responses, 0);
        assert_eq!(stats.total_errors, 1);
    }

    #[test]
    fn test_tally() {
        let entries: Vec<_> = [LogType::Request, LogType::Response, LogType::Response]
            .into_iter()
            .map(|t| LogEntry::new(t, json!({}), None, ClientInfo::default()))
            .collect();

        let stats = Stats::tally(&entries);
        assert_eq!(stats.total_requests, 1);
        assert_eq!(stats.total_responses, 2);
        assert_eq!(stats.total_errors, 0);
    }

    #[test]
    fn test_stats_wire_format() {
        let value = serde_json::to_value(Stats::zeroed()).unwrap();
        assert_eq!(value["totalRequests"], 0);
        assert!(value["lastUpdated"].is_string());
    }

    #[test]
    fn test_size_info_megabytes() {
        let info = SizeInfo::from_bytes(3 * 1024 * 1024 / 2, 0);
        assert_eq!(info.request_log_size_mb, "1.50");
        assert_eq!(info.error_log_size_mb, "0.00");

        let value = serde_json::to_value(&info).unwrap();
        assert_eq!(value["requestLogSizeMB"], "1.50");
        assert_eq!(value["errorLogSize"], 0);
    }
}

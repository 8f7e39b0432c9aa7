//! Primary-then-fallback routing
//!
//! Every call is tried against the primary backend first. The outcome goes
//! through [`select`], which decides which backend serves the call; a
//! primary failure is logged and the local sink answers instead. The only
//! failure that reaches the caller is a failure of the sink itself.

use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::models::{ClientInfo, LogEntry, LogPage, LogType, Partition, SizeInfo, Stats};
use crate::primary::{PrimaryBackend, PrimaryError};
use crate::sink::{LogSink, SinkError};

/// How many recent primary entries are scanned to build primary stats
pub const STATS_SCAN_LIMIT: usize = 1000;

/// Backend that served a call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Primary,
    Fallback,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primary => f.write_str("primary"),
            Self::Fallback => f.write_str("fallback"),
        }
    }
}

/// Pick the serving backend from the primary attempt's outcome.
pub fn select<T, E>(primary_result: &Result<T, E>) -> Backend {
    match primary_result {
        Ok(_) => Backend::Primary,
        Err(_) => Backend::Fallback,
    }
}

/// Source requested by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Source {
    #[default]
    Primary,
    Local,
}

impl Source {
    /// Lenient parse of the `source` parameter; unknown values mean primary.
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("local") | Some("file") | Some("fallback") => Self::Local,
            _ => Self::Primary,
        }
    }
}

#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub saved_to: Backend,
    pub entry: LogEntry,
}

#[derive(Debug, Clone)]
pub struct QueryOutcome {
    pub page: LogPage,
    pub source: Backend,
}

#[derive(Debug, Clone)]
pub struct StatsOutcome {
    pub stats: Stats,
    /// Only present when the local sink served the call
    pub size_info: Option<SizeInfo>,
    pub source: Backend,
}

#[derive(Clone)]
pub struct LoggingAdapter {
    sink: Arc<LogSink>,
    primary: Option<Arc<dyn PrimaryBackend>>,
}

impl LoggingAdapter {
    pub fn new(sink: Arc<LogSink>, primary: Option<Arc<dyn PrimaryBackend>>) -> Self {
        Self { sink, primary }
    }

    pub fn sink(&self) -> &Arc<LogSink> {
        &self.sink
    }

    pub fn primary_name(&self) -> Option<&str> {
        self.primary.as_deref().map(|p| p.name())
    }

    fn primary(&self) -> Result<&dyn PrimaryBackend, PrimaryError> {
        self.primary.as_deref().ok_or(PrimaryError::Disabled)
    }

    /// Stamp a new entry and store it, primary first.
    pub async fn ingest(
        &self,
        log_type: LogType,
        data: Value,
        username: Option<String>,
        client: ClientInfo,
    ) -> Result<IngestOutcome, SinkError> {
        let entry = LogEntry::new(log_type, data, username, client);

        let result = match self.primary() {
            Ok(primary) => primary.write(&entry).await,
            Err(e) => Err(e),
        };

        let saved_to = select(&result);
        if let Err(e) = &result {
            note_fallback("ingest", e);
            self.sink.append_and_count(&entry).await.map_err(|e| {
                tracing::error!(
                    request_id = %entry.request_id,
                    error = %e,
                    "Fallback write failed, log entry lost"
                );
                e
            })?;
        }

        served_by("ingest", saved_to);
        tracing::debug!(
            request_id = %entry.request_id,
            log_type = %log_type,
            username = %entry.username,
            "Log entry ingested"
        );

        Ok(IngestOutcome { saved_to, entry })
    }

    pub async fn query(
        &self,
        partition: Partition,
        limit: usize,
        offset: usize,
        source: Source,
    ) -> Result<QueryOutcome, SinkError> {
        if source == Source::Primary {
            let result = match self.primary() {
                Ok(primary) => primary.list(partition, limit, offset).await,
                Err(e) => Err(e),
            };

            match result {
                Ok(page) => {
                    served_by("query", Backend::Primary);
                    return Ok(QueryOutcome {
                        page,
                        source: Backend::Primary,
                    });
                }
                Err(e) => note_fallback("query", &e),
            }
        }

        let page = self.sink.read(partition, limit, offset).await?;
        served_by("query", Backend::Fallback);
        Ok(QueryOutcome {
            page,
            source: Backend::Fallback,
        })
    }

    pub async fn stats(&self, source: Source) -> StatsOutcome {
        if source == Source::Primary {
            let result = match self.primary() {
                Ok(primary) => primary.recent(STATS_SCAN_LIMIT).await,
                Err(e) => Err(e),
            };

            match result {
                Ok(entries) => {
                    served_by("stats", Backend::Primary);
                    return StatsOutcome {
                        stats: Stats::tally(&entries),
                        size_info: None,
                        source: Backend::Primary,
                    };
                }
                Err(e) => note_fallback("stats", &e),
            }
        }

        served_by("stats", Backend::Fallback);
        StatsOutcome {
            stats: self.sink.stats().await,
            size_info: Some(self.sink.size_info().await),
            source: Backend::Fallback,
        }
    }
}

fn note_fallback(operation: &'static str, error: &PrimaryError) {
    match error {
        PrimaryError::Disabled => {
            tracing::debug!(operation, "Primary backend not configured, using local storage")
        }
        other => tracing::warn!(
            operation,
            error = %other,
            "Primary backend failed, falling back to local storage"
        ),
    }
}

fn served_by(operation: &'static str, backend: Backend) {
    tracing::debug!(operation, backend = %backend, "Logging call served");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PartitionSelector;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Primary that always fails like an unreachable service
    struct FailingBackend;

    #[async_trait]
    impl PrimaryBackend for FailingBackend {
        fn name(&self) -> &str {
            "failing"
        }

        async fn write(&self, _entry: &LogEntry) -> Result<(), PrimaryError> {
            Err(PrimaryError::Upstream {
                status: 503,
                message: "unavailable".to_string(),
            })
        }

        async fn list(&self, _: Partition, _: usize, _: usize) -> Result<LogPage, PrimaryError> {
            Err(PrimaryError::Upstream {
                status: 503,
                message: "unavailable".to_string(),
            })
        }

        async fn recent(&self, _: usize) -> Result<Vec<LogEntry>, PrimaryError> {
            Err(PrimaryError::Upstream {
                status: 401,
                message: "expired token".to_string(),
            })
        }
    }

    /// In-memory primary that records writes
    #[derive(Default)]
    struct MemoryBackend {
        entries: Mutex<Vec<LogEntry>>,
    }

    #[async_trait]
    impl PrimaryBackend for MemoryBackend {
        fn name(&self) -> &str {
            "memory"
        }

        async fn write(&self, entry: &LogEntry) -> Result<(), PrimaryError> {
            self.entries.lock().unwrap().push(entry.clone());
            Ok(())
        }

        async fn list(
            &self,
            partition: Partition,
            limit: usize,
            offset: usize,
        ) -> Result<LogPage, PrimaryError> {
            let entries: Vec<_> = self
                .entries
                .lock()
                .unwrap()
                .iter()
                .rev()
                .filter(|e| e.log_type.partition() == partition)
                .cloned()
                .collect();
            Ok(LogPage::paginate(entries, limit, offset))
        }

        async fn recent(&self, max_entries: usize) -> Result<Vec<LogEntry>, PrimaryError> {
            Ok(self.entries.lock().unwrap().iter().rev().take(max_entries).cloned().collect())
        }
    }

    async fn create_test_adapter(
        primary: Option<Arc<dyn PrimaryBackend>>,
    ) -> (LoggingAdapter, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let sink = Arc::new(LogSink::open(temp_dir.path()).await.unwrap());
        (LoggingAdapter::new(sink, primary), temp_dir)
    }

    #[test]
    fn test_select() {
        assert_eq!(select::<(), ()>(&Ok(())), Backend::Primary);
        assert_eq!(select::<(), ()>(&Err(())), Backend::Fallback);
    }

    #[test]
    fn test_source_parse() {
        assert_eq!(Source::parse(None), Source::Primary);
        assert_eq!(Source::parse(Some("cloud")), Source::Primary);
        assert_eq!(Source::parse(Some("LOCAL")), Source::Local);
        assert_eq!(Source::parse(Some("file")), Source::Local);
        assert_eq!(Source::parse(Some("whatever")), Source::Primary);
    }

    #[test]
    fn test_backend_serializes_lowercase() {
        assert_eq!(serde_json::to_value(Backend::Fallback).unwrap(), "fallback");
        assert_eq!(Backend::Primary.to_string(), "primary");
    }

    #[tokio::test]
    async fn test_ingest_falls_back_when_primary_fails() {
        let (adapter, _temp_dir) = create_test_adapter(Some(Arc::new(FailingBackend))).await;

        let outcome = adapter
            .ingest(LogType::Request, json!({ "passport": "US" }), None, ClientInfo::default())
            .await
            .unwrap();

        assert_eq!(outcome.saved_to, Backend::Fallback);
        let page = adapter.sink().read(Partition::Requests, 10, 0).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.logs[0].request_id, outcome.entry.request_id);
        assert_eq!(adapter.sink().stats().await.total_requests, 1);
    }

    #[tokio::test]
    async fn test_ingest_without_primary_uses_fallback() {
        let (adapter, _temp_dir) = create_test_adapter(None).await;

        let outcome = adapter
            .ingest(LogType::Error, json!("boom"), None, ClientInfo::default())
            .await
            .unwrap();

        assert_eq!(outcome.saved_to, Backend::Fallback);
        assert_eq!(adapter.sink().stats().await.total_errors, 1);
    }

    #[tokio::test]
    async fn test_ingest_primary_success_skips_sink() {
        let primary = Arc::new(MemoryBackend::default());
        let (adapter, _temp_dir) = create_test_adapter(Some(primary.clone())).await;

        let outcome = adapter
            .ingest(LogType::Response, json!({ "ok": true }), Some("bob".into()), ClientInfo::default())
            .await
            .unwrap();

        assert_eq!(outcome.saved_to, Backend::Primary);
        assert_eq!(primary.entries.lock().unwrap().len(), 1);
        assert_eq!(adapter.sink().read(Partition::Requests, 10, 0).await.unwrap().total, 0);
        assert_eq!(adapter.sink().stats().await.total_responses, 0);
    }

    #[tokio::test]
    async fn test_query_falls_back_to_sink() {
        let (adapter, _temp_dir) = create_test_adapter(Some(Arc::new(FailingBackend))).await;
        adapter
            .ingest(LogType::Request, json!({ "n": 1 }), None, ClientInfo::default())
            .await
            .unwrap();

        let outcome = adapter.query(Partition::Requests, 10, 0, Source::Primary).await.unwrap();
        assert_eq!(outcome.source, Backend::Fallback);
        assert_eq!(outcome.page.total, 1);
    }

    #[tokio::test]
    async fn test_query_local_source_bypasses_primary() {
        let primary = Arc::new(MemoryBackend::default());
        let (adapter, _temp_dir) = create_test_adapter(Some(primary)).await;
        adapter
            .ingest(LogType::Request, json!({ "n": 1 }), None, ClientInfo::default())
            .await
            .unwrap();

        let primary_page = adapter.query(Partition::Requests, 10, 0, Source::Primary).await.unwrap();
        assert_eq!(primary_page.source, Backend::Primary);
        assert_eq!(primary_page.page.total, 1);

        let local_page = adapter.query(Partition::Requests, 10, 0, Source::Local).await.unwrap();
        assert_eq!(local_page.source, Backend::Fallback);
        assert_eq!(local_page.page.total, 0);
    }

    #[tokio::test]
    async fn test_stats_from_primary_tally() {
        let primary = Arc::new(MemoryBackend::default());
        let (adapter, _temp_dir) = create_test_adapter(Some(primary)).await;
        for log_type in [LogType::Request, LogType::Request, LogType::Error] {
            adapter
                .ingest(log_type, json!({}), None, ClientInfo::default())
                .await
                .unwrap();
        }

        let outcome = adapter.stats(Source::Primary).await;
        assert_eq!(outcome.source, Backend::Primary);
        assert_eq!(outcome.stats.total_requests, 2);
        assert_eq!(outcome.stats.total_errors, 1);
        assert!(outcome.size_info.is_none());
    }

    #[tokio::test]
    async fn test_stats_fall_back_with_size_info() {
        let (adapter, _temp_dir) = create_test_adapter(Some(Arc::new(FailingBackend))).await;
        adapter
            .ingest(LogType::Error, json!({ "msg": "x" }), None, ClientInfo::default())
            .await
            .unwrap();

        let outcome = adapter.stats(Source::Primary).await;
        assert_eq!(outcome.source, Backend::Fallback);
        assert_eq!(outcome.stats.total_errors, 1);
        assert!(outcome.size_info.unwrap().error_log_size > 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_ingest_racing_clear_keeps_stats_consistent() {
        let (adapter, _temp_dir) = create_test_adapter(None).await;

        let mut handles = Vec::new();
        for n in 0..30 {
            let task_adapter = adapter.clone();
            handles.push(tokio::spawn(async move {
                task_adapter
                    .ingest(LogType::Error, json!({ "n": n }), None, ClientInfo::default())
                    .await
                    .unwrap();
            }));
            if n % 10 == 5 {
                let adapter = adapter.clone();
                handles.push(tokio::spawn(async move {
                    adapter.sink().clear(PartitionSelector::All).await.unwrap();
                }));
            }
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let stored = adapter.sink().read(Partition::Errors, usize::MAX, 0).await.unwrap().total;
        assert_eq!(adapter.sink().stats().await.total_errors, stored as u64);
    }
}

//! Primary (managed) logging backend
//!
//! The primary backend is attempted first for every ingestion, query and
//! stats call. Any error it returns is routine: the adapter falls back to
//! the local sink.

pub mod cloud_logging;

pub use cloud_logging::CloudLoggingBackend;

use async_trait::async_trait;

use crate::models::{LogEntry, LogPage, Partition};

#[derive(Debug, thiserror::Error)]
pub enum PrimaryError {
    #[error("primary backend is not configured")]
    Disabled,

    #[error("request to primary backend failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("primary backend returned {status}: {message}")]
    Upstream { status: u16, message: String },
}

/// Unified interface for managed logging services.
#[async_trait]
pub trait PrimaryBackend: Send + Sync + 'static {
    /// Backend name used in logs and the health endpoint
    fn name(&self) -> &str;

    async fn write(&self, entry: &LogEntry) -> Result<(), PrimaryError>;

    /// Newest-first page of one partition
    async fn list(
        &self,
        partition: Partition,
        limit: usize,
        offset: usize,
    ) -> Result<LogPage, PrimaryError>;

    /// Up to `max_entries` of the most recent entries across all partitions
    async fn recent(&self, max_entries: usize) -> Result<Vec<LogEntry>, PrimaryError>;
}

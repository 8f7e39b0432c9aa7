//! Local JSON-lines log store
//!
//! Owns the on-disk layout under the configured log directory:
//!
//! ```text
//! logs/
//! ├── visa_requests.jsonl   REQUEST + RESPONSE entries
//! ├── visa_errors.jsonl     ERROR entries
//! └── stats.json            running counters
//! ```
//!
//! Each entry is written as one newline-terminated JSON object in a single
//! append. Stats updates are serialized through a mutex so concurrent
//! ingestions cannot lose increments. Lock order is `files` then `stats`.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncRead, AsyncWriteExt, ReadBuf};
use tokio::sync::{Mutex, OwnedRwLockReadGuard, RwLock};

use crate::models::{LogEntry, LogPage, LogType, Partition, PartitionSelector, SizeInfo, Stats};

pub const REQUEST_LOG_FILE: &str = "visa_requests.jsonl";
pub const ERROR_LOG_FILE: &str = "visa_errors.jsonl";
pub const STATS_FILE: &str = "stats.json";

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode record: {0}")]
    Encode(#[from] serde_json::Error),
}

pub struct LogSink {
    dir: PathBuf,
    /// Appends, reads and exports hold this shared; clear holds it exclusively.
    files: Arc<RwLock<()>>,
    stats: Mutex<Stats>,
}

impl LogSink {
    /// Open (or create) a sink rooted at `dir`.
    ///
    /// A missing or unreadable stats file is replaced with zeroed counters.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, SinkError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).await.map_err(|source| SinkError::Write {
            path: dir.clone(),
            source,
        })?;

        let stats_path = dir.join(STATS_FILE);
        let (stats, needs_init) = match fs::read_to_string(&stats_path).await {
            Ok(content) => match serde_json::from_str::<Stats>(&content) {
                Ok(stats) => (stats, false),
                Err(e) => {
                    tracing::warn!(
                        file = ?stats_path,
                        error = %e,
                        "Stats file is corrupt, resetting counters"
                    );
                    (Stats::zeroed(), true)
                }
            },
            Err(e) if e.kind() == ErrorKind::NotFound => (Stats::zeroed(), true),
            Err(source) => {
                return Err(SinkError::Read {
                    path: stats_path,
                    source,
                })
            }
        };

        let sink = Self {
            dir,
            files: Arc::new(RwLock::new(())),
            stats: Mutex::new(stats.clone()),
        };

        if needs_init {
            sink.persist_stats(&stats).await?;
        }

        tracing::info!(
            dir = ?sink.dir,
            total_requests = stats.total_requests,
            total_responses = stats.total_responses,
            total_errors = stats.total_errors,
            "Local log sink ready"
        );

        Ok(sink)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn stream_path(&self, partition: Partition) -> PathBuf {
        match partition {
            Partition::Requests => self.dir.join(REQUEST_LOG_FILE),
            Partition::Errors => self.dir.join(ERROR_LOG_FILE),
        }
    }

    fn stats_path(&self) -> PathBuf {
        self.dir.join(STATS_FILE)
    }

    /// Append one entry to the stream selected by its type.
    pub async fn append(&self, entry: &LogEntry) -> Result<(), SinkError> {
        let _guard = self.files.read().await;
        self.write_line(entry).await
    }

    /// Append `entry` and count it as one unit, so a concurrent clear sees
    /// either both effects or neither.
    ///
    /// Only the append can fail the call. A stats update that fails after
    /// the line is on disk is logged and the entry still counts as stored.
    pub async fn append_and_count(&self, entry: &LogEntry) -> Result<(), SinkError> {
        let _guard = self.files.read().await;
        self.write_line(entry).await?;

        if let Err(e) = self.increment_stats(entry.log_type).await {
            tracing::warn!(
                request_id = %entry.request_id,
                error = %e,
                "Entry stored but stats update failed"
            );
        }
        Ok(())
    }

    async fn write_line(&self, entry: &LogEntry) -> Result<(), SinkError> {
        let mut line = serde_json::to_vec(entry)?;
        line.push(b'\n');

        let path = self.stream_path(entry.log_type.partition());
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|source| SinkError::Write {
                path: path.clone(),
                source,
            })?;

        file.write_all(&line)
            .await
            .map_err(|source| SinkError::Write {
                path: path.clone(),
                source,
            })?;
        file.flush()
            .await
            .map_err(|source| SinkError::Write { path, source })?;

        Ok(())
    }

    /// Newest-first page of a stream. A stream that was never written reads
    /// as empty; lines that fail to parse are skipped.
    pub async fn read(
        &self,
        partition: Partition,
        limit: usize,
        offset: usize,
    ) -> Result<LogPage, SinkError> {
        let path = self.stream_path(partition);
        let _guard = self.files.read().await;

        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(LogPage::empty()),
            Err(source) => return Err(SinkError::Read { path, source }),
        };

        Ok(LogPage::paginate(parse_lines(&content), limit, offset))
    }

    /// Truncate the selected stream(s) and reset the counters.
    pub async fn clear(&self, selector: PartitionSelector) -> Result<Stats, SinkError> {
        let _guard = self.files.write().await;

        for partition in selector.partitions() {
            let path = self.stream_path(partition);
            if fs::try_exists(&path).await.unwrap_or(false) {
                fs::write(&path, b"")
                    .await
                    .map_err(|source| SinkError::Write {
                        path: path.clone(),
                        source,
                    })?;
            }
        }

        let mut stats = self.stats.lock().await;
        let reset = Stats::zeroed();
        self.persist_stats(&reset).await?;
        *stats = reset.clone();

        tracing::info!(selector = ?selector, "Local log streams cleared");
        Ok(reset)
    }

    /// Count one durable write of `log_type`. The in-memory counters only
    /// change once the stats file has been rewritten.
    pub async fn increment_stats(&self, log_type: LogType) -> Result<Stats, SinkError> {
        let mut stats = self.stats.lock().await;
        let mut next = stats.clone();
        next.record(log_type);

        self.persist_stats(&next).await?;
        *stats = next.clone();
        Ok(next)
    }

    pub async fn stats(&self) -> Stats {
        self.stats.lock().await.clone()
    }

    pub async fn size_info(&self) -> SizeInfo {
        let request_size = file_size(&self.stream_path(Partition::Requests)).await;
        let error_size = file_size(&self.stream_path(Partition::Errors)).await;
        SizeInfo::from_bytes(request_size, error_size)
    }

    /// Open the raw persisted stream for export, `None` if it does not exist.
    ///
    /// The returned reader holds the shared file lock until dropped, so a
    /// clear waits for in-flight downloads to finish.
    pub async fn open_export(&self, partition: Partition) -> Result<Option<ExportReader>, SinkError> {
        let guard = self.files.clone().read_owned().await;
        let path = self.stream_path(partition);
        match File::open(&path).await {
            Ok(file) => Ok(Some(ExportReader {
                file,
                _guard: guard,
            })),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(SinkError::Read { path, source }),
        }
    }

    /// Write-then-rename so a crash never leaves a half-written stats file.
    async fn persist_stats(&self, stats: &Stats) -> Result<(), SinkError> {
        let path = self.stats_path();
        let tmp = path.with_extension("json.tmp");
        let body = serde_json::to_vec_pretty(stats)?;

        fs::write(&tmp, body)
            .await
            .map_err(|source| SinkError::Write {
                path: tmp.clone(),
                source,
            })?;
        fs::rename(&tmp, &path)
            .await
            .map_err(|source| SinkError::Write { path, source })?;

        Ok(())
    }
}

/// A persisted stream opened for export
pub struct ExportReader {
    file: File,
    _guard: OwnedRwLockReadGuard<()>,
}

impl AsyncRead for ExportReader {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.get_mut().file).poll_read(cx, buf)
    }
}

/// Parse JSON lines, dropping blank and malformed ones, newest first.
fn parse_lines(content: &str) -> Vec<LogEntry> {
    let mut entries: Vec<LogEntry> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| match serde_json::from_str(line) {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::debug!(error = %e, "Skipping malformed log line");
                None
            }
        })
        .collect();
    entries.reverse();
    entries
}

async fn file_size(path: &Path) -> u64 {
    fs::metadata(path).await.map(|m| m.len()).unwrap_or(0)
}

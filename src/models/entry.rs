use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use super::now_iso;

const REQUEST_ID_LEN: usize = 8;
const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Kind of event reported by the browser client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogType {
    Request,
    Response,
    Error,
}

impl LogType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Request => "REQUEST",
            Self::Response => "RESPONSE",
            Self::Error => "ERROR",
        }
    }

    /// Stream this type is persisted to. REQUEST and RESPONSE share one.
    pub fn partition(&self) -> Partition {
        match self {
            Self::Error => Partition::Errors,
            Self::Request | Self::Response => Partition::Requests,
        }
    }

    /// Label value used when shipping entries to the primary backend
    pub fn label(&self) -> &'static str {
        match self {
            Self::Request => "visa_request",
            Self::Response => "visa_response",
            Self::Error => "visa_error",
        }
    }
}

impl fmt::Display for LogType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "REQUEST" => Ok(Self::Request),
            "RESPONSE" => Ok(Self::Response),
            "ERROR" => Ok(Self::Error),
            other => Err(format!(
                "Invalid log type '{}': expected REQUEST, RESPONSE or ERROR",
                other
            )),
        }
    }
}

/// One of the two durable streams a record belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Partition {
    Requests,
    Errors,
}

impl Partition {
    /// Resolve the `type` query parameter. Only `ERROR` selects the error
    /// stream; anything else (including nothing) reads requests/responses.
    pub fn from_type_param(value: Option<&str>) -> Self {
        match value {
            Some("ERROR") => Self::Errors,
            _ => Self::Requests,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Requests => "request",
            Self::Errors => "error",
        }
    }

    pub fn log_types(&self) -> &'static [LogType] {
        match self {
            Self::Requests => &[LogType::Request, LogType::Response],
            Self::Errors => &[LogType::Error],
        }
    }
}

/// Target of a clear operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionSelector {
    One(Partition),
    All,
}

impl PartitionSelector {
    pub fn from_type_param(value: Option<&str>) -> Self {
        match value {
            Some("ERROR") => Self::One(Partition::Errors),
            Some("REQUEST") | Some("RESPONSE") => Self::One(Partition::Requests),
            _ => Self::All,
        }
    }

    pub fn partitions(&self) -> Vec<Partition> {
        match self {
            Self::One(partition) => vec![*partition],
            Self::All => vec![Partition::Requests, Partition::Errors],
        }
    }
}

/// Request-derived fields captured from the inbound call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientInfo {
    pub user_agent: Option<String>,
    pub ip: Option<String>,
}

/// Persisted unit. `data` is stored as-is; the sink never inspects it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub timestamp: String,
    #[serde(rename = "type")]
    pub log_type: LogType,
    pub data: Value,
    #[serde(default = "default_username")]
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(default)]
    pub request_id: String,
}

fn default_username() -> String {
    "anonymous".to_string()
}

impl LogEntry {
    /// Build a new entry stamped with the server clock and a fresh request id.
    pub fn new(log_type: LogType, data: Value, username: Option<String>, client: ClientInfo) -> Self {
        let username = username
            .filter(|name| !name.is_empty())
            .unwrap_or_else(default_username);

        Self {
            timestamp: now_iso(),
            log_type,
            data,
            username,
            user_agent: client.user_agent,
            ip: client.ip,
            request_id: generate_request_id(),
        }
    }
}

/// 8 random base-36 characters. Collisions are possible and tolerated.
pub fn generate_request_id() -> String {
    let mut rng = rand::thread_rng();
    (0..REQUEST_ID_LEN)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect()
}

/// A newest-first page of entries
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogPage {
    pub logs: Vec<LogEntry>,
    pub total: usize,
    pub has_more: bool,
}

impl LogPage {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Slice `entries` (already newest-first) by `offset`/`limit`.
    pub fn paginate(entries: Vec<LogEntry>, limit: usize, offset: usize) -> Self {
        let total = entries.len();
        let logs = entries.into_iter().skip(offset).take(limit).collect();

        Self {
            logs,
            total,
            has_more: offset.saturating_add(limit) < total,
        }
    }
}

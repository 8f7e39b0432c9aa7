//! Google Cloud Logging (REST v2) backend

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

use super::{PrimaryBackend, PrimaryError};
use crate::config::PrimaryConfig;
use crate::models::{LogEntry, LogPage, LogType, Partition};

/// Largest page `entries:list` accepts
const MAX_PAGE_SIZE: usize = 1000;
const SERVICE_LABEL: &str = "visa-checker";

pub struct CloudLoggingBackend {
    client: Client,
    base_url: String,
    project_id: String,
    log_name: String,
    access_token: String,
    timeout: Duration,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WriteEntriesRequest<'a> {
    log_name: String,
    resource: MonitoredResource<'a>,
    entries: Vec<WriteLogEntry<'a>>,
}

#[derive(Debug, Serialize)]
struct MonitoredResource<'a> {
    #[serde(rename = "type")]
    resource_type: &'static str,
    labels: HashMap<&'static str, &'a str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WriteLogEntry<'a> {
    severity: &'static str,
    timestamp: &'a str,
    labels: HashMap<&'static str, &'static str>,
    json_payload: &'a LogEntry,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ListEntriesRequest {
    resource_names: Vec<String>,
    filter: String,
    order_by: &'static str,
    page_size: usize,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListEntriesResponse {
    #[serde(default)]
    entries: Vec<RemoteEntry>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemoteEntry {
    #[serde(default)]
    json_payload: Option<Value>,
}

impl CloudLoggingBackend {
    pub fn new(client: Client, config: &PrimaryConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            project_id: config.project_id.clone(),
            log_name: config.log_name.clone(),
            access_token: config.access_token.clone(),
            timeout: Duration::from_secs(config.timeout_seconds),
        }
    }

    /// Build the backend when the config enables it and carries credentials
    pub fn from_config(client: Client, config: &PrimaryConfig) -> Option<Self> {
        config.is_usable().then(|| Self::new(client, config))
    }

    fn log_path(&self) -> String {
        format!("projects/{}/logs/{}", self.project_id, self.log_name)
    }

    fn base_filter(&self) -> String {
        format!(
            r#"resource.type="global" AND logName="{}""#,
            self.log_path()
        )
    }

    fn partition_filter(&self, partition: Partition) -> String {
        let labels: Vec<String> = partition
            .log_types()
            .iter()
            .map(|t| format!(r#"labels.type="{}""#, t.label()))
            .collect();

        format!("{} AND ({})", self.base_filter(), labels.join(" OR "))
    }

    async fn post<T: Serialize + ?Sized>(
        &self,
        method: &str,
        body: &T,
    ) -> Result<reqwest::Response, PrimaryError> {
        let url = format!("{}/v2/{}", self.base_url, method);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.access_token)
            .timeout(self.timeout)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(PrimaryError::Upstream {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response)
    }

    async fn list_entries(
        &self,
        filter: String,
        page_size: usize,
    ) -> Result<ListEntriesResponse, PrimaryError> {
        let request = ListEntriesRequest {
            resource_names: vec![format!("projects/{}", self.project_id)],
            filter,
            order_by: "timestamp desc",
            page_size: page_size.clamp(1, MAX_PAGE_SIZE),
        };

        let response = self.post("entries:list", &request).await?;
        Ok(response.json::<ListEntriesResponse>().await?)
    }
}

/// Entries written by other producers in the same log may not carry our
/// payload shape; those are dropped.
fn decode_entries(remote: Vec<RemoteEntry>) -> Vec<LogEntry> {
    remote
        .into_iter()
        .filter_map(|entry| entry.json_payload)
        .filter_map(|payload| serde_json::from_value::<LogEntry>(payload).ok())
        .collect()
}

fn severity(log_type: LogType) -> &'static str {
    match log_type {
        LogType::Error => "ERROR",
        LogType::Request | LogType::Response => "INFO",
    }
}

#[async_trait]
impl PrimaryBackend for CloudLoggingBackend {
    fn name(&self) -> &str {
        "google-cloud-logging"
    }

    async fn write(&self, entry: &LogEntry) -> Result<(), PrimaryError> {
        let request = WriteEntriesRequest {
            log_name: self.log_path(),
            resource: MonitoredResource {
                resource_type: "global",
                labels: HashMap::from([("project_id", self.project_id.as_str())]),
            },
            entries: vec![WriteLogEntry {
                severity: severity(entry.log_type),
                timestamp: &entry.timestamp,
                labels: HashMap::from([
                    ("type", entry.log_type.label()),
                    ("service", SERVICE_LABEL),
                ]),
                json_payload: entry,
            }],
        };

        self.post("entries:write", &request).await?;
        Ok(())
    }

    async fn list(
        &self,
        partition: Partition,
        limit: usize,
        offset: usize,
    ) -> Result<LogPage, PrimaryError> {
        // entries:list has no offset, so fetch through the end of the page
        // and slice locally.
        let page_size = offset.saturating_add(limit).clamp(1, MAX_PAGE_SIZE);
        let response = self
            .list_entries(self.partition_filter(partition), page_size)
            .await?;

        let full_page = response.entries.len() >= page_size;
        let more_remote = response.next_page_token.is_some() || full_page;

        let mut page = LogPage::paginate(decode_entries(response.entries), limit, offset);
        page.has_more = page.has_more || (more_remote && limit > 0);
        Ok(page)
    }

    async fn recent(&self, max_entries: usize) -> Result<Vec<LogEntry>, PrimaryError> {
        let response = self.list_entries(self.base_filter(), max_entries).await?;
        Ok(decode_entries(response.entries))
    }
}

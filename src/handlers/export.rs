use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Json, Response};
use serde::Deserialize;
use serde_json::json;
use tokio_util::io::ReaderStream;

use super::AppState;
use crate::adapter::Source;
use crate::error::AppError;
use crate::models::{LogType, Partition};

#[derive(Debug, Default, Deserialize)]
pub struct ExportParams {
    #[serde(rename = "type")]
    pub log_type: Option<String>,
    pub source: Option<String>,
}

/// `visa_logs_{TYPE|all}_{YYYY-MM-DD}.jsonl`. Unknown types are named `all`
/// so caller input never reaches the header verbatim.
pub fn export_filename(log_type: Option<&str>, date: chrono::NaiveDate) -> String {
    let label = log_type
        .and_then(|t| t.parse::<LogType>().ok())
        .map(|t| t.as_str())
        .unwrap_or("all");
    format!("visa_logs_{}_{}.jsonl", label, date.format("%Y-%m-%d"))
}

/// GET /api/logs/export - Download a partition's raw JSON-lines stream
pub async fn export(
    State(state): State<AppState>,
    Query(params): Query<ExportParams>,
) -> Result<Response, AppError> {
    if Source::parse(params.source.as_deref()) == Source::Primary {
        if let Some(backend) = state.adapter.primary_name() {
            return Ok(Json(json!({
                "message": format!("Logs are stored in {}; export them with its native tooling.", backend),
                "instructions": [
                    "Open the Logs Explorer for the configured project and filter on the visa-checker log name",
                    "Or run: gcloud logging read 'logName:visa-checker-logs' --format=json",
                    "To download the local fallback stream instead, call this endpoint with source=local"
                ]
            }))
            .into_response());
        }
    }

    let partition = Partition::from_type_param(params.log_type.as_deref());
    let reader = state
        .adapter
        .sink()
        .open_export(partition)
        .await?
        .ok_or_else(|| AppError::NotFound("Log file not found".to_string()))?;

    let filename = export_filename(params.log_type.as_deref(), chrono::Utc::now().date_naive());
    tracing::info!(partition = partition.as_str(), filename = %filename, "Exporting local log stream");

    // The reader keeps the stream's shared lock, so a clear cannot truncate
    // the file mid-download.
    let body = Body::from_stream(ReaderStream::new(reader));
    Ok((
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        body,
    )
        .into_response())
}

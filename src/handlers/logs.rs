//! Ingestion, query and clear endpoints on `/api/logs`

use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::{Extensions, HeaderMap};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{client_info, parse_or, AppState};
use crate::adapter::{Backend, Source};
use crate::error::AppError;
use crate::models::{LogEntry, LogType, Partition, PartitionSelector};

pub const DEFAULT_LIMIT: usize = 100;

/// Body of `POST /api/logs`
#[derive(Debug, Deserialize)]
pub struct IngestRequest {
    #[serde(rename = "type")]
    pub log_type: Option<String>,
    pub data: Option<Value>,
    pub username: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestResponse {
    pub success: bool,
    pub message: String,
    pub saved_to: Backend,
}

/// Query string of `GET /api/logs`. Numbers arrive as strings and are
/// parsed leniently.
#[derive(Debug, Default, Deserialize)]
pub struct LogQueryParams {
    #[serde(rename = "type")]
    pub log_type: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
    pub source: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogsResponse {
    pub logs: Vec<LogEntry>,
    pub total: usize,
    pub has_more: bool,
    pub source: Backend,
}

/// Body of `DELETE /api/logs`
#[derive(Debug, Default, Deserialize)]
pub struct ClearRequest {
    #[serde(rename = "type")]
    pub log_type: Option<String>,
    pub source: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ClearResponse {
    pub success: bool,
    pub message: String,
}

/// Validate an ingestion body. Both `type` and `data` are required; a JSON
/// `null` counts as missing.
pub fn validate_ingest(request: IngestRequest) -> Result<(LogType, Value, Option<String>), AppError> {
    let (Some(log_type), Some(data)) = (request.log_type.filter(|t| !t.is_empty()), request.data)
    else {
        return Err(AppError::Validation(
            "Missing required fields: type and data".to_string(),
        ));
    };

    let log_type = log_type.parse::<LogType>().map_err(AppError::Validation)?;
    Ok((log_type, data, request.username))
}

/// Empty (or whitespace-only) bodies mean "clear both streams".
pub fn parse_clear_body(body: &[u8]) -> Result<ClearRequest, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(ClearRequest::default());
    }

    Json::<ClearRequest>::from_bytes(body)
        .map(|Json(request)| request)
        .map_err(|e| AppError::Validation(e.body_text()))
}

/// POST /api/logs - Store one event record
pub async fn ingest(
    State(state): State<AppState>,
    headers: HeaderMap,
    extensions: Extensions,
    payload: Result<Json<IngestRequest>, JsonRejection>,
) -> Result<Json<IngestResponse>, AppError> {
    let Json(request) = payload.map_err(|e| AppError::Validation(e.body_text()))?;
    let (log_type, data, username) = validate_ingest(request)?;

    let outcome = state
        .adapter
        .ingest(log_type, data, username, client_info(&headers, &extensions))
        .await?;

    let message = match outcome.saved_to {
        Backend::Primary => "Log entry saved to primary backend",
        Backend::Fallback => "Log entry saved to local storage",
    };

    Ok(Json(IngestResponse {
        success: true,
        message: message.to_string(),
        saved_to: outcome.saved_to,
    }))
}

/// GET /api/logs - Newest-first page of one partition
///
/// Example: GET /api/logs?type=ERROR&limit=20&offset=40&source=local
pub async fn query(
    State(state): State<AppState>,
    Query(params): Query<LogQueryParams>,
) -> Result<Json<LogsResponse>, AppError> {
    let partition = Partition::from_type_param(params.log_type.as_deref());
    let limit = parse_or(params.limit.as_deref(), DEFAULT_LIMIT);
    let offset = parse_or(params.offset.as_deref(), 0);
    let source = Source::parse(params.source.as_deref());

    let outcome = state.adapter.query(partition, limit, offset, source).await?;

    Ok(Json(LogsResponse {
        logs: outcome.page.logs,
        total: outcome.page.total,
        has_more: outcome.page.has_more,
        source: outcome.source,
    }))
}

/// DELETE /api/logs - Truncate local streams and reset stats
///
/// The body is optional; without one both streams are cleared. A body that
/// is present but not a valid request is rejected before anything is
/// touched.
pub async fn clear(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<ClearResponse>, AppError> {
    let request = parse_clear_body(&body)?;

    if Source::parse(request.source.as_deref()) == Source::Primary
        && state.adapter.primary_name().is_some()
    {
        return Ok(Json(ClearResponse {
            success: true,
            message: "Entries in the primary backend are governed by its retention policy. \
                      Delete them with the provider's console or CLI, or pass source=local \
                      to clear local storage."
                .to_string(),
        }));
    }

    let selector = PartitionSelector::from_type_param(request.log_type.as_deref());
    state.adapter.sink().clear(selector).await?;

    Ok(Json(ClearResponse {
        success: true,
        message: "Logs cleared successfully".to_string(),
    }))
}

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::sink::SinkError;

/// Application error types
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Missing or invalid ingestion fields
    #[error("Validation error: {0}")]
    Validation(String),
    /// Requested local stream does not exist
    #[error("Not found: {0}")]
    NotFound(String),
    /// Admission control rejected the request
    #[error("Rate limited: {0}")]
    RateLimited(String),
    /// Local storage failed on the path of last resort
    #[error("Storage error: {0}")]
    Storage(#[from] SinkError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            Self::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Self::RateLimited(msg) => (StatusCode::TOO_MANY_REQUESTS, msg.clone()),
            Self::Storage(err) => {
                // Paths stay in the server log only
                tracing::error!(error = %err, "Local storage operation failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to access log storage".to_string(),
                )
            }
        };

        let body = Json(json!({
            "success": false,
            "error": {
                "message": error_message,
                "type": error_type_name(&self),
            }
        }));

        (status, body).into_response()
    }
}

fn error_type_name(error: &AppError) -> &'static str {
    match error {
        AppError::Validation(_) => "validation_error",
        AppError::NotFound(_) => "not_found",
        AppError::RateLimited(_) => "rate_limited",
        AppError::Storage(_) => "storage_error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_error_display() {
        let error = AppError::Validation("Missing required fields: type and data".to_string());
        assert_eq!(
            error.to_string(),
            "Validation error: Missing required fields: type and data"
        );
    }

    #[test]
    fn test_error_type_name() {
        assert_eq!(error_type_name(&AppError::NotFound("x".to_string())), "not_found");
        assert_eq!(error_type_name(&AppError::RateLimited("x".to_string())), "rate_limited");
    }

    #[tokio::test]
    async fn test_error_response_status() {
        let response = AppError::Validation("bad".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = AppError::RateLimited("slow down".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn test_storage_error_hides_path() {
        let error = AppError::from(SinkError::Write {
            path: PathBuf::from("/secret/logs/visa_requests.jsonl"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        });
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(!text.contains("/secret"));
    }
}

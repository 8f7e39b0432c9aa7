use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::json;

use super::AppState;
use crate::models::now_iso;

/// Health check endpoint
/// Reports uptime and which logging backends are in play
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let primary = state.adapter.primary_name().unwrap_or("disabled");

    (StatusCode::OK, Json(json!({
        "status": "healthy",
        "timestamp": now_iso(),
        "uptime": state.started_at.elapsed().as_secs_f64(),
        "logging": {
            "primary": primary,
            "fallback": "local-file",
            "logDir": state.adapter.sink().dir().display().to_string(),
        },
        "version": env!("CARGO_PKG_VERSION"),
    })))
}

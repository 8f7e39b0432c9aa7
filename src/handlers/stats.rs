use axum::extract::{Query, State};
use axum::response::Json;
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::adapter::{Backend, Source};
use crate::models::{SizeInfo, Stats};

#[derive(Debug, Default, Deserialize)]
pub struct StatsParams {
    pub source: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    #[serde(flatten)]
    pub stats: Stats,
    #[serde(flatten)]
    pub size_info: Option<SizeInfo>,
    pub source: Backend,
}

/// GET /api/stats - Counters by type, plus local file sizes when served locally
pub async fn stats(
    State(state): State<AppState>,
    Query(params): Query<StatsParams>,
) -> Json<StatsResponse> {
    let outcome = state.adapter.stats(Source::parse(params.source.as_deref())).await;

    Json(StatsResponse {
        stats: outcome.stats,
        size_info: outcome.size_info,
        source: outcome.source,
    })
}

//! System status and history endpoints

use axum::{
    Json,
    extract::{Query, State},
};

use crate::{
    SystemSnapshot,
    api::{
        error::{ApiError, ApiResult},
        state::ApiState,
        types::{ApiResponse, HistoryQuery},
    },
};

/// GET /api/system/status
///
/// Samples the probe on demand, independent of the broadcast loop.
pub async fn get_status(
    State(state): State<ApiState>,
) -> ApiResult<Json<ApiResponse<SystemSnapshot>>> {
    let snapshot = state
        .probe
        .sample()
        .await
        .map_err(|e| ApiError::ProbeFailure(format!("failed to sample system metrics: {e:#}")))?;

    Ok(Json(ApiResponse::ok(snapshot)))
}

/// GET /api/system/history?limit=N
///
/// Recent broadcast samples from the in-memory ring, newest first. Empty
/// until the hub has delivered at least one sample.
pub async fn get_history(
    State(state): State<ApiState>,
    Query(query): Query<HistoryQuery>,
) -> Json<ApiResponse<Vec<SystemSnapshot>>> {
    let limit = query.limit.unwrap_or(60);
    let samples = state.hub.recent(limit).await;

    Json(ApiResponse::ok(samples))
}

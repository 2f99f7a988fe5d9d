//! Health check endpoint

use axum::{Json, extract::State};
use chrono::Utc;

use crate::{
    api::{state::ApiState, types::HealthResponse},
    util::format_uptime,
};

/// GET /api/health
///
/// Liveness check with the backend's own uptime
pub async fn health_check(State(state): State<ApiState>) -> Json<HealthResponse> {
    let uptime_seconds = (Utc::now() - state.started_at).num_seconds().max(0) as u64;

    Json(HealthResponse {
        success: true,
        message: "host monitoring backend is running".to_string(),
        timestamp: Utc::now().to_rfc3339(),
        uptime: format_uptime(uptime_seconds),
    })
}

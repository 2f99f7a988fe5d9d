//! VM projection, analysis, and action endpoints
//!
//! The "VM list" is the local host projected as one entry; action requests
//! are validated here and executed by the ActionExecutor actor.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;

use crate::{
    VmRecord,
    actors::messages::{ActionRequest, ActionResult},
    analyzer::{self, HealthReport, ResourceMetrics},
    api::{
        error::{ApiError, ApiResult},
        state::ApiState,
        types::ApiResponse,
    },
};

/// GET /api/vms
pub async fn list_vms(State(state): State<ApiState>) -> ApiResult<Json<ApiResponse<Vec<VmRecord>>>> {
    let snapshot = state
        .probe
        .sample()
        .await
        .map_err(|e| ApiError::ProbeFailure(format!("failed to sample system metrics: {e:#}")))?;

    Ok(Json(ApiResponse::ok(vec![VmRecord::from_snapshot(
        &snapshot,
    )])))
}

/// GET /api/vms/{id}/analysis
pub async fn get_analysis(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<HealthReport>>> {
    if id != "vm-main" {
        return Err(ApiError::NotFound(format!("unknown VM: {id}")));
    }

    let snapshot = state
        .probe
        .sample()
        .await
        .map_err(|e| ApiError::ProbeFailure(format!("failed to sample system metrics: {e:#}")))?;

    let report = analyzer::analyze(&ResourceMetrics::from_snapshot(&snapshot));

    Ok(Json(ApiResponse::ok(report)))
}

/// Incoming action body; validated by hand so malformed requests get the
/// `{success: false}` shape instead of a bare 422.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionBody {
    #[serde(default)]
    pub vm_id: Option<String>,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub parameters: Option<serde_json::Value>,
}

/// POST /api/vms/action
pub async fn execute_action(
    State(state): State<ApiState>,
    Json(body): Json<ActionBody>,
) -> ApiResult<Json<ActionResult>> {
    let action = body
        .action
        .as_deref()
        .map(str::trim)
        .filter(|action| !action.is_empty())
        .ok_or_else(|| ApiError::InvalidRequest("action name is required".to_string()))?;

    let vm_id = body
        .vm_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::InvalidRequest("vmId is required".to_string()))?;

    let request = ActionRequest {
        vm_id: vm_id.to_string(),
        action: action.to_string(),
        parameters: body.parameters,
    };

    let result = state
        .executor
        .execute(request)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(result))
}

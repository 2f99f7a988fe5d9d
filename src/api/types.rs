//! Shared API response types
//!
//! Every data-carrying endpoint wraps its payload in `{success, data}`, the
//! shape the dashboard's fetch hooks expect.

use serde::{Deserialize, Serialize};

/// Generic success envelope for GET endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Response for GET /api/health
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub success: bool,
    pub message: String,
    pub timestamp: String,
    pub uptime: String,
}

/// Query parameters for GET /api/system/history
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    /// Max samples to return, newest first (default: 60)
    pub limit: Option<usize>,
}

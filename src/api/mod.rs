//! REST API and WebSocket server for the monitoring backend
//!
//! This module provides the HTTP surface for system status, VM projections,
//! health analysis, and remediation actions, plus WebSocket support for
//! real-time metric streaming.
//!
//! ## Architecture
//!
//! - **Axum** web framework with Tower middleware
//! - **Actor handles** for the broadcast hub and action executor
//! - **WebSocket** admission happens before the upgrade, so over-capacity
//!   clients get an explicit rejection instead of a dropped socket
//!
//! ## Endpoints
//!
//! - `GET  /api/health` - Health check
//! - `GET  /api/system/status` - Current system snapshot
//! - `GET  /api/system/history` - Recent samples from the in-memory ring
//! - `GET  /api/vms` - The host as a VM list
//! - `GET  /api/vms/{id}/analysis` - Rule-based health analysis
//! - `POST /api/vms/action` - Execute a remediation action
//! - `WS   /api/stream` - Real-time metric streaming

pub mod error;
pub mod routes;
pub mod state;
pub mod types;
pub mod websocket;

pub use error::{ApiError, ApiResult};
pub use state::ApiState;
pub use types::{ApiResponse, HealthResponse};

use axum::{
    Router,
    routing::{get, post},
};
use std::net::SocketAddr;
use tracing::info;

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Bind address (e.g., "0.0.0.0:3001")
    pub bind_addr: SocketAddr,

    /// Enable CORS for the dashboard
    pub enable_cors: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:3001".parse().unwrap(),
            enable_cors: true,
        }
    }
}

/// Build the application router.
///
/// Exposed separately from [`spawn_api_server`] so tests can serve it on an
/// ephemeral port.
pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api/health", get(routes::health::health_check))
        .route("/api/system/status", get(routes::system::get_status))
        .route("/api/system/history", get(routes::system::get_history))
        .route("/api/vms", get(routes::vms::list_vms))
        .route("/api/vms/:id/analysis", get(routes::vms::get_analysis))
        .route("/api/vms/action", post(routes::vms::execute_action))
        .route("/api/stream", get(websocket::websocket_handler))
        .with_state(state)
}

/// Spawn the API server
///
/// This starts an Axum HTTP server in a background task.
/// Returns the server's local address.
pub async fn spawn_api_server(config: ApiConfig, state: ApiState) -> anyhow::Result<SocketAddr> {
    use tower_http::cors::{Any, CorsLayer};
    use tower_http::trace::TraceLayer;

    info!("starting API server on {}", config.bind_addr);

    let mut app = router(state).layer(TraceLayer::new_for_http());

    if config.enable_cors {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        app = app.layer(cors);
    }

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    let addr = listener.local_addr()?;

    info!("API server listening on {}", addr);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("API server error: {}", e);
        }
    });

    Ok(addr)
}

//! WebSocket handler for real-time metric streaming
//!
//! Admission happens before the upgrade: a client over the subscriber limit
//! receives an explicit 503 with the rejection reason instead of a socket
//! that closes immediately.

use axum::{
    Json,
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures::{SinkExt, stream::StreamExt};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::{
    actors::{
        hub::HubHandle,
        messages::{AdmissionError, ClientMessage, Subscription},
    },
    api::state::ApiState,
};

/// WebSocket upgrade handler
///
/// GET /api/stream
pub async fn websocket_handler(ws: WebSocketUpgrade, State(state): State<ApiState>) -> Response {
    match state.hub.admit().await {
        Ok(subscription) => {
            let hub = state.hub.clone();
            ws.on_upgrade(move |socket| handle_websocket(socket, subscription, hub))
        }

        Err(rejection @ AdmissionError::CapacityExceeded { .. }) => {
            info!("rejecting WebSocket connection: {rejection}");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "message": rejection.to_string(),
                })),
            )
                .into_response()
        }

        Err(rejection) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "success": false,
                "message": rejection.to_string(),
            })),
        )
            .into_response(),
    }
}

/// Handle WebSocket connection
async fn handle_websocket(socket: WebSocket, subscription: Subscription, hub: HubHandle) {
    info!("WebSocket client connected");

    let Subscription { id, mut receiver } = subscription;
    let (mut sender, mut socket_rx) = socket.split();

    // Forward hub deliveries to the socket
    let mut send_task = tokio::spawn(async move {
        while let Some(message) = receiver.recv().await {
            match serde_json::to_string(&message) {
                Ok(text) => {
                    if sender.send(Message::Text(text)).await.is_err() {
                        debug!("WebSocket send failed, client disconnected");
                        break;
                    }
                }
                Err(e) => {
                    warn!("failed to serialize push message: {e}");
                }
            }
        }
    });

    // Parse incoming client messages and hand them to the hub
    let recv_hub = hub.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = socket_rx.next().await {
            match msg {
                Message::Text(text) => match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(message) => recv_hub.handle_message(id, message).await,
                    Err(e) => {
                        // Malformed input is dropped; the connection stays up.
                        debug!("ignoring malformed client message: {e}");
                    }
                },
                Message::Close(_) => break,
                Message::Ping(_) => {
                    // Pong is automatically sent by axum
                    debug!("received ping");
                }
                _ => {}
            }
        }
    });

    // Wait for either task to finish
    tokio::select! {
        _ = (&mut send_task) => {
            recv_task.abort();
        }
        _ = (&mut recv_task) => {
            send_task.abort();
        }
    }

    hub.remove(id).await;
    info!("WebSocket client disconnected");
}

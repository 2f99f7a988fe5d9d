//! Integration tests for API endpoints
//!
//! These tests verify that:
//! - All REST endpoints return the `{success, ...}` shapes the dashboard expects
//! - Probe failures surface as contained 500s, not crashes
//! - Action validation fails at the transport boundary only
//! - WebSocket streaming, ping/pong, request-data, and capacity rejection work
//!   over a real socket

use std::net::SocketAddr;
use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use hostwatch::{
    actors::{executor::ExecutorHandle, hub::HubHandle},
    api::{ApiConfig, ApiState, spawn_api_server},
    config::ActionConfig,
    probe::MetricsProbe,
};
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio_tungstenite::{connect_async, tungstenite};

use super::helpers::*;

// Helper to create a test API server on an ephemeral port
async fn spawn_test_api(
    probe: Arc<dyn MetricsProbe>,
    max_subscribers: usize,
) -> (SocketAddr, TempDir) {
    let hub = HubHandle::spawn(probe.clone(), &hub_config(max_subscribers));

    let dir = tempfile::tempdir().unwrap();
    let executor = ExecutorHandle::spawn(ActionConfig {
        cleanup_dir: dir.path().to_path_buf(),
        managed_services: vec!["nginx".to_string()],
    });

    let state = ApiState::new(hub, executor, probe);
    let config = ApiConfig {
        bind_addr: "127.0.0.1:0".parse().unwrap(), // Random port
        enable_cors: true,
    };

    let addr = spawn_api_server(config, state).await.unwrap();
    (addr, dir)
}

#[tokio::test]
async fn health_endpoint_reports_running() {
    let (addr, _dir) = spawn_test_api(Arc::new(ScriptedProbe::new()), 4).await;

    let client = reqwest::Client::new();
    let response = client
        .get(format!("http://{addr}/api/health"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert!(body["message"].as_str().unwrap().contains("running"));
    assert!(body["uptime"].is_string());
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn system_status_returns_fresh_snapshot() {
    let (addr, _dir) = spawn_test_api(Arc::new(ScriptedProbe::new()), 4).await;

    let client = reqwest::Client::new();
    let body: Value = client
        .get(format!("http://{addr}/api/system/status"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["cpu_percent"], 1.0);
    assert_eq!(body["data"]["hostname"], "test-host");
    assert!(body["data"]["memory"]["percent"].is_number());
}

#[tokio::test]
async fn system_status_probe_failure_is_contained_500() {
    let (addr, _dir) = spawn_test_api(Arc::new(ScriptedProbe::always_failing()), 4).await;

    let client = reqwest::Client::new();
    let response = client
        .get(format!("http://{addr}/api/system/status"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 500);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn vms_lists_the_host_as_one_entry() {
    let (addr, _dir) = spawn_test_api(Arc::new(ScriptedProbe::new()), 4).await;

    let client = reqwest::Client::new();
    let body: Value = client
        .get(format!("http://{addr}/api/vms"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["success"], true);
    let vms = body["data"].as_array().unwrap();
    assert_eq!(vms.len(), 1);
    assert_eq!(vms[0]["id"], "vm-main");
    assert_eq!(vms[0]["name"], "test-host (Main System)");
    assert!(vms[0]["lastUpdate"].is_string());
    assert_eq!(vms[0]["status"], "healthy");
}

#[tokio::test]
async fn analysis_endpoint_scores_the_host() {
    let (addr, _dir) = spawn_test_api(Arc::new(ScriptedProbe::new()), 4).await;

    let client = reqwest::Client::new();
    let body: Value = client
        .get(format!("http://{addr}/api/vms/vm-main/analysis"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["success"], true);
    // Scripted metrics are well inside the healthy bands.
    assert_eq!(body["data"]["status"], "healthy");
    assert_eq!(body["data"]["score"], 100);
    assert_eq!(body["data"]["priority"], "low");
    assert!(body["data"]["issues"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn analysis_unknown_vm_is_404() {
    let (addr, _dir) = spawn_test_api(Arc::new(ScriptedProbe::new()), 4).await;

    let client = reqwest::Client::new();
    let response = client
        .get(format!("http://{addr}/api/vms/vm-other/analysis"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 404);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn action_endpoint_executes_recognized_action() {
    let (addr, _dir) = spawn_test_api(Arc::new(ScriptedProbe::new()), 4).await;

    let client = reqwest::Client::new();
    let body: Value = client
        .post(format!("http://{addr}/api/vms/action"))
        .json(&json!({ "vmId": "vm-main", "action": "Restart Services" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Services restarted successfully");
    assert_eq!(body["data"]["services_restarted"], json!(["nginx"]));
}

#[tokio::test]
async fn action_endpoint_is_permissive_about_names() {
    let (addr, _dir) = spawn_test_api(Arc::new(ScriptedProbe::new()), 4).await;

    let client = reqwest::Client::new();
    let body: Value = client
        .post(format!("http://{addr}/api/vms/action"))
        .json(&json!({ "vmId": "vm-main", "action": "Make It Faster" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["success"], true);
    assert!(
        body["message"]
            .as_str()
            .unwrap()
            .contains("completed successfully")
    );
}

#[tokio::test]
async fn action_without_name_fails_validation() {
    let (addr, _dir) = spawn_test_api(Arc::new(ScriptedProbe::new()), 4).await;

    let client = reqwest::Client::new();
    let response = client
        .post(format!("http://{addr}/api/vms/action"))
        .json(&json!({ "vmId": "vm-main" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert!(body["message"].as_str().unwrap().contains("action"));
}

#[tokio::test]
async fn websocket_stream_delivers_and_answers() {
    let (addr, _dir) = spawn_test_api(Arc::new(ScriptedProbe::new()), 4).await;

    let (mut socket, _) = connect_async(format!("ws://{addr}/api/stream"))
        .await
        .unwrap();

    // Initial push: system-status then vm-data.
    let first: Value =
        serde_json::from_str(&socket.next().await.unwrap().unwrap().into_text().unwrap()).unwrap();
    assert_eq!(first["type"], "system-status");
    assert_eq!(first["data"]["id"], "main-system");
    assert_eq!(first["data"]["status"], "running");

    let second: Value =
        serde_json::from_str(&socket.next().await.unwrap().unwrap().into_text().unwrap()).unwrap();
    assert_eq!(second["type"], "vm-data");
    assert_eq!(second["data"][0]["id"], "vm-main");

    // Ping is answered with a pong envelope.
    socket
        .send(tungstenite::Message::Text(
            r#"{"type":"ping"}"#.to_string(),
        ))
        .await
        .unwrap();

    let pong: Value =
        serde_json::from_str(&socket.next().await.unwrap().unwrap().into_text().unwrap()).unwrap();
    assert_eq!(pong["type"], "pong");
    assert!(pong["data"]["timestamp"].is_string());

    // Malformed input is ignored; the connection keeps working.
    socket
        .send(tungstenite::Message::Text(
            r#"{"type":"subscribe"}"#.to_string(),
        ))
        .await
        .unwrap();

    socket
        .send(tungstenite::Message::Text(
            r#"{"type":"request-data"}"#.to_string(),
        ))
        .await
        .unwrap();

    let refreshed: Value =
        serde_json::from_str(&socket.next().await.unwrap().unwrap().into_text().unwrap()).unwrap();
    assert_eq!(refreshed["type"], "system-status");
}

#[tokio::test]
async fn websocket_over_capacity_is_rejected_at_handshake() {
    let (addr, _dir) = spawn_test_api(Arc::new(ScriptedProbe::new()), 1).await;

    let (_kept, _) = connect_async(format!("ws://{addr}/api/stream"))
        .await
        .unwrap();

    let error = connect_async(format!("ws://{addr}/api/stream"))
        .await
        .unwrap_err();

    match error {
        tungstenite::Error::Http(response) => {
            assert_eq!(response.status(), 503);
        }
        other => panic!("expected HTTP rejection, got: {other:?}"),
    }
}

//! Message types for actor communication and the push channel
//!
//! ## Design Principles
//!
//! 1. **Commands**: Request/response messages sent to specific actors via mpsc
//! 2. **Wire messages**: Tagged unions with a `{type, data}` envelope; unknown
//!    client message types fail to parse and are dropped at the session layer
//! 3. **Immutability**: Wire messages are cloneable so one tick's payload can
//!    fan out to every subscriber

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};

use crate::{SystemSnapshot, VmRecord};

/// Identifier of one live push-channel subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(pub u64);

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "subscriber-{}", self.0)
    }
}

/// Server → client push messages, serialized as `{"type": ..., "data": ...}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case")]
pub enum ServerMessage {
    SystemStatus(SystemStatusData),
    VmData(Vec<VmRecord>),
    Pong { timestamp: String },
}

/// Payload of a `system-status` message: the snapshot plus the synthetic
/// entity envelope the dashboard keys on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemStatusData {
    pub id: String,
    pub status: String,
    #[serde(flatten)]
    pub snapshot: SystemSnapshot,
}

impl SystemStatusData {
    pub fn running(snapshot: SystemSnapshot) -> Self {
        Self {
            id: "main-system".to_string(),
            status: "running".to_string(),
            snapshot,
        }
    }
}

/// Client → server messages. Unknown `type` tags fail deserialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientMessage {
    Ping,
    RequestData,
}

/// Why a connection was not admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionError {
    /// The subscriber set is at the configured maximum.
    CapacityExceeded { max: usize },

    /// The hub is gone (shutting down); not a capacity problem.
    HubUnavailable,
}

impl fmt::Display for AdmissionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdmissionError::CapacityExceeded { max } => {
                write!(f, "subscriber capacity exceeded (max {max})")
            }
            AdmissionError::HubUnavailable => write!(f, "broadcast hub unavailable"),
        }
    }
}

impl std::error::Error for AdmissionError {}

/// A successful admission: the id the hub knows the subscriber by, and the
/// channel its deliveries arrive on. Dropping the receiver disconnects.
#[derive(Debug)]
pub struct Subscription {
    pub id: SubscriberId,
    pub receiver: mpsc::UnboundedReceiver<ServerMessage>,
}

/// Commands that can be sent to the BroadcastHub
#[derive(Debug)]
pub enum HubCommand {
    /// Admit a new subscriber, subject to capacity
    Admit {
        respond_to: oneshot::Sender<Result<Subscription, AdmissionError>>,
    },

    /// Remove a subscriber (disconnect or delivery error); idempotent
    Remove { id: SubscriberId },

    /// Handle a message received from a subscriber
    HandleMessage {
        id: SubscriberId,
        message: ClientMessage,
    },

    /// Start (or restart) the broadcast ticker
    ///
    /// Replaces any running ticker, so repeated starts never stack timers.
    Start { interval: Duration },

    /// Stop the broadcast ticker; safe when not running
    Stop,

    /// Latest successfully sampled snapshot, if any
    Latest {
        respond_to: oneshot::Sender<Option<SystemSnapshot>>,
    },

    /// Recent samples from the in-memory ring, newest first
    Recent {
        limit: usize,
        respond_to: oneshot::Sender<Vec<SystemSnapshot>>,
    },

    /// Current number of live subscribers
    SubscriberCount { respond_to: oneshot::Sender<usize> },

    /// Gracefully shut down the hub
    Shutdown,
}

/// A remediation request against one target.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionRequest {
    pub vm_id: String,
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<serde_json::Value>,
}

/// Outcome of one remediation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResult {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// Commands that can be sent to the ActionExecutor
#[derive(Debug)]
pub enum ExecutorCommand {
    /// Execute one action; requests are processed strictly in order
    Execute {
        request: ActionRequest,
        respond_to: oneshot::Sender<ActionResult>,
    },

    /// Gracefully shut down the executor
    Shutdown,
}

//! API shared state containing actor handles

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::{
    actors::{executor::ExecutorHandle, hub::HubHandle},
    probe::MetricsProbe,
};

/// Shared state passed to all API handlers
#[derive(Clone)]
pub struct ApiState {
    /// Handle to the broadcast hub (stream admission, history)
    pub hub: HubHandle,

    /// Handle to the action executor
    pub executor: ExecutorHandle,

    /// Metrics probe for request/response sampling, independent of the
    /// broadcast loop
    pub probe: Arc<dyn MetricsProbe>,

    /// Process start, for the health endpoint's uptime figure
    pub started_at: DateTime<Utc>,
}

impl ApiState {
    /// Create new API state with all actor handles
    pub fn new(hub: HubHandle, executor: ExecutorHandle, probe: Arc<dyn MetricsProbe>) -> Self {
        Self {
            hub,
            executor,
            probe,
            started_at: Utc::now(),
        }
    }
}

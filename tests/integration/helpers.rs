//! Helper functions for integration tests

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use hostwatch::{
    DiskUsage, MemoryUsage, SystemSnapshot,
    config::HubConfig,
    probe::MetricsProbe,
};

pub fn test_snapshot(cpu: f32, ram: f32, disk: f32, uptime: &str) -> SystemSnapshot {
    SystemSnapshot {
        cpu_percent: cpu,
        memory: MemoryUsage {
            total_gb: 16.0,
            used_gb: 16.0 * ram as f64 / 100.0,
            free_gb: 16.0 * (100.0 - ram as f64) / 100.0,
            percent: ram,
        },
        disk: DiskUsage {
            total_gb: 500.0,
            used_gb: 500.0 * disk as f64 / 100.0,
            free_gb: 500.0 * (100.0 - disk as f64) / 100.0,
            percent: disk,
        },
        uptime_seconds: 86_400 * hostwatch::util::parse_uptime_days(uptime),
        uptime: uptime.to_string(),
        hostname: "test-host".to_string(),
        platform: "linux".to_string(),
        timestamp: Utc::now(),
    }
}

pub fn hub_config(max_subscribers: usize) -> HubConfig {
    HubConfig {
        interval_ms: 1000,
        max_subscribers,
        history_capacity: 32,
    }
}

/// Probe fake with scripted failures.
///
/// Returns snapshots whose cpu percent equals the 1-based sample number, so
/// tests can tell ticks apart. Fails on the configured sample numbers, or on
/// every sample when `fail_all` is set.
pub struct ScriptedProbe {
    calls: AtomicUsize,
    fail_on: Vec<usize>,
    fail_all: bool,
}

impl ScriptedProbe {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail_on: Vec::new(),
            fail_all: false,
        }
    }

    pub fn failing_on(fail_on: Vec<usize>) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail_on,
            fail_all: false,
        }
    }

    pub fn always_failing() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail_on: Vec::new(),
            fail_all: true,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetricsProbe for ScriptedProbe {
    async fn sample(&self) -> anyhow::Result<SystemSnapshot> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;

        if self.fail_all || self.fail_on.contains(&call) {
            anyhow::bail!("injected probe failure on sample {call}");
        }

        Ok(test_snapshot(call as f32, 50.0, 40.0, "2d 3h 15m"))
    }
}

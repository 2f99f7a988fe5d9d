pub mod actors;
pub mod analyzer;
pub mod api;
pub mod config;
pub mod history;
pub mod probe;
pub mod util;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// CPU thresholds for the VM card status shown on the dashboard.
///
/// These are intentionally distinct from the analyzer bands: the card only
/// reflects CPU pressure, the analyzer scores all three resources.
pub const VM_CPU_WARNING: f32 = 60.0;
pub const VM_CPU_CRITICAL: f32 = 80.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemSnapshot {
    pub cpu_percent: f32,
    pub memory: MemoryUsage,
    pub disk: DiskUsage,
    pub uptime_seconds: u64,
    pub uptime: String,
    pub hostname: String,
    pub platform: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryUsage {
    pub total_gb: f64,
    pub used_gb: f64,
    pub free_gb: f64,
    pub percent: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiskUsage {
    pub total_gb: f64,
    pub used_gb: f64,
    pub free_gb: f64,
    pub percent: f32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VmStatus {
    Healthy,
    Warning,
    Critical,
}

impl VmStatus {
    pub fn from_cpu(cpu_percent: f32) -> Self {
        if cpu_percent > VM_CPU_CRITICAL {
            VmStatus::Critical
        } else if cpu_percent > VM_CPU_WARNING {
            VmStatus::Warning
        } else {
            VmStatus::Healthy
        }
    }
}

/// The local host projected as a single VM entry, the shape the dashboard
/// tables and cards consume.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VmRecord {
    pub id: String,
    pub name: String,
    pub status: VmStatus,
    pub cpu: f32,
    pub ram: f32,
    pub disk: f32,
    pub uptime: String,
    pub last_update: DateTime<Utc>,
}

impl VmRecord {
    pub fn from_snapshot(snapshot: &SystemSnapshot) -> Self {
        Self {
            id: "vm-main".to_string(),
            name: format!("{} (Main System)", snapshot.hostname),
            status: VmStatus::from_cpu(snapshot.cpu_percent),
            cpu: snapshot.cpu_percent,
            ram: snapshot.memory.percent,
            disk: snapshot.disk.percent,
            uptime: snapshot.uptime.clone(),
            last_update: snapshot.timestamp,
        }
    }
}

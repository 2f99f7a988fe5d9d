//! Metrics probe - samples CPU/memory/disk figures from the local host
//!
//! The probe is the hub's injected data source. Production code uses
//! [`SysinfoProbe`]; tests substitute fakes implementing [`MetricsProbe`].

use std::path::Path;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use chrono::Utc;
use sysinfo::{Disks, System};

use crate::{DiskUsage, MemoryUsage, SystemSnapshot, util::format_uptime};

/// Source of [`SystemSnapshot`]s.
///
/// Sampling may fail (e.g. no disks visible in a container); callers treat a
/// failed sample as a skipped tick, never as a fatal condition.
#[async_trait]
pub trait MetricsProbe: Send + Sync {
    async fn sample(&self) -> Result<SystemSnapshot>;
}

/// Probe backed by the `sysinfo` crate.
///
/// CPU usage needs two refreshes separated by `MINIMUM_CPU_UPDATE_INTERVAL`;
/// that blocking wait runs on the blocking pool so an in-flight sample never
/// stalls the runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct SysinfoProbe;

impl SysinfoProbe {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl MetricsProbe for SysinfoProbe {
    async fn sample(&self) -> Result<SystemSnapshot> {
        tokio::task::spawn_blocking(sample_host)
            .await
            .context("probe task failed")?
    }
}

fn sample_host() -> Result<SystemSnapshot> {
    let mut sys = System::new_all();
    sys.refresh_all();
    std::thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
    sys.refresh_all();

    let cpus = sys.cpus();
    if cpus.is_empty() {
        bail!("no CPUs reported by the system");
    }
    let cpu_usage_sum = cpus.iter().map(|cpu| cpu.cpu_usage()).sum::<f32>();
    let cpu_percent = clamp_percent(cpu_usage_sum / cpus.len() as f32);

    let total_memory = sys.total_memory();
    if total_memory == 0 {
        bail!("total memory reported as zero");
    }
    let used_memory = sys.used_memory();
    let memory = MemoryUsage {
        total_gb: to_gb(total_memory),
        used_gb: to_gb(used_memory),
        free_gb: to_gb(total_memory.saturating_sub(used_memory)),
        percent: clamp_percent((used_memory as f64 / total_memory as f64 * 100.0) as f32),
    };

    let disk = sample_root_disk()?;

    let uptime_seconds = System::uptime();

    Ok(SystemSnapshot {
        cpu_percent,
        memory,
        disk,
        uptime_seconds,
        uptime: format_uptime(uptime_seconds),
        hostname: System::host_name().unwrap_or_else(|| "unknown".to_string()),
        platform: std::env::consts::OS.to_string(),
        timestamp: Utc::now(),
    })
}

/// Disk figures for the root mount, falling back to the largest disk when no
/// mount point is exactly "/" (e.g. some containers).
fn sample_root_disk() -> Result<DiskUsage> {
    let disks = Disks::new_with_refreshed_list();

    let disk = disks
        .iter()
        .find(|disk| disk.mount_point() == Path::new("/"))
        .or_else(|| disks.iter().max_by_key(|disk| disk.total_space()));

    let Some(disk) = disk else {
        bail!("no disks reported by the system");
    };

    let total = disk.total_space();
    if total == 0 {
        bail!("disk reported zero total space");
    }
    let free = disk.available_space();
    let used = total.saturating_sub(free);

    Ok(DiskUsage {
        total_gb: to_gb(total),
        used_gb: to_gb(used),
        free_gb: to_gb(free),
        percent: clamp_percent((used as f64 / total as f64 * 100.0) as f32),
    })
}

fn to_gb(bytes: u64) -> f64 {
    (bytes as f64 / 1_073_741_824.0 * 100.0).round() / 100.0
}

fn clamp_percent(value: f32) -> f32 {
    value.clamp(0.0, 100.0)
}

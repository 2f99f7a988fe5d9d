//! ActionExecutor - runs canned remediation actions against the host
//!
//! Requests are processed strictly in order off one command channel, so two
//! actions against the same target can never overlap.
//!
//! ## Contract
//!
//! A recognized action does best-effort host work and always reports
//! `success: true`; partial failure (e.g. insufficient privilege) degrades
//! the reported effect instead of failing the request. Unrecognized action
//! names get a generic success acknowledgment. `success: false` only exists
//! at the transport boundary for malformed requests.

use std::path::Path;

use chrono::Utc;
use serde_json::json;
use sysinfo::System;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, instrument, warn};

use crate::config::ActionConfig;

use super::messages::{ActionRequest, ActionResult, ExecutorCommand};

/// The fixed remediation vocabulary, matched case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VmAction {
    OptimizePerformance,
    CleanupDisk,
    RestartServices,
    EmergencyRestart,
    Other(String),
}

impl VmAction {
    pub fn parse(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "optimize performance" => VmAction::OptimizePerformance,
            "cleanup disk" => VmAction::CleanupDisk,
            "restart services" => VmAction::RestartServices,
            "emergency restart" => VmAction::EmergencyRestart,
            _ => VmAction::Other(name.to_string()),
        }
    }
}

/// Actor that executes remediation requests sequentially.
pub struct ActionExecutor {
    config: ActionConfig,
    command_rx: mpsc::Receiver<ExecutorCommand>,
}

impl ActionExecutor {
    pub fn new(config: ActionConfig, command_rx: mpsc::Receiver<ExecutorCommand>) -> Self {
        Self { config, command_rx }
    }

    /// Run the actor's main loop until Shutdown or channel close.
    #[instrument(skip(self))]
    pub async fn run(mut self) {
        debug!("starting action executor");

        while let Some(command) = self.command_rx.recv().await {
            match command {
                ExecutorCommand::Execute {
                    request,
                    respond_to,
                } => {
                    let result = self.execute(&request).await;
                    let _ = respond_to.send(result);
                }

                ExecutorCommand::Shutdown => {
                    debug!("received shutdown command");
                    break;
                }
            }
        }

        debug!("action executor stopped");
    }

    #[instrument(skip(self), fields(target = %request.vm_id, action = %request.action))]
    async fn execute(&self, request: &ActionRequest) -> ActionResult {
        debug!("executing action");

        match VmAction::parse(&request.action) {
            VmAction::OptimizePerformance => self.optimize_performance().await,
            VmAction::CleanupDisk => self.cleanup_disk().await,
            VmAction::RestartServices => self.restart_services(),
            VmAction::EmergencyRestart => self.emergency_restart(&request.vm_id),
            VmAction::Other(name) => ActionResult {
                success: true,
                message: format!("Action \"{name}\" completed successfully"),
                data: Some(json!({ "timestamp": Utc::now().to_rfc3339() })),
            },
        }
    }

    /// Drop filesystem caches and report the memory that came back.
    ///
    /// The cache drop needs root; without it the reported effect is simply
    /// whatever the before/after measurement shows (usually ~0).
    async fn optimize_performance(&self) -> ActionResult {
        let before = used_memory_gb();

        if cfg!(target_os = "linux") {
            let outcome = tokio::process::Command::new("sh")
                .arg("-c")
                .arg("sync && echo 3 > /proc/sys/vm/drop_caches")
                .output()
                .await;

            match outcome {
                Ok(output) if output.status.success() => debug!("filesystem caches dropped"),
                Ok(_) => debug!("cache drop not permitted, reporting measured effect only"),
                Err(e) => debug!("cache drop failed to run: {e}"),
            }
        }

        let after = used_memory_gb();
        let freed = ((before - after).max(0.0) * 100.0).round() / 100.0;

        ActionResult {
            success: true,
            message: "Performance optimization completed".to_string(),
            data: Some(json!({ "memory_freed_gb": freed })),
        }
    }

    /// Delete what we can under the configured cleanup directory.
    ///
    /// Entries that cannot be removed are skipped and the freed figure
    /// shrinks accordingly; the request still succeeds.
    async fn cleanup_disk(&self) -> ActionResult {
        let root = self.config.cleanup_dir.clone();
        let sweep = tokio::task::spawn_blocking(move || sweep_dir(&root)).await;

        let sweep = match sweep {
            Ok(sweep) => sweep,
            Err(e) => {
                warn!("cleanup task failed: {e}");
                CleanupSweep::default()
            }
        };

        let freed_gb =
            (sweep.freed_bytes as f64 / 1_073_741_824.0 * 100.0).round() / 100.0;

        if sweep.skipped > 0 {
            debug!(
                "cleanup partially completed: {} removed, {} skipped",
                sweep.removed, sweep.skipped
            );
        }

        ActionResult {
            success: true,
            message: format!("Disk cleanup completed, freed {freed_gb:.1}GB"),
            data: Some(json!({
                "space_cleaned_gb": freed_gb,
                "entries_removed": sweep.removed,
                "entries_skipped": sweep.skipped,
            })),
        }
    }

    /// Simulated restart of the managed service set.
    fn restart_services(&self) -> ActionResult {
        ActionResult {
            success: true,
            message: "Services restarted successfully".to_string(),
            data: Some(json!({ "services_restarted": self.config.managed_services })),
        }
    }

    /// Simulated emergency restart. Logged loudly, performs no host work.
    fn emergency_restart(&self, target: &str) -> ActionResult {
        warn!("emergency restart requested for {target}");

        ActionResult {
            success: true,
            message: "Emergency restart initiated".to_string(),
            data: Some(json!({
                "restart_time": Utc::now().to_rfc3339(),
                "estimated_downtime": "2-3 minutes",
            })),
        }
    }
}

fn used_memory_gb() -> f64 {
    let mut sys = System::new();
    sys.refresh_memory();
    sys.used_memory() as f64 / 1_073_741_824.0
}

#[derive(Debug, Default)]
struct CleanupSweep {
    freed_bytes: u64,
    removed: usize,
    skipped: usize,
}

/// Remove the contents of `root` (not `root` itself), best effort.
fn sweep_dir(root: &Path) -> CleanupSweep {
    let mut sweep = CleanupSweep::default();

    let entries = match std::fs::read_dir(root) {
        Ok(entries) => entries,
        Err(_) => {
            sweep.skipped += 1;
            return sweep;
        }
    };

    for entry in entries.flatten() {
        sweep_entry(&entry.path(), &mut sweep);
    }

    sweep
}

fn sweep_entry(path: &Path, sweep: &mut CleanupSweep) {
    let Ok(metadata) = std::fs::symlink_metadata(path) else {
        sweep.skipped += 1;
        return;
    };

    if metadata.is_dir() {
        match std::fs::read_dir(path) {
            Ok(entries) => {
                for entry in entries.flatten() {
                    sweep_entry(&entry.path(), sweep);
                }
                match std::fs::remove_dir(path) {
                    Ok(()) => sweep.removed += 1,
                    Err(_) => sweep.skipped += 1,
                }
            }
            Err(_) => {
                sweep.skipped += 1;
            }
        }
    } else {
        let size = metadata.len();
        match std::fs::remove_file(path) {
            Ok(()) => {
                sweep.freed_bytes += size;
                sweep.removed += 1;
            }
            Err(_) => {
                sweep.skipped += 1;
            }
        }
    }
}

/// Handle for controlling an ActionExecutor
#[derive(Clone)]
pub struct ExecutorHandle {
    sender: mpsc::Sender<ExecutorCommand>,
}

impl ExecutorHandle {
    /// Spawn a new action executor
    pub fn spawn(config: ActionConfig) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);

        let actor = ActionExecutor::new(config, cmd_rx);
        tokio::spawn(actor.run());

        Self { sender: cmd_tx }
    }

    /// Execute one action and wait for its result.
    pub async fn execute(&self, request: ActionRequest) -> anyhow::Result<ActionResult> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(ExecutorCommand::Execute {
                request,
                respond_to: tx,
            })
            .await
            .map_err(|_| anyhow::anyhow!("action executor unavailable"))?;

        rx.await
            .map_err(|_| anyhow::anyhow!("action executor dropped the request"))
    }

    /// Gracefully shut down the executor.
    pub async fn shutdown(&self) {
        let _ = self.sender.send(ExecutorCommand::Shutdown).await;
    }
}

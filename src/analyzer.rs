//! Rule-based health analysis
//!
//! Deterministic, side-effect-free scoring of one metrics snapshot. Every
//! rule is a pure function of the inputs; calling [`analyze`] twice with the
//! same metrics yields an identical report.
//!
//! ## Scoring model
//!
//! Each resource is evaluated independently against its band table. A
//! triggered rule contributes an issue, a fixed recommendation set, and a
//! score impact. The overall status is the maximum severity across the three
//! resource checks; the uptime rule and the composite rules never escalate
//! it.

use serde::{Deserialize, Serialize};

use crate::{SystemSnapshot, util::parse_uptime_days};

/// Severity band for a single metric. Ordinal: healthy < warning < critical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Healthy,
    Warning,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

/// Inclusive lower bounds of the warning and critical bands.
#[derive(Debug, Clone, Copy)]
pub struct Band {
    pub warning: f32,
    pub critical: f32,
}

pub const CPU_BANDS: Band = Band {
    warning: 60.0,
    critical: 90.0,
};

pub const RAM_BANDS: Band = Band {
    warning: 70.0,
    critical: 95.0,
};

pub const DISK_BANDS: Band = Band {
    warning: 75.0,
    critical: 95.0,
};

const UPTIME_IMPACT: u32 = 5;

/// The metrics the analyzer consumes, as displayed for one entity.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceMetrics {
    pub cpu: f32,
    pub ram: f32,
    pub disk: f32,
    pub uptime: String,
}

impl ResourceMetrics {
    pub fn from_snapshot(snapshot: &SystemSnapshot) -> Self {
        Self {
            cpu: snapshot.cpu_percent,
            ram: snapshot.memory.percent,
            disk: snapshot.disk.percent,
            uptime: snapshot.uptime.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: Severity,
    pub score: u8,
    pub issues: Vec<String>,
    pub recommendations: Vec<String>,
    pub priority: Priority,
}

/// One triggered rule: what to report and how much it costs.
struct Finding {
    severity: Severity,
    issue: String,
    recommendations: &'static [&'static str],
    impact: u32,
}

pub fn analyze(metrics: &ResourceMetrics) -> HealthReport {
    // A faulty probe must never push a score past its bounds.
    let cpu = metrics.cpu.clamp(0.0, 100.0);
    let ram = metrics.ram.clamp(0.0, 100.0);
    let disk = metrics.disk.clamp(0.0, 100.0);

    let mut issues = Vec::new();
    let mut recommendations = Vec::new();
    let mut total_impact = 0u32;
    let mut status = Severity::Healthy;

    for finding in [check_cpu(cpu), check_ram(ram), check_disk(disk)]
        .into_iter()
        .flatten()
    {
        issues.push(finding.issue);
        recommendations.extend(finding.recommendations.iter().map(|r| r.to_string()));
        total_impact += finding.impact;
        status = status.max(finding.severity);
    }

    // Uptime affects score and recommendations only, never the status.
    if let Some(finding) = check_uptime(&metrics.uptime) {
        issues.push(finding.issue);
        recommendations.extend(finding.recommendations.iter().map(|r| r.to_string()));
        total_impact += finding.impact;
    }

    recommendations.extend(composite_recommendations(cpu, ram, disk));

    let priority = match status {
        Severity::Critical => Priority::Critical,
        Severity::Warning if issues.len() > 2 => Priority::High,
        Severity::Warning => Priority::Medium,
        Severity::Healthy => Priority::Low,
    };

    HealthReport {
        status,
        score: 100u32.saturating_sub(total_impact).min(100) as u8,
        issues,
        recommendations,
        priority,
    }
}

fn check_cpu(cpu: f32) -> Option<Finding> {
    if cpu >= CPU_BANDS.critical {
        Some(Finding {
            severity: Severity::Critical,
            issue: format!("CPU usage critically high ({cpu:.1}%)"),
            recommendations: &[
                "Identify and terminate resource-heavy processes",
                "Consider vertical scaling (add more CPU cores)",
                "Implement CPU throttling for non-critical services",
            ],
            impact: 40,
        })
    } else if cpu >= CPU_BANDS.warning {
        Some(Finding {
            severity: Severity::Warning,
            issue: format!("CPU usage elevated ({cpu:.1}%)"),
            recommendations: &[
                "Monitor CPU-intensive processes",
                "Consider load balancing",
                "Schedule maintenance during low-usage periods",
            ],
            impact: 20,
        })
    } else {
        None
    }
}

fn check_ram(ram: f32) -> Option<Finding> {
    if ram >= RAM_BANDS.critical {
        Some(Finding {
            severity: Severity::Critical,
            issue: format!("Memory usage critically high ({ram:.1}%)"),
            recommendations: &[
                "Clear memory caches and buffers",
                "Restart memory-leaking applications",
                "Add more RAM or enable swap space",
                "Implement memory optimization",
            ],
            impact: 35,
        })
    } else if ram >= RAM_BANDS.warning {
        Some(Finding {
            severity: Severity::Warning,
            issue: format!("Memory usage high ({ram:.1}%)"),
            recommendations: &[
                "Monitor memory-intensive applications",
                "Clear temporary files and caches",
                "Consider memory optimization",
            ],
            impact: 15,
        })
    } else {
        None
    }
}

fn check_disk(disk: f32) -> Option<Finding> {
    if disk >= DISK_BANDS.critical {
        Some(Finding {
            severity: Severity::Critical,
            issue: format!("Disk space critically low ({disk:.1}%)"),
            recommendations: &[
                "Clean up temporary files and logs",
                "Archive or delete old data",
                "Add additional storage",
                "Implement disk cleanup automation",
            ],
            impact: 30,
        })
    } else if disk >= DISK_BANDS.warning {
        Some(Finding {
            severity: Severity::Warning,
            issue: format!("Disk space running low ({disk:.1}%)"),
            recommendations: &[
                "Clean up unnecessary files",
                "Monitor disk usage trends",
                "Plan for storage expansion",
            ],
            impact: 10,
        })
    } else {
        None
    }
}

fn check_uptime(uptime: &str) -> Option<Finding> {
    if parse_uptime_days(uptime) < 1 {
        Some(Finding {
            severity: Severity::Warning,
            issue: format!("Recently restarted ({uptime})"),
            recommendations: &[
                "Monitor for stability issues",
                "Check system logs for crash causes",
                "Verify all services started correctly",
            ],
            impact: UPTIME_IMPACT,
        })
    } else {
        None
    }
}

/// Cross-metric patterns. Recommendations only, no score effect; duplicates
/// against the per-metric sets are kept.
fn composite_recommendations(cpu: f32, ram: f32, disk: f32) -> Vec<String> {
    let mut recommendations = Vec::new();

    if cpu > 70.0 && ram > 70.0 {
        recommendations
            .push("System under heavy load - consider load balancing or scaling".to_string());
    }

    if cpu < 30.0 && ram > 80.0 {
        recommendations.push("Memory-heavy workload detected - optimize memory usage".to_string());
    }

    if cpu > 80.0 && ram < 50.0 {
        recommendations.push("CPU-intensive workload - consider CPU optimization".to_string());
    }

    if disk > 90.0 && (cpu > 70.0 || ram > 70.0) {
        recommendations.push("Storage constraints may be affecting performance".to_string());
    }

    recommendations
}

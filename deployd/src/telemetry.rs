//! Service health reporting

use std::time::Instant;

use serde::Serialize;
use sysinfo::{ProcessesToUpdate, System};

/// Health status reported by the health endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HealthStatus {
    Up,
    Degraded,
}

/// Snapshot returned by the health endpoint
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub service: String,
    pub timestamp: String,
    pub details: HealthDetails,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthDetails {
    pub uptime: String,
    pub process: ProcessHealth,
    pub system: SystemHealth,
    pub environment: EnvironmentHealth,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessHealth {
    pub pid: u32,
    pub memory_rss_mb: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SystemHealth {
    pub platform: &'static str,
    pub load_average: [f64; 3],
    pub free_memory_mb: u64,
    pub total_memory_mb: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct EnvironmentHealth {
    pub port: u16,
}

/// Collect a health snapshot for the running service
pub fn collect_health(service_name: &str, port: u16, started_at: Instant) -> HealthReport {
    let mut sys = System::new();
    sys.refresh_memory();

    let pid = sysinfo::get_current_pid().ok();
    if let Some(pid) = pid {
        sys.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
    }
    let rss = pid
        .and_then(|pid| sys.process(pid))
        .map(|p| p.memory())
        .unwrap_or(0);

    let load = System::load_average();

    HealthReport {
        status: memory_status(sys.free_memory(), sys.total_memory()),
        service: service_name.to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        details: HealthDetails {
            uptime: format_uptime(started_at.elapsed().as_secs()),
            process: ProcessHealth {
                pid: std::process::id(),
                memory_rss_mb: rss / 1024 / 1024,
            },
            system: SystemHealth {
                platform: std::env::consts::OS,
                load_average: [load.one, load.five, load.fifteen],
                free_memory_mb: sys.free_memory() / 1024 / 1024,
                total_memory_mb: sys.total_memory() / 1024 / 1024,
            },
            environment: EnvironmentHealth { port },
        },
    }
}

/// DEGRADED when less than 10% of system memory is free
pub fn memory_status(free: u64, total: u64) -> HealthStatus {
    if total > 0 && (free as f64 / total as f64) < 0.1 {
        HealthStatus::Degraded
    } else {
        HealthStatus::Up
    }
}

/// Render seconds as `1d 2h 3m 4s`
pub fn format_uptime(total_seconds: u64) -> String {
    let days = total_seconds / (24 * 3600);
    let hours = (total_seconds % (24 * 3600)) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    format!("{}d {}h {}m {}s", days, hours, minutes, seconds)
}

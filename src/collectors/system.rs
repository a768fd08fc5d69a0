use crate::collectors::ResourceSnapshot;
use std::path::Path;
use std::time::Duration;
use sysinfo::{CpuExt, DiskExt, NetworkExt, NetworksExt, System, SystemExt};
use thiserror::Error;

/// Window between the two CPU refreshes of one sample. Usage figures are
/// deltas, so a single instantaneous refresh carries no information.
pub const CPU_SAMPLE_WINDOW: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum SampleError {
    #[error("memory counters unavailable (total memory reported as 0)")]
    MemoryUnavailable,
    #[error("disk mount point '{0}' not found")]
    DiskNotFound(String),
}

pub async fn sample(system: &mut System, disk_path: &str) -> Result<ResourceSnapshot, SampleError> {
    system.refresh_cpu();
    tokio::time::sleep(CPU_SAMPLE_WINDOW).await;
    system.refresh_cpu();
    system.refresh_memory();
    system.refresh_disks_list();
    system.refresh_disks();
    system.refresh_networks_list();
    system.refresh_networks();

    let cpu_percent = if system.cpus().is_empty() {
        0.0
    } else {
        let sum: f32 = system.cpus().iter().map(|c| c.cpu_usage()).sum();
        (sum / system.cpus().len() as f32) as f64
    };

    let memory_total = system.total_memory();
    if memory_total == 0 {
        return Err(SampleError::MemoryUnavailable);
    }
    let memory_percent = (system.used_memory() as f64 / memory_total as f64) * 100.0;

    let disk = system
        .disks()
        .iter()
        .find(|d| d.mount_point() == Path::new(disk_path))
        .ok_or_else(|| SampleError::DiskNotFound(disk_path.to_string()))?;
    let disk_percent = if disk.total_space() > 0 {
        let used = disk.total_space().saturating_sub(disk.available_space());
        (used as f64 / disk.total_space() as f64) * 100.0
    } else {
        0.0
    };

    let mut net_bytes_sent = 0_u64;
    let mut net_bytes_recv = 0_u64;
    for (_iface, data) in system.networks().iter() {
        net_bytes_sent = net_bytes_sent.saturating_add(data.total_transmitted());
        net_bytes_recv = net_bytes_recv.saturating_add(data.total_received());
    }

    Ok(ResourceSnapshot {
        cpu_percent,
        memory_percent,
        disk_percent,
        net_bytes_sent,
        net_bytes_recv,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_mount_point_is_an_error() {
        let mut system = System::new_all();
        let result = sample(&mut system, "/definitely/not/a/mount").await;
        assert!(matches!(result, Err(SampleError::DiskNotFound(_))));
    }
}

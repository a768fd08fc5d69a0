pub mod system;

/// One cycle's worth of resource counters. Percent values are already
/// derived; the network counters stay cumulative so the rate calculator can
/// diff them against the previous cycle.
#[derive(Debug, Clone, Copy)]
pub struct ResourceSnapshot {
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub disk_percent: f64,
    pub net_bytes_sent: u64,
    pub net_bytes_recv: u64,
}

// src/utils/system.rs: System functions

use std::time::Duration;

use sysinfo::{CpuRefreshKind, RefreshKind, System};
use tokio::time::sleep;


/// Determines number of physical cores and the current CPU load
///
/// # Returns
///
/// (usize, f32) physical cores, current cpu usage in percent
pub async fn detect_cores_and_load() -> (usize, f32) {
    let refresh_kind = RefreshKind::nothing().with_cpu(Default::default());
    let mut system = System::new_with_specifics(refresh_kind);
    system.refresh_cpu_all();
    let physical_cores = System::physical_core_count().unwrap_or(1);
    sleep(Duration::from_millis(100)).await;
    system.refresh_cpu_specifics(CpuRefreshKind::nothing().with_cpu_usage());
    let cpu_load = system.global_cpu_usage();
    (physical_cores, cpu_load)
}


/// Computes how many tool invocations of one stage may run side by side.
///
/// # Arguments
///
/// * `physical_cores` - Number of real cores on the system
/// * `cpu_load` - Estimate of load on CPU from detect_cores_and_load
/// * `threads` - Threads each invocation is given
///
/// # Returns
///
/// usize at least 1
pub fn compute_max_jobs(physical_cores: usize, cpu_load: f32, threads: usize) -> usize {
    let available = if cpu_load > 50.0 { physical_cores / 2 } else { physical_cores };
    (available / threads.max(1)).max(1)
}

//! Composite health score.
//!
//! The score starts from the share of healthy probes and loses points for CPU
//! and memory pressure. Disk usage is reported but never penalized.

use super::metrics::SystemMetrics;
use super::models::{HealthStatus, ProbeResult};

const HEALTHY_THRESHOLD: u8 = 80;
const DEGRADED_THRESHOLD: u8 = 50;

/// Percentage of healthy probes, rounded half-up. An empty set scores 100.
pub fn base_score(healthy: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    let healthy = healthy.min(total);
    ((200 * healthy + total) / (2 * total)) as u8
}

/// -20 above 90%, -10 above 80%, nothing otherwise.
pub fn pressure_penalty(percent: f64) -> i32 {
    if percent > 90.0 {
        20
    } else if percent > 80.0 {
        10
    } else {
        0
    }
}

pub fn overall_score(components: &[ProbeResult], metrics: &SystemMetrics) -> u8 {
    let healthy = components.iter().filter(|c| c.is_healthy()).count();
    let score = i32::from(base_score(healthy, components.len()))
        - pressure_penalty(metrics.cpu_percent)
        - pressure_penalty(metrics.memory_percent);

    score.clamp(0, 100) as u8
}

impl HealthStatus {
    pub fn from_score(score: u8) -> Self {
        if score >= HEALTHY_THRESHOLD {
            HealthStatus::Healthy
        } else if score >= DEGRADED_THRESHOLD {
            HealthStatus::Degraded
        } else {
            HealthStatus::Unhealthy
        }
    }
}

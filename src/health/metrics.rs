use async_trait::async_trait;
use prometheus::core::Collector;
use prometheus::{Encoder, Gauge, Opts, TextEncoder};
use serde::Serialize;
use std::sync::{Arc, Mutex};
use sysinfo::{Disks, System};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct LoadAverage {
    pub one: f64,
    pub five: f64,
    pub fifteen: f64,
}

/// Point-in-time resource usage of the host.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SystemMetrics {
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub memory_available_bytes: u64,
    pub disk_percent: f64,
    pub disk_free_bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub load_average: Option<LoadAverage>,
}

impl SystemMetrics {
    /// Text exposition of the snapshot: a HELP/TYPE/value block per gauge,
    /// blocks separated by a blank line.
    pub fn render_exposition(&self) -> Result<String, prometheus::Error> {
        let gauges = [
            (
                "system_cpu_percent",
                "CPU usage percentage",
                self.cpu_percent,
            ),
            (
                "system_memory_percent",
                "Memory usage percentage",
                self.memory_percent,
            ),
            (
                "system_disk_percent",
                "Disk usage percentage",
                self.disk_percent,
            ),
        ];

        let encoder = TextEncoder::new();
        let mut blocks = Vec::with_capacity(gauges.len());
        for (name, help, value) in gauges {
            let gauge = Gauge::with_opts(Opts::new(name, help))?;
            gauge.set(value);

            let mut buffer = Vec::new();
            encoder.encode(&gauge.collect(), &mut buffer)?;
            blocks.push(String::from_utf8_lossy(&buffer).into_owned());
        }

        Ok(blocks.join("\n"))
    }
}

/// Where the aggregator reads host metrics from.
#[async_trait]
pub trait MetricsSource: Send + Sync {
    async fn capture(&self) -> SystemMetrics;
}

/// Reads the host through `sysinfo`.
///
/// One `System` lives as long as the source. CPU usage is the delta since the
/// previous refresh, so only the very first capture after startup can read 0.
#[derive(Clone)]
pub struct SysinfoMetrics {
    system: Arc<Mutex<System>>,
}

impl SysinfoMetrics {
    pub fn new() -> Self {
        let mut system = System::new();
        system.refresh_cpu();
        Self {
            system: Arc::new(Mutex::new(system)),
        }
    }
}

impl Default for SysinfoMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MetricsSource for SysinfoMetrics {
    #[tracing::instrument(name = "Capture system metrics", skip(self))]
    async fn capture(&self) -> SystemMetrics {
        let system = self.system.clone();
        // disk enumeration and /proc reads block
        match tokio::task::spawn_blocking(move || read_host(&system)).await {
            Ok(metrics) => metrics,
            Err(err) => {
                tracing::warn!("System metrics capture failed: {:?}", err);
                SystemMetrics::default()
            }
        }
    }
}

fn read_host(system: &Mutex<System>) -> SystemMetrics {
    let (cpu_percent, total_memory, memory_available_bytes) = {
        let mut sys = system.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        sys.refresh_cpu();
        sys.refresh_memory();
        (
            f64::from(sys.global_cpu_info().cpu_usage()),
            sys.total_memory(),
            sys.available_memory(),
        )
    };
    let memory_percent = used_percent(total_memory, memory_available_bytes);

    let disks = Disks::new_with_refreshed_list();
    let root = disks
        .list()
        .iter()
        .find(|disk| disk.mount_point() == std::path::Path::new("/"))
        .or_else(|| disks.list().first());
    let (disk_total, disk_free_bytes) = root
        .map(|disk| (disk.total_space(), disk.available_space()))
        .unwrap_or((0, 0));
    let disk_percent = used_percent(disk_total, disk_free_bytes);

    let load_average = if cfg!(unix) {
        let load = System::load_average();
        Some(LoadAverage {
            one: load.one,
            five: load.five,
            fifteen: load.fifteen,
        })
    } else {
        None
    };

    SystemMetrics {
        cpu_percent,
        memory_percent,
        memory_available_bytes,
        disk_percent,
        disk_free_bytes,
        load_average,
    }
}

/// A fixed snapshot, handy when the host should not influence the score.
#[derive(Debug, Clone, Default)]
pub struct StaticMetrics(pub SystemMetrics);

#[async_trait]
impl MetricsSource for StaticMetrics {
    async fn capture(&self) -> SystemMetrics {
        self.0.clone()
    }
}

fn used_percent(total: u64, free: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let used = total.saturating_sub(free);
    used as f64 / total as f64 * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exposition_has_one_block_per_gauge() {
        let metrics = SystemMetrics {
            cpu_percent: 12.5,
            memory_percent: 40.0,
            disk_percent: 71.25,
            ..SystemMetrics::default()
        };

        let text = metrics.render_exposition().unwrap();
        let blocks: Vec<&str> = text.split("\n\n").collect();
        assert_eq!(blocks.len(), 3);

        assert!(blocks[0].starts_with("# HELP system_cpu_percent CPU usage percentage"));
        assert!(blocks[0].contains("# TYPE system_cpu_percent gauge"));
        assert!(blocks[0].contains("system_cpu_percent 12.5"));
        assert!(blocks[1].contains("system_memory_percent 40"));
        assert!(blocks[2].contains("system_disk_percent 71.25"));
    }

    #[test]
    fn used_percent_handles_empty_devices() {
        assert_eq!(used_percent(0, 0), 0.0);
        assert_eq!(used_percent(200, 50), 75.0);
        assert_eq!(used_percent(100, 150), 0.0);
    }

    #[tokio::test]
    async fn sysinfo_capture_stays_in_range() {
        let metrics = SysinfoMetrics::new().capture().await;
        assert!((0.0..=100.0).contains(&metrics.memory_percent));
        assert!((0.0..=100.0).contains(&metrics.disk_percent));
        assert!(metrics.cpu_percent >= 0.0);
    }

    #[tokio::test]
    async fn repeated_captures_share_one_system() {
        let source = SysinfoMetrics::new();
        let copy = source.clone();
        assert!(Arc::ptr_eq(&source.system, &copy.system));

        source.capture().await;
        let started = std::time::Instant::now();
        let metrics = copy.capture().await;

        assert!(started.elapsed() < sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
        assert!((0.0..=100.0).contains(&metrics.memory_percent));
    }
}

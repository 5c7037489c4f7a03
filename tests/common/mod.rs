#![allow(dead_code)]

use async_trait::async_trait;
use sentinel::health::{
    HealthAggregator, Probe, ProbeError, ProbeRegistry, ProbeResult, StaticMetrics, SystemMetrics,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub struct TestApp {
    pub address: String,
}

pub fn metrics(cpu: f64, memory: f64) -> SystemMetrics {
    SystemMetrics {
        cpu_percent: cpu,
        memory_percent: memory,
        memory_available_bytes: 4 * 1024 * 1024 * 1024,
        disk_percent: 42.0,
        disk_free_bytes: 100 * 1024 * 1024 * 1024,
        load_average: None,
    }
}

// we have to run server in another thread
pub async fn spawn_app(registry: ProbeRegistry, metrics: SystemMetrics) -> TestApp {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    let aggregator = HealthAggregator::new(Arc::new(registry), Arc::new(StaticMetrics(metrics)));
    let server = sentinel::startup::run(listener, aggregator).expect("Failed to bind address.");
    let _ = tokio::spawn(server);

    TestApp { address }
}

/// Probe with a fixed outcome that counts how often it ran.
pub struct FakeProbe {
    pub name: &'static str,
    pub healthy: bool,
    pub delay: Duration,
    pub calls: Arc<AtomicUsize>,
}

impl FakeProbe {
    pub fn up(name: &'static str) -> Self {
        Self::new(name, true)
    }

    pub fn down(name: &'static str) -> Self {
        Self::new(name, false)
    }

    fn new(name: &'static str, healthy: bool) -> Self {
        Self {
            name,
            healthy,
            delay: Duration::ZERO,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn counted_by(mut self, calls: &Arc<AtomicUsize>) -> Self {
        self.calls = calls.clone();
        self
    }
}

#[async_trait]
impl Probe for FakeProbe {
    fn name(&self) -> &str {
        self.name
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(2)
    }

    async fn check(&self) -> ProbeResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        if self.healthy {
            ProbeResult::healthy(self.name, self.delay.as_millis() as u64)
        } else {
            ProbeResult::unhealthy(
                self.name,
                self.delay.as_millis() as u64,
                ProbeError::execution("connection refused"),
            )
        }
    }
}

use super::models::ProbeResult;
use async_trait::async_trait;
use std::time::{Duration, Instant};

/// A check against one dependency.
///
/// `check` must not fail: every error is reported through the returned
/// [`ProbeResult`]. Implementations should also respect [`Probe::timeout`];
/// the aggregator enforces it regardless.
#[async_trait]
pub trait Probe: Send + Sync {
    fn name(&self) -> &str;

    fn timeout(&self) -> Duration;

    async fn check(&self) -> ProbeResult;
}

/// Measures the wall-clock time of a check from the moment it starts.
#[derive(Debug, Clone, Copy)]
pub struct ProbeTimer(Instant);

impl ProbeTimer {
    pub fn start() -> Self {
        Self(Instant::now())
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.0.elapsed().as_millis() as u64
    }
}

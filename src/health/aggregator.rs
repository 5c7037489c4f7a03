use super::errors::ProbeError;
use super::metrics::{MetricsSource, SystemMetrics};
use super::models::{HealthCheckResponse, ProbeResult};
use super::probe::ProbeTimer;
use super::registry::{ProbeRegistry, RegisteredProbe};
use futures::future::join_all;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::timeout;

/// Runs the registered probes and folds their results into one response.
///
/// Holds no per-request state: concurrent calls to [`aggregate`] share only
/// the immutable registry.
///
/// [`aggregate`]: HealthAggregator::aggregate
#[derive(Clone)]
pub struct HealthAggregator {
    registry: Arc<ProbeRegistry>,
    metrics: Arc<dyn MetricsSource>,
    start_time: Instant,
}

impl HealthAggregator {
    pub fn new(registry: Arc<ProbeRegistry>, metrics: Arc<dyn MetricsSource>) -> Self {
        Self {
            registry,
            metrics,
            start_time: Instant::now(),
        }
    }

    pub fn registry(&self) -> &Arc<ProbeRegistry> {
        &self.registry
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub async fn system_metrics(&self) -> SystemMetrics {
        self.metrics.capture().await
    }

    /// Probes every dependency concurrently and scores the outcome. Never
    /// fails: broken dependencies only lower the score.
    #[tracing::instrument(name = "Aggregate health", skip(self), fields(probes = self.registry.len()))]
    pub async fn aggregate(&self) -> HealthCheckResponse {
        let (system_metrics, components) =
            tokio::join!(self.metrics.capture(), self.run(self.registry.probes().iter()));

        let response =
            HealthCheckResponse::new(self.uptime_seconds(), system_metrics, components);
        tracing::info!(
            score = response.overall_health_score(),
            status = ?response.status(),
            "Health aggregated"
        );
        response
    }

    /// Minimal response for the fast path: metrics only, nothing probed.
    pub async fn summary(&self) -> HealthCheckResponse {
        HealthCheckResponse::minimal(self.uptime_seconds(), self.metrics.capture().await)
    }

    /// Runs `entries` concurrently. Output order follows input order no
    /// matter which probe finishes first.
    ///
    /// Every probe is cut off at its own timeout and all of them run at once,
    /// so a round never outlasts [`ProbeRegistry::max_timeout`].
    pub async fn run<'a, I>(&self, entries: I) -> Vec<ProbeResult>
    where
        I: IntoIterator<Item = &'a RegisteredProbe>,
    {
        join_all(entries.into_iter().map(run_bounded)).await
    }
}

/// Cuts a probe off at its own timeout, even if the probe ignores it.
async fn run_bounded(entry: &RegisteredProbe) -> ProbeResult {
    let timer = ProbeTimer::start();

    match timeout(entry.probe.timeout(), entry.probe.check()).await {
        Ok(result) => result,
        Err(_) => {
            let elapsed = timer.elapsed_ms();
            tracing::warn!(probe = entry.name(), "Health probe timed out after {} ms", elapsed);
            ProbeResult::unhealthy(entry.name(), elapsed, ProbeError::timeout(elapsed))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::errors::ProbeErrorKind;
    use crate::health::metrics::StaticMetrics;
    use crate::health::models::{HealthStatus, ProbeStatus};
    use crate::health::probe::Probe;
    use async_trait::async_trait;
    use std::time::Duration;

    struct FakeProbe {
        name: &'static str,
        healthy: bool,
        delay: Duration,
        timeout: Duration,
    }

    impl FakeProbe {
        fn new(name: &'static str, healthy: bool) -> Self {
            Self {
                name,
                healthy,
                delay: Duration::ZERO,
                timeout: Duration::from_secs(1),
            }
        }

        fn delayed(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        fn with_timeout(mut self, timeout: Duration) -> Self {
            self.timeout = timeout;
            self
        }
    }

    #[async_trait]
    impl Probe for FakeProbe {
        fn name(&self) -> &str {
            self.name
        }

        fn timeout(&self) -> Duration {
            self.timeout
        }

        async fn check(&self) -> ProbeResult {
            let timer = ProbeTimer::start();
            tokio::time::sleep(self.delay).await;
            if self.healthy {
                ProbeResult::healthy(self.name, timer.elapsed_ms())
            } else {
                ProbeResult::unhealthy(self.name, timer.elapsed_ms(), ProbeError::execution("down"))
            }
        }
    }

    fn aggregator(probes: Vec<(FakeProbe, bool)>, cpu: f64, memory: f64) -> HealthAggregator {
        let mut builder = ProbeRegistry::builder();
        for (probe, critical) in probes {
            builder = builder.register(probe, critical).unwrap();
        }
        let metrics = SystemMetrics {
            cpu_percent: cpu,
            memory_percent: memory,
            ..SystemMetrics::default()
        };
        HealthAggregator::new(Arc::new(builder.build()), Arc::new(StaticMetrics(metrics)))
    }

    #[tokio::test]
    async fn components_follow_registration_order() {
        let aggregator = aggregator(
            vec![
                (FakeProbe::new("slow", true).delayed(Duration::from_millis(120)), false),
                (FakeProbe::new("medium", true).delayed(Duration::from_millis(60)), false),
                (FakeProbe::new("fast", true), false),
            ],
            10.0,
            10.0,
        );

        let response = aggregator.aggregate().await;
        let names: Vec<&str> = response.components().iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["slow", "medium", "fast"]);
    }

    #[tokio::test]
    async fn probes_run_concurrently() {
        let aggregator = aggregator(
            (0..4)
                .map(|i| {
                    let name: &'static str = ["a", "b", "c", "d"][i];
                    (FakeProbe::new(name, true).delayed(Duration::from_millis(200)), false)
                })
                .collect(),
            10.0,
            10.0,
        );

        let started = Instant::now();
        aggregator.aggregate().await;
        assert!(started.elapsed() < Duration::from_millis(700));
    }

    #[tokio::test]
    async fn database_up_cache_down_is_degraded() {
        let aggregator = aggregator(
            vec![
                (FakeProbe::new("database", true), true),
                (FakeProbe::new("cache", false), false),
            ],
            50.0,
            50.0,
        );

        let response = aggregator.aggregate().await;
        assert_eq!(response.overall_health_score(), 50);
        assert_eq!(response.status(), HealthStatus::Degraded);
    }

    #[tokio::test]
    async fn cpu_pressure_at_boundary_stays_healthy() {
        let aggregator = aggregator(
            vec![
                (FakeProbe::new("database", true), true),
                (FakeProbe::new("cache", true), false),
            ],
            95.0,
            10.0,
        );

        let response = aggregator.aggregate().await;
        assert_eq!(response.overall_health_score(), 80);
        assert_eq!(response.status(), HealthStatus::Healthy);
    }

    #[tokio::test]
    async fn empty_registry_is_healthy() {
        let aggregator = aggregator(vec![], 10.0, 10.0);

        let response = aggregator.aggregate().await;
        assert!(response.components().is_empty());
        assert_eq!(response.overall_health_score(), 100);
        assert_eq!(response.status(), HealthStatus::Healthy);
    }

    #[tokio::test]
    async fn stuck_probe_is_cut_off_at_its_timeout() {
        let aggregator = aggregator(
            vec![
                (
                    FakeProbe::new("stuck", true)
                        .delayed(Duration::from_secs(30))
                        .with_timeout(Duration::from_millis(50)),
                    false,
                ),
                (FakeProbe::new("database", true).with_timeout(Duration::from_millis(100)), true),
            ],
            10.0,
            10.0,
        );

        let started = Instant::now();
        let response = aggregator.aggregate().await;
        assert!(started.elapsed() < Duration::from_secs(5));

        let stuck = &response.components()[0];
        assert_eq!(stuck.status(), ProbeStatus::Unhealthy);
        assert_eq!(stuck.error().map(|e| e.kind), Some(ProbeErrorKind::AggregationTimeout));
        assert!(stuck.response_time_ms() >= 50);
        assert!(response.components()[1].is_healthy());
    }

    #[tokio::test]
    async fn round_is_bounded_by_the_largest_timeout() {
        let aggregator = aggregator(
            vec![
                (
                    FakeProbe::new("a", true)
                        .delayed(Duration::from_secs(30))
                        .with_timeout(Duration::from_millis(100)),
                    false,
                ),
                (
                    FakeProbe::new("b", true)
                        .delayed(Duration::from_secs(30))
                        .with_timeout(Duration::from_millis(300)),
                    true,
                ),
                (
                    FakeProbe::new("c", true)
                        .delayed(Duration::from_secs(30))
                        .with_timeout(Duration::from_millis(200)),
                    false,
                ),
            ],
            10.0,
            10.0,
        );
        assert_eq!(aggregator.registry().max_timeout(), Duration::from_millis(300));

        let started = Instant::now();
        let response = aggregator.aggregate().await;
        let elapsed = started.elapsed();

        assert!(elapsed >= Duration::from_millis(300));
        assert!(elapsed < Duration::from_millis(900));
        assert!(response
            .components()
            .iter()
            .all(|c| c.error().map(|e| e.kind) == Some(ProbeErrorKind::AggregationTimeout)));
        assert_eq!(response.overall_health_score(), 0);
    }

    #[tokio::test]
    async fn error_is_set_iff_not_healthy() {
        let aggregator = aggregator(
            vec![
                (FakeProbe::new("a", true), false),
                (FakeProbe::new("b", false), false),
                (FakeProbe::new("c", true), true),
            ],
            10.0,
            10.0,
        );

        for component in aggregator.aggregate().await.components() {
            assert_eq!(component.error().is_some(), !component.is_healthy());
        }
    }

    #[tokio::test]
    async fn summary_skips_probes() {
        let aggregator = aggregator(vec![(FakeProbe::new("database", false), true)], 95.0, 95.0);

        let response = aggregator.summary().await;
        assert!(response.components().is_empty());
        assert_eq!(response.overall_health_score(), 100);
    }
}

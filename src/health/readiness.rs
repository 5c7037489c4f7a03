use super::aggregator::HealthAggregator;
use super::errors::NotReady;
use super::models::{LivenessResponse, ProbeResult, ReadinessResponse};
use super::registry::ProbeRegistry;

/// Ready iff every critical probe is healthy. Non-critical probes and the
/// composite score are ignored.
#[derive(Clone)]
pub struct ReadinessPolicy {
    aggregator: HealthAggregator,
}

impl ReadinessPolicy {
    pub fn new(aggregator: HealthAggregator) -> Self {
        Self { aggregator }
    }

    /// Runs only the critical probes.
    #[tracing::instrument(name = "Check readiness", skip(self))]
    pub async fn check(&self) -> Result<ReadinessResponse, NotReady> {
        let registry = self.aggregator.registry();
        let results = self.aggregator.run(registry.critical()).await;

        Self::evaluate(registry, &results).map_err(|err| {
            tracing::warn!(failing = ?err.failing, "Readiness check failed");
            err
        })
    }

    pub async fn is_ready(&self) -> bool {
        self.check().await.is_ok()
    }

    /// Decides readiness from results that were already collected, e.g. by a
    /// full aggregation. A critical probe with no result counts as failing.
    pub fn evaluate(
        registry: &ProbeRegistry,
        results: &[ProbeResult],
    ) -> Result<ReadinessResponse, NotReady> {
        let failing: Vec<String> = registry
            .critical()
            .filter(|entry| {
                !results
                    .iter()
                    .any(|result| result.name() == entry.name() && result.is_healthy())
            })
            .map(|entry| entry.name().to_string())
            .collect();

        if failing.is_empty() {
            Ok(ReadinessResponse::ready())
        } else {
            Err(NotReady { failing })
        }
    }
}

/// Dependency-free: a process that can run this can answer.
pub fn liveness() -> LivenessResponse {
    LivenessResponse::alive()
}

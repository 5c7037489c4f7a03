use super::errors::ProbeError;
use super::metrics::SystemMetrics;
use super::scoring;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProbeStatus {
    Healthy,
    Unhealthy,
    Unknown,
}

/// Outcome of a single dependency check.
///
/// Only the constructors can build one, so `error` is present exactly when
/// `status` is not `Healthy`.
#[derive(Debug, Clone, Serialize)]
pub struct ProbeResult {
    name: String,
    status: ProbeStatus,
    response_time_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ProbeError>,
    metadata: BTreeMap<String, serde_json::Value>,
}

impl ProbeResult {
    pub fn healthy(name: impl Into<String>, response_time_ms: u64) -> Self {
        Self {
            name: name.into(),
            status: ProbeStatus::Healthy,
            response_time_ms,
            error: None,
            metadata: BTreeMap::new(),
        }
    }

    pub fn unhealthy(name: impl Into<String>, response_time_ms: u64, error: ProbeError) -> Self {
        Self {
            name: name.into(),
            status: ProbeStatus::Unhealthy,
            response_time_ms,
            error: Some(error),
            metadata: BTreeMap::new(),
        }
    }

    /// The probe could not run at all.
    pub fn unknown(name: impl Into<String>, error: ProbeError) -> Self {
        Self {
            name: name.into(),
            status: ProbeStatus::Unknown,
            response_time_ms: 0,
            error: Some(error),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status(&self) -> ProbeStatus {
        self.status
    }

    pub fn is_healthy(&self) -> bool {
        self.status == ProbeStatus::Healthy
    }

    pub fn response_time_ms(&self) -> u64 {
        self.response_time_ms
    }

    pub fn error(&self) -> Option<&ProbeError> {
        self.error.as_ref()
    }

    pub fn metadata(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.metadata
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthCheckResponse {
    status: HealthStatus,
    pub timestamp: DateTime<Utc>,
    pub version: String,
    pub uptime_seconds: u64,
    pub system_metrics: SystemMetrics,
    components: Vec<ProbeResult>,
    overall_health_score: u8,
}

impl HealthCheckResponse {
    /// Scores `components` against `system_metrics`; `status` follows the score.
    pub fn new(uptime_seconds: u64, system_metrics: SystemMetrics, components: Vec<ProbeResult>) -> Self {
        let score = scoring::overall_score(&components, &system_metrics);
        Self::with_score(uptime_seconds, system_metrics, components, score)
    }

    /// Fast-path response: nothing probed, fixed score of 100.
    pub fn minimal(uptime_seconds: u64, system_metrics: SystemMetrics) -> Self {
        Self::with_score(uptime_seconds, system_metrics, Vec::new(), 100)
    }

    fn with_score(
        uptime_seconds: u64,
        system_metrics: SystemMetrics,
        components: Vec<ProbeResult>,
        score: u8,
    ) -> Self {
        Self {
            status: HealthStatus::from_score(score),
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds,
            system_metrics,
            components,
            overall_health_score: score,
        }
    }

    pub fn status(&self) -> HealthStatus {
        self.status
    }

    /// Probe results in registration order.
    pub fn components(&self) -> &[ProbeResult] {
        &self.components
    }

    pub fn overall_health_score(&self) -> u8 {
        self.overall_health_score
    }

    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Healthy
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReadinessResponse {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
}

impl ReadinessResponse {
    pub fn ready() -> Self {
        Self {
            status: "ready",
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LivenessResponse {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
}

impl LivenessResponse {
    pub fn alive() -> Self {
        Self {
            status: "alive",
            timestamp: Utc::now(),
        }
    }
}

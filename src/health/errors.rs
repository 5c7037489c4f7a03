use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use chrono::Utc;
use serde::Serialize;
use serde_json::json;

/// Failure classes a probe can report. None of them ever propagate out of the
/// aggregator: each one is folded into the probe's result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeErrorKind {
    /// Network or driver error while the check ran
    ProbeExecutionFailure,
    /// No target configured, so the probe never ran
    ConfigurationMissing,
    /// The check did not finish within its timeout
    AggregationTimeout,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{kind:?}: {message}")]
pub struct ProbeError {
    pub kind: ProbeErrorKind,
    pub message: String,
}

impl ProbeError {
    pub fn execution(message: impl Into<String>) -> Self {
        Self {
            kind: ProbeErrorKind::ProbeExecutionFailure,
            message: message.into(),
        }
    }

    pub fn configuration_missing(message: impl Into<String>) -> Self {
        Self {
            kind: ProbeErrorKind::ConfigurationMissing,
            message: message.into(),
        }
    }

    pub fn timeout(elapsed_ms: u64) -> Self {
        Self {
            kind: ProbeErrorKind::AggregationTimeout,
            message: format!("Timed out after {} ms", elapsed_ms),
        }
    }
}

/// Problems building the registry at startup.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("probe `{0}` is registered twice")]
    DuplicateProbe(String),
    #[error("invalid configuration for `{name}`: {reason}")]
    InvalidTarget { name: String, reason: String },
}

/// Returned by the readiness route when a critical dependency is down.
#[derive(Debug, thiserror::Error)]
#[error("Service not ready: {}", .failing.join(", "))]
pub struct NotReady {
    pub failing: Vec<String>,
}

impl ResponseError for NotReady {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({
            "status": "not_ready",
            "message": self.to_string(),
            "failing": self.failing,
            "timestamp": Utc::now(),
        }))
    }

    fn status_code(&self) -> StatusCode {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

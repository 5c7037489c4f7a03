mod aggregator;
mod checks;
mod errors;
mod metrics;
mod models;
mod probe;
mod readiness;
mod registry;
mod scoring;

pub use aggregator::HealthAggregator;
pub use checks::{CacheProbe, DatabaseProbe, HttpProbe, UnconfiguredProbe, SLOW_RESPONSE_THRESHOLD};
pub use errors::{NotReady, ProbeError, ProbeErrorKind, RegistryError};
pub use metrics::{LoadAverage, MetricsSource, StaticMetrics, SysinfoMetrics, SystemMetrics};
pub use models::{
    HealthCheckResponse, HealthStatus, LivenessResponse, ProbeResult, ProbeStatus,
    ReadinessResponse,
};
pub use probe::{Probe, ProbeTimer};
pub use readiness::{liveness, ReadinessPolicy};
pub use registry::{
    external_api_probe_name, ProbeRegistry, ProbeRegistryBuilder, RegisteredProbe, CACHE_PROBE,
    DATABASE_PROBE,
};
pub use scoring::{base_score, overall_score, pressure_penalty};

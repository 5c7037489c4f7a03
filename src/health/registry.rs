use super::checks::{CacheProbe, DatabaseProbe, HttpProbe, UnconfiguredProbe};
use super::errors::RegistryError;
use super::probe::Probe;
use crate::configuration::HealthSettings;
use std::sync::Arc;
use std::time::Duration;

pub const DATABASE_PROBE: &str = "database";
pub const CACHE_PROBE: &str = "cache";

pub fn external_api_probe_name(name: &str) -> String {
    format!("external-api:{}", name)
}

#[derive(Clone)]
pub struct RegisteredProbe {
    pub probe: Arc<dyn Probe>,
    pub critical: bool,
}

impl RegisteredProbe {
    pub fn name(&self) -> &str {
        self.probe.name()
    }
}

/// Probes in registration order. Built once at startup and never changed.
#[derive(Clone, Default)]
pub struct ProbeRegistry {
    probes: Vec<RegisteredProbe>,
}

impl ProbeRegistry {
    pub fn builder() -> ProbeRegistryBuilder {
        ProbeRegistryBuilder::default()
    }

    /// Turns settings into probes. The database and cache slots are always
    /// present; a slot without a target reports `unknown` instead of failing
    /// startup.
    pub fn from_settings(settings: &HealthSettings) -> Result<Self, RegistryError> {
        let default_timeout = Duration::from_secs(settings.default_timeout_secs);
        let slow_threshold = Duration::from_millis(settings.slow_response_threshold_ms);
        let mut builder = Self::builder();

        match &settings.database {
            Some(db) => {
                let timeout = db.timeout_secs.map_or(default_timeout, Duration::from_secs);
                let probe = DatabaseProbe::connect_lazy(DATABASE_PROBE, &db.url, timeout)
                    .map_err(|err| RegistryError::InvalidTarget {
                        name: DATABASE_PROBE.to_string(),
                        reason: err.to_string(),
                    })?
                    .with_slow_threshold(slow_threshold);
                builder = builder.register(probe, db.critical.unwrap_or(true))?;
            }
            None => {
                tracing::warn!("No database configured, its probe will report unknown");
                builder = builder.register(
                    UnconfiguredProbe::new(DATABASE_PROBE, "no database url configured"),
                    true,
                )?;
            }
        }

        match &settings.cache {
            Some(cache) => {
                let timeout = cache.timeout_secs.map_or(default_timeout, Duration::from_secs);
                let probe = CacheProbe::open(CACHE_PROBE, &cache.url, timeout)
                    .map_err(|err| RegistryError::InvalidTarget {
                        name: CACHE_PROBE.to_string(),
                        reason: err.to_string(),
                    })?
                    .with_slow_threshold(slow_threshold);
                builder = builder.register(probe, cache.critical.unwrap_or(false))?;
            }
            None => {
                tracing::warn!("No cache configured, its probe will report unknown");
                builder = builder.register(
                    UnconfiguredProbe::new(CACHE_PROBE, "no cache url configured"),
                    false,
                )?;
            }
        }

        for api in &settings.external_apis {
            let name = external_api_probe_name(&api.name);
            let timeout = api.timeout_secs.map_or(default_timeout, Duration::from_secs);
            let probe = HttpProbe::new(name.as_str(), api.url.as_str(), timeout)
                .map_err(|err| RegistryError::InvalidTarget {
                    name: name.clone(),
                    reason: err.to_string(),
                })?
                .with_slow_threshold(slow_threshold);
            builder = builder.register(probe, api.critical.unwrap_or(false))?;
        }

        Ok(builder.build())
    }

    pub fn probes(&self) -> &[RegisteredProbe] {
        &self.probes
    }

    pub fn critical(&self) -> impl Iterator<Item = &RegisteredProbe> {
        self.probes.iter().filter(|entry| entry.critical)
    }

    pub fn is_critical(&self, name: &str) -> bool {
        self.probes
            .iter()
            .any(|entry| entry.critical && entry.name() == name)
    }

    pub fn len(&self) -> usize {
        self.probes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.probes.is_empty()
    }

    /// Longest individual timeout; bounds a whole aggregation round.
    pub fn max_timeout(&self) -> Duration {
        self.probes
            .iter()
            .map(|entry| entry.probe.timeout())
            .max()
            .unwrap_or(Duration::ZERO)
    }
}

#[derive(Default)]
pub struct ProbeRegistryBuilder {
    probes: Vec<RegisteredProbe>,
}

impl ProbeRegistryBuilder {
    pub fn register(self, probe: impl Probe + 'static, critical: bool) -> Result<Self, RegistryError> {
        self.register_shared(Arc::new(probe), critical)
    }

    pub fn register_shared(
        mut self,
        probe: Arc<dyn Probe>,
        critical: bool,
    ) -> Result<Self, RegistryError> {
        if self.probes.iter().any(|entry| entry.name() == probe.name()) {
            return Err(RegistryError::DuplicateProbe(probe.name().to_string()));
        }
        tracing::debug!(probe = probe.name(), critical, "Registered health probe");
        self.probes.push(RegisteredProbe { probe, critical });
        Ok(self)
    }

    pub fn build(self) -> ProbeRegistry {
        ProbeRegistry {
            probes: self.probes,
        }
    }
}

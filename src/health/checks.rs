use super::errors::ProbeError;
use super::models::ProbeResult;
use super::probe::{Probe, ProbeTimer};
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;

pub const SLOW_RESPONSE_THRESHOLD: Duration = Duration::from_millis(1000);

const DATABASE_QUERY: &str = "SELECT 1 as health_check";

fn healthy_within(name: &str, elapsed_ms: u64, slow_threshold: Duration) -> ProbeResult {
    let result = ProbeResult::healthy(name, elapsed_ms);
    if u128::from(elapsed_ms) > slow_threshold.as_millis() {
        result.with_metadata("slow", true)
    } else {
        result
    }
}

/// Round-trips a trivial query through a Postgres pool.
pub struct DatabaseProbe {
    name: String,
    pool: PgPool,
    timeout: Duration,
    slow_threshold: Duration,
}

impl DatabaseProbe {
    pub fn new(name: impl Into<String>, pool: PgPool, timeout: Duration) -> Self {
        Self {
            name: name.into(),
            pool,
            timeout,
            slow_threshold: SLOW_RESPONSE_THRESHOLD,
        }
    }

    /// Builds a pool that only connects on first use, so startup does not
    /// depend on the database being up.
    pub fn connect_lazy(
        name: impl Into<String>,
        url: &str,
        timeout: Duration,
    ) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(2)
            .acquire_timeout(timeout)
            .connect_lazy(url)?;

        Ok(Self::new(name, pool, timeout))
    }

    pub fn with_slow_threshold(mut self, threshold: Duration) -> Self {
        self.slow_threshold = threshold;
        self
    }
}

#[async_trait]
impl Probe for DatabaseProbe {
    fn name(&self) -> &str {
        &self.name
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    #[tracing::instrument(name = "Check database health", skip(self), fields(probe = %self.name))]
    async fn check(&self) -> ProbeResult {
        let timer = ProbeTimer::start();

        match sqlx::query(DATABASE_QUERY).fetch_one(&self.pool).await {
            Ok(_) => {
                let pool_size = self.pool.size();
                let idle_connections = self.pool.num_idle();

                healthy_within(&self.name, timer.elapsed_ms(), self.slow_threshold)
                    .with_metadata("query", DATABASE_QUERY)
                    .with_metadata("pool_size", pool_size)
                    .with_metadata("idle_connections", idle_connections)
            }
            Err(sqlx::Error::PoolTimedOut) => {
                let elapsed = timer.elapsed_ms();
                tracing::warn!("Database health check timed out after {} ms", elapsed);
                ProbeResult::unhealthy(&self.name, elapsed, ProbeError::timeout(elapsed))
                    .with_metadata("query", DATABASE_QUERY)
            }
            Err(e) => {
                tracing::warn!("Database health check failed: {:?}", e);
                ProbeResult::unhealthy(
                    &self.name,
                    timer.elapsed_ms(),
                    ProbeError::execution(format!("Database error: {}", e)),
                )
                .with_metadata("query", DATABASE_QUERY)
            }
        }
    }
}

/// Sends `PING` to a Redis-compatible cache.
pub struct CacheProbe {
    name: String,
    client: redis::Client,
    timeout: Duration,
    slow_threshold: Duration,
}

impl CacheProbe {
    pub fn new(name: impl Into<String>, client: redis::Client, timeout: Duration) -> Self {
        Self {
            name: name.into(),
            client,
            timeout,
            slow_threshold: SLOW_RESPONSE_THRESHOLD,
        }
    }

    /// Parses the URL only; no connection is made until the first check.
    pub fn open(name: impl Into<String>, url: &str, timeout: Duration) -> redis::RedisResult<Self> {
        let client = redis::Client::open(url)?;
        Ok(Self::new(name, client, timeout))
    }

    pub fn with_slow_threshold(mut self, threshold: Duration) -> Self {
        self.slow_threshold = threshold;
        self
    }

    async fn ping(&self) -> redis::RedisResult<String> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let reply: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(reply)
    }
}

#[async_trait]
impl Probe for CacheProbe {
    fn name(&self) -> &str {
        &self.name
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    #[tracing::instrument(name = "Check cache health", skip(self), fields(probe = %self.name))]
    async fn check(&self) -> ProbeResult {
        let timer = ProbeTimer::start();

        // covers the connect as well as the PING round trip
        match tokio::time::timeout(self.timeout, self.ping()).await {
            Ok(Ok(reply)) if reply.eq_ignore_ascii_case("PONG") => {
                healthy_within(&self.name, timer.elapsed_ms(), self.slow_threshold)
                    .with_metadata("reply", reply)
            }
            Ok(Ok(reply)) => {
                tracing::warn!("Cache PING returned unexpected reply: {:?}", reply);
                ProbeResult::unhealthy(
                    &self.name,
                    timer.elapsed_ms(),
                    ProbeError::execution(format!("Unexpected PING reply: {}", reply)),
                )
                .with_metadata("reply", reply)
            }
            Ok(Err(e)) => {
                tracing::warn!("Cache health check failed: {:?}", e);
                let elapsed = timer.elapsed_ms();
                let error = if e.is_timeout() {
                    ProbeError::timeout(elapsed)
                } else {
                    ProbeError::execution(format!("Cache error: {}", e))
                };
                ProbeResult::unhealthy(&self.name, elapsed, error)
            }
            Err(_) => {
                let elapsed = timer.elapsed_ms();
                tracing::warn!("Cache health check timed out after {} ms", elapsed);
                ProbeResult::unhealthy(&self.name, elapsed, ProbeError::timeout(elapsed))
            }
        }
    }
}

/// Issues a GET and expects a 2xx answer.
pub struct HttpProbe {
    name: String,
    url: String,
    client: reqwest::Client,
    timeout: Duration,
    slow_threshold: Duration,
}

impl HttpProbe {
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(name, url, client, timeout))
    }

    /// Reuses an existing client. The per-request timeout is still applied.
    pub fn with_client(
        name: impl Into<String>,
        url: impl Into<String>,
        client: reqwest::Client,
        timeout: Duration,
    ) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            client,
            timeout,
            slow_threshold: SLOW_RESPONSE_THRESHOLD,
        }
    }

    pub fn with_slow_threshold(mut self, threshold: Duration) -> Self {
        self.slow_threshold = threshold;
        self
    }
}

#[async_trait]
impl Probe for HttpProbe {
    fn name(&self) -> &str {
        &self.name
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    #[tracing::instrument(name = "Check external API health", skip(self), fields(probe = %self.name))]
    async fn check(&self) -> ProbeResult {
        let timer = ProbeTimer::start();

        match self.client.get(&self.url).timeout(self.timeout).send().await {
            Ok(response) => {
                let elapsed = timer.elapsed_ms();
                let status = response.status();

                let result = if status.is_success() {
                    healthy_within(&self.name, elapsed, self.slow_threshold)
                } else {
                    tracing::warn!("{} returned status: {}", self.url, status);
                    ProbeResult::unhealthy(
                        &self.name,
                        elapsed,
                        ProbeError::execution(format!("{} returned status: {}", self.url, status)),
                    )
                };

                result
                    .with_metadata("url", self.url.as_str())
                    .with_metadata("status_code", status.as_u16())
            }
            Err(e) => {
                tracing::warn!("External API health check failed: {:?}", e);
                let elapsed = timer.elapsed_ms();
                let error = if e.is_timeout() {
                    ProbeError::timeout(elapsed)
                } else {
                    ProbeError::execution(format!("HTTP error: {}", e))
                };
                ProbeResult::unhealthy(&self.name, elapsed, error)
                    .with_metadata("url", self.url.as_str())
            }
        }
    }
}

/// Stands in for a dependency that has no target configured.
pub struct UnconfiguredProbe {
    name: String,
    reason: String,
}

impl UnconfiguredProbe {
    pub fn new(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl Probe for UnconfiguredProbe {
    fn name(&self) -> &str {
        &self.name
    }

    fn timeout(&self) -> Duration {
        Duration::ZERO
    }

    async fn check(&self) -> ProbeResult {
        ProbeResult::unknown(
            &self.name,
            ProbeError::configuration_missing(self.reason.as_str()),
        )
    }
}

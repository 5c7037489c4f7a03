use sentinel::configuration::get_configuration;
use sentinel::health::{HealthAggregator, ProbeRegistry, SysinfoMetrics};
use sentinel::startup::run;
use sentinel::telemetry::{get_subscriber, init_subscriber};
use std::net::TcpListener;
use std::sync::Arc;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = get_subscriber("sentinel".into(), "info".into());
    init_subscriber(subscriber)?;

    let settings = get_configuration()?;

    let registry = ProbeRegistry::from_settings(&settings.health)?;
    for entry in registry.probes() {
        tracing::info!(
            probe = entry.name(),
            critical = entry.critical,
            timeout_ms = entry.probe.timeout().as_millis() as u64,
            "Health probe registered"
        );
    }

    let aggregator = HealthAggregator::new(Arc::new(registry), Arc::new(SysinfoMetrics::new()));

    let address = format!("{}:{}", settings.app_host, settings.app_port);
    tracing::info!("Start server at {:?}", &address);
    let listener = TcpListener::bind(&address)?;

    run(listener, aggregator)?.await?;
    Ok(())
}

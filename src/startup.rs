use crate::health::{HealthAggregator, ReadinessPolicy};
use crate::routes;
use actix_cors::Cors;
use actix_web::{dev::Server, web, App, HttpServer};
use std::net::TcpListener;
use tracing_actix_web::TracingLogger;

pub fn run(listener: TcpListener, aggregator: HealthAggregator) -> Result<Server, std::io::Error> {
    let policy = web::Data::new(ReadinessPolicy::new(aggregator.clone()));
    let aggregator = web::Data::new(aggregator);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .wrap(Cors::permissive())
            .app_data(aggregator.clone())
            .app_data(policy.clone())
            .service(
                web::scope("/health")
                    .service(routes::health_check)
                    .service(routes::health_detailed)
                    .service(routes::health_readiness)
                    .service(routes::health_liveness)
                    .service(routes::health_metrics),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}

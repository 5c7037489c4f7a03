use crate::health::{liveness, HealthAggregator, NotReady, ReadinessPolicy};
use actix_web::{get, web, HttpResponse, Responder, Result};

/// Fast path: system metrics only, no dependency probing.
#[get("")]
pub async fn health_check(aggregator: web::Data<HealthAggregator>) -> impl Responder {
    web::Json(aggregator.summary().await)
}

#[tracing::instrument(name = "Detailed health check", skip(aggregator))]
#[get("/detailed")]
pub async fn health_detailed(aggregator: web::Data<HealthAggregator>) -> impl Responder {
    web::Json(aggregator.aggregate().await)
}

#[get("/readiness")]
pub async fn health_readiness(
    policy: web::Data<ReadinessPolicy>,
) -> Result<impl Responder, NotReady> {
    let ready = policy.check().await?;
    Ok(web::Json(ready))
}

#[get("/liveness")]
pub async fn health_liveness() -> impl Responder {
    web::Json(liveness())
}

#[get("/metrics")]
pub async fn health_metrics(aggregator: web::Data<HealthAggregator>) -> Result<HttpResponse> {
    let metrics = aggregator.system_metrics().await;
    let body = metrics.render_exposition().map_err(|err| {
        tracing::error!("Failed to render metrics: {:?}", err);
        actix_web::error::ErrorInternalServerError(err)
    })?;

    Ok(HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(body))
}

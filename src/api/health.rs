use actix_web::{web, HttpResponse, Responder};
use serde::{Deserialize, Serialize};

use crate::services::customer_service::CustomerService;

#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub store: String,
    pub store_reachable: bool,
    pub timestamp: i64,
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
        (status = 503, description = "Record store unreachable", body = HealthResponse)
    )
)]
pub async fn health_check(service: web::Data<CustomerService>) -> impl Responder {
    let store_reachable = match service.ping().await {
        Ok(()) => true,
        Err(e) => {
            log::warn!("⚠️  Health check: store unreachable: {}", e);
            false
        }
    };

    let body = HealthResponse {
        status: if store_reachable { "healthy" } else { "degraded" }.to_string(),
        service: "customer-hub".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        store: service.backend().to_string(),
        store_reachable,
        timestamp: chrono::Utc::now().timestamp(),
    };

    if store_reachable {
        HttpResponse::Ok().json(body)
    } else {
        HttpResponse::ServiceUnavailable().json(body)
    }
}

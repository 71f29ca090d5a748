pub mod auth;
pub mod customers;
pub mod health;
pub mod metrics;
pub mod swagger;

use actix_web::web;

use crate::middleware::auth::AuthMiddleware;
use crate::utils::error::AppError;

/// Body errors (bad JSON, unknown status names) use the same error shape as
/// every other failure.
fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, req| {
        log::warn!("⚠️  Rejected body for {}: {}", req.path(), err);
        AppError::InvalidRequest(err.to_string()).into()
    })
}

/// Registers every HTTP route. Expects `Data<CustomerService>` and
/// `Data<AuthSettings>` on the app.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        // Health check
        .route("/health", web::get().to(health::health_check))
        // Metrics
        .route("/metrics", web::get().to(metrics::get_metrics))
        // Password gate -> anonymous identity
        .service(
            web::scope("/api/v1/auth")
                .route("/unlock", web::post().to(auth::unlock))
                .route("/verify", web::get().to(auth::verify_token)),
        )
        // Customers: every route requires a bearer token
        .service(
            web::scope("/api/v1/customers")
                .wrap(AuthMiddleware)
                .route("/statuses", web::get().to(customers::list_statuses))
                .route("/{status}", web::get().to(customers::list_customers))
                .route("/{status}", web::post().to(customers::add_customer))
                .route("/{status}/live", web::get().to(customers::live_customers))
                .route("/{status}/export", web::get().to(customers::export_customers))
                .route("/{status}/{id}", web::get().to(customers::get_customer))
                .route("/{status}/{id}", web::delete().to(customers::delete_customer))
                .route("/{status}/{id}/switch", web::post().to(customers::switch_status)),
        );
}

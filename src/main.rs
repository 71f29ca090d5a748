mod api;
mod config;
mod database;
mod middleware;
mod models;
mod services;
mod store;
mod utils;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use dotenv::dotenv;
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::{AppConfig, StoreBackend};
use crate::services::auth_service::AuthSettings;
use crate::services::customer_service::CustomerService;
use crate::store::{CustomerRepository, InMemoryStore, MongoCustomerStore};

fn startup_error(msg: impl std::fmt::Display) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::Other, msg.to_string())
}

async fn build_store(config: &AppConfig) -> std::io::Result<Arc<dyn CustomerRepository>> {
    match (config.store_backend, config.database_url.as_deref()) {
        (StoreBackend::MongoDB, Some(url)) => {
            let db = database::MongoDB::new(url)
                .await
                .map_err(|e| startup_error(format!("Failed to connect to MongoDB: {}", e)))?;
            log::info!("✅ MongoDB connected successfully");
            let store = MongoCustomerStore::new(db);
            store.start_change_streams();
            Ok(Arc::new(store))
        }
        (StoreBackend::MongoDB, None) => Err(startup_error("DATABASE_URL must be set")),
        (StoreBackend::Memory, _) => {
            log::warn!("⚠️  Using the in-memory store; data is lost on restart");
            Ok(Arc::new(InMemoryStore::new()))
        }
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load environment variables
    dotenv().ok();

    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = AppConfig::from_env().map_err(startup_error)?;

    log::info!("🚀 Starting Customer Hub...");
    log::info!("📊 Store backend: {:?}", config.store_backend);

    let store = build_store(&config).await?;
    let service = web::Data::new(CustomerService::new(store));

    let auth_settings = AuthSettings::from_config(&config).map_err(startup_error)?;
    let auth_data = web::Data::new(auth_settings);

    let bind_address = config.bind_address();
    let origins = config.cors_allowed_origins.clone();

    log::info!("🌐 Server starting on {}", bind_address);
    log::info!("📚 Swagger UI available at: http://{}/swagger-ui/", bind_address);
    log::info!("📄 OpenAPI spec at: http://{}/api-docs/openapi.json", bind_address);

    HttpServer::new(move || {
        let cors = origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
            .allowed_methods(vec!["GET", "POST", "DELETE", "OPTIONS"])
            .allowed_headers(vec![
                actix_web::http::header::AUTHORIZATION,
                actix_web::http::header::CONTENT_TYPE,
                actix_web::http::header::ACCEPT,
                actix_web::http::header::CACHE_CONTROL,
            ])
            .expose_headers(vec![
                actix_web::http::header::CONTENT_TYPE,
                actix_web::http::header::CONTENT_DISPOSITION,
            ])
            .max_age(3600);

        // Generate OpenAPI specification
        let openapi = api::swagger::ApiDoc::openapi();

        App::new()
            .app_data(service.clone())
            .app_data(auth_data.clone())
            .wrap(cors)
            .wrap(middleware::SecurityHeaders)
            .wrap(Logger::default())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", openapi),
            )
            .configure(api::configure)
    })
    .bind(bind_address)?
    .run()
    .await
}

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Customer Hub API",
        version = "1.0.0",
        description = "Customer tracking grouped by status.\n\n**Authentication:** unlock with the shared password at `/api/v1/auth/unlock` and send the returned token as a Bearer token.\n\n**Features:**\n- Customers partitioned by status (pending, active, one month, one year)\n- Atomic status switches\n- Live list updates over Server-Sent Events\n- Spreadsheet export per view"
    ),
    paths(
        // Auth
        crate::api::auth::unlock,
        crate::api::auth::verify_token,

        // Health & Metrics
        crate::api::health::health_check,
        crate::api::metrics::get_metrics,

        // Customers
        crate::api::customers::list_statuses,
        crate::api::customers::list_customers,
        crate::api::customers::add_customer,
        crate::api::customers::get_customer,
        crate::api::customers::delete_customer,
        crate::api::customers::switch_status,
        crate::api::customers::export_customers,
    ),
    components(
        schemas(
            // Auth
            crate::services::auth_service::UnlockRequest,
            crate::services::auth_service::UnlockResponse,
            crate::services::auth_service::VerifyTokenResponse,

            // Health
            crate::api::health::HealthResponse,

            // Customers
            crate::models::Customer,
            crate::models::CustomerStatus,
            crate::models::NewCustomerRequest,
            crate::models::SwitchStatusRequest,
            crate::models::CustomerListResponse,
            crate::models::CustomerResponse,
            crate::models::SwitchStatusResponse,
            crate::models::DeleteCustomerResponse,
            crate::models::StatusInfo,
        )
    ),
    tags(
        (name = "Auth", description = "Shared-password gate issuing anonymous identities."),
        (name = "Health", description = "Health check and metrics."),
        (name = "Customers", description = "Customer records grouped by status partition."),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("Token from /api/v1/auth/unlock"))
                        .build(),
                ),
            );
        }
    }
}

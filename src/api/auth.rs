use actix_web::{web, HttpRequest, HttpResponse, ResponseError};

use crate::services::auth_service::{self, AuthSettings, UnlockRequest, UnlockResponse, VerifyTokenResponse};
use crate::utils::error::AppError;

#[utoipa::path(
    post,
    path = "/api/v1/auth/unlock",
    tag = "Auth",
    request_body = UnlockRequest,
    responses(
        (status = 200, description = "Password accepted, anonymous identity issued", body = UnlockResponse),
        (status = 401, description = "Incorrect password")
    )
)]
pub async fn unlock(
    settings: web::Data<AuthSettings>,
    request: web::Json<UnlockRequest>,
) -> HttpResponse {
    log::info!("🔐 POST /auth/unlock");

    // bcrypt verification blocks
    let password = request.into_inner().password;
    let settings = settings.into_inner();
    let result = web::block(move || auth_service::unlock(&settings, &password)).await;

    match result {
        Ok(Ok(response)) => {
            log::info!("✅ Unlocked, anonymous user {}", response.user_id);
            HttpResponse::Ok().json(response)
        }
        Ok(Err(e)) => {
            log::warn!("❌ Unlock failed: {}", e.code());
            e.error_response()
        }
        Err(e) => {
            log::error!("❌ Unlock task failed: {}", e);
            AppError::TokenError(e.to_string()).error_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/auth/verify",
    tag = "Auth",
    responses(
        (status = 200, description = "Token is valid", body = VerifyTokenResponse),
        (status = 401, description = "Missing, invalid or expired token")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn verify_token(settings: web::Data<AuthSettings>, req: HttpRequest) -> HttpResponse {
    log::info!("✓ GET /auth/verify");

    let token = req
        .headers()
        .get("Authorization")
        .and_then(|value| value.to_str().ok())
        .and_then(auth_service::bearer_token);

    let Some(token) = token else {
        return AppError::NotAuthenticated.error_response();
    };

    match auth_service::verify_token(&settings, token) {
        Ok(claims) => HttpResponse::Ok().json(VerifyTokenResponse {
            success: true,
            valid: true,
            user_id: claims.sub,
            exp: claims.exp,
        }),
        Err(e) => e.error_response(),
    }
}

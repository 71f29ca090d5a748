// ==================== ACCESS GATE ====================
// Shared-password gate that hands out anonymous identities. The issued JWT is
// both the credential every customer endpoint requires and the "already
// unlocked" flag clients keep between visits.

use bcrypt::{hash, verify};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

use crate::{config::AppConfig, utils::error::AppError};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,     // anonymous user id
    pub anonymous: bool,
    pub iat: usize,
    pub exp: usize,
    pub jti: String,
    pub aud: String,
    pub iss: String,
}

/// Secrets and token parameters, built once at startup.
pub struct AuthSettings {
    password_hash: String,
    jwt_secret: String,
    issuer: String,
    audience: String,
    session_ttl: Duration,
}

impl AuthSettings {
    pub fn new(
        password: &str,
        bcrypt_cost: u32,
        jwt_secret: &str,
        issuer: &str,
        audience: &str,
        session_ttl: Duration,
    ) -> Result<Self, AppError> {
        let password_hash = hash(password, bcrypt_cost)
            .map_err(|e| AppError::TokenError(format!("Failed to hash access password: {}", e)))?;

        Ok(Self {
            password_hash,
            jwt_secret: jwt_secret.to_string(),
            issuer: issuer.to_string(),
            audience: audience.to_string(),
            session_ttl,
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        Self::new(
            &config.access_password,
            config.bcrypt_cost,
            &config.jwt_secret,
            &config.jwt_issuer,
            &config.jwt_audience,
            Duration::try_hours(config.session_ttl_hours).ok_or_else(|| {
                AppError::TokenError(format!("Session TTL out of range: {}h", config.session_ttl_hours))
            })?,
        )
    }
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct UnlockRequest {
    pub password: String,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct UnlockResponse {
    pub success: bool,
    pub token: String,
    pub user_id: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct VerifyTokenResponse {
    pub success: bool,
    pub valid: bool,
    pub user_id: String,
    pub exp: usize,
}

fn unix_seconds(at: DateTime<Utc>) -> Result<usize, AppError> {
    usize::try_from(at.timestamp())
        .map_err(|_| AppError::TokenError(format!("Timestamp out of range: {}", at)))
}

/// Issues a fresh anonymous identity
pub fn issue_anonymous_token(settings: &AuthSettings) -> Result<UnlockResponse, AppError> {
    let now = Utc::now();
    let expires_at = now
        .checked_add_signed(settings.session_ttl)
        .ok_or_else(|| AppError::TokenError("Session expiry out of range".to_string()))?;
    let user_id = Uuid::new_v4().to_string();

    let claims = Claims {
        sub: user_id.clone(),
        anonymous: true,
        iat: unix_seconds(now)?,
        exp: unix_seconds(expires_at)?,
        jti: Uuid::new_v4().to_string(),
        aud: settings.audience.clone(),
        iss: settings.issuer.clone(),
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(settings.jwt_secret.as_ref()),
    )
    .map_err(|e| AppError::TokenError(format!("Failed to generate token: {}", e)))?;

    Ok(UnlockResponse {
        success: true,
        token,
        user_id,
        expires_at,
    })
}

/// Checks the shared password; no lockout or backoff on failure.
pub fn unlock(settings: &AuthSettings, password: &str) -> Result<UnlockResponse, AppError> {
    let valid = verify(password, &settings.password_hash)
        .map_err(|e| AppError::TokenError(format!("Password verification error: {}", e)))?;

    if !valid {
        return Err(AppError::WrongPassword);
    }

    issue_anonymous_token(settings)
}

pub fn verify_token(settings: &AuthSettings, token: &str) -> Result<Claims, AppError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_audience(&[settings.audience.as_str()]);

    let mut issuers = HashSet::new();
    issuers.insert(settings.issuer.clone());
    validation.iss = Some(issuers);

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(settings.jwt_secret.as_ref()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| {
        log::debug!("Rejected token: {}", e);
        AppError::NotAuthenticated
    })
}

/// Pulls the token out of an `Authorization: Bearer ...` header value.
pub fn bearer_token(header_value: &str) -> Option<&str> {
    header_value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

#[cfg(test)]
pub(crate) fn test_settings(password: &str) -> AuthSettings {
    AuthSettings::new(
        password,
        4,
        "test-secret",
        "customer-hub",
        "customer-hub-api",
        Duration::hours(1),
    )
    .unwrap()
}

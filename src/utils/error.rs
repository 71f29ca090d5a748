use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use std::fmt;

use crate::models::CustomerStatus;
use crate::store::StoreError;

#[derive(Debug)]
pub enum AppError {
    /// No valid identity on the request; nothing was sent to the store
    NotAuthenticated,
    WrongPassword,
    /// Atomic status switch was rejected; record stays where it was
    CommitFailed(String),
    EmptyExport(CustomerStatus),
    NotFound(String),
    InvalidRequest(String),
    DatabaseError(String),
    ExportError(String),
    TokenError(String),
}

impl AppError {
    /// Stable machine-readable code for clients
    pub fn code(&self) -> &'static str {
        match self {
            AppError::NotAuthenticated => "not_authenticated",
            AppError::WrongPassword => "wrong_password",
            AppError::CommitFailed(_) => "commit_failed",
            AppError::EmptyExport(_) => "no_data",
            AppError::NotFound(_) => "not_found",
            AppError::InvalidRequest(_) => "invalid_request",
            AppError::DatabaseError(_) => "database_error",
            AppError::ExportError(_) => "export_error",
            AppError::TokenError(_) => "token_error",
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::NotAuthenticated => write!(f, "You must be logged in to manage customers."),
            AppError::WrongPassword => write!(f, "Incorrect password. Please try again."),
            AppError::CommitFailed(_) => write!(f, "Could not update customer status."),
            AppError::EmptyExport(status) => write!(
                f,
                "There are no {} customers to download.",
                status.label().to_lowercase()
            ),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
            AppError::DatabaseError(msg) => write!(f, "Database error: {}", msg),
            AppError::ExportError(msg) => write!(f, "Export error: {}", msg),
            AppError::TokenError(msg) => write!(f, "Token error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::DatabaseError(err.to_string())
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotAuthenticated | AppError::WrongPassword => StatusCode::UNAUTHORIZED,
            AppError::CommitFailed(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::EmptyExport(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::DatabaseError(_) | AppError::ExportError(_) | AppError::TokenError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        crate::api::metrics::increment_error_count();

        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "success": false,
            "error": self.code(),
            "message": self.to_string()
        }))
    }
}

//! Error types for centers-web

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use centers_common::db::FieldError;
use serde_json::json;
use thiserror::Error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Per-field validation failures (400)
    #[error("Validation failed")]
    Validation(Vec<FieldError>),

    /// Missing or unknown credentials (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Caller lacks the required scope or role (403)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The caller belongs on a different surface (303 redirect)
    #[error("See other: {0}")]
    SeeOther(String),

    /// Conflict (409) - e.g., duplicate center code
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// centers-common error
    #[error("Common error: {0}")]
    Common(#[from] centers_common::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Redirects carry no error body, just the target surface
        if let ApiError::SeeOther(location) = self {
            return (StatusCode::SEE_OTHER, [(header::LOCATION, location)]).into_response();
        }

        if let ApiError::Validation(errors) = self {
            let body = Json(json!({
                "error": {
                    "code": "VALIDATION_FAILED",
                    "message": "Validation failed",
                    "fields": errors,
                }
            }));
            return (StatusCode::BAD_REQUEST, body).into_response();
        }

        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg),
            ApiError::Database(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "DATABASE_ERROR",
                err.to_string(),
            ),
            ApiError::Common(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "COMMON_ERROR",
                err.to_string(),
            ),
            ApiError::Validation(_) | ApiError::SeeOther(_) => unreachable!(),
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

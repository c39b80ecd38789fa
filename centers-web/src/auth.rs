//! Authentication middleware and caller scope resolution
//!
//! Resolves an opaque bearer token to a user row and injects the resulting
//! `Identity` as a request extension. Token issuance is out of scope; rows
//! are provisioned administratively.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use centers_common::db::Role;

use crate::error::ApiError;
use crate::AppState;

/// The authenticated caller, attached to every protected request
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_id: String,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub center_id: Option<String>,
}

impl Identity {
    /// Resolve the caller's center scope for staff routes.
    ///
    /// Superusers belong on the administrative surface and national officers
    /// on the national dashboard; both get a redirect instead of data. Staff
    /// without a center link are rejected outright.
    pub fn require_center(&self) -> Result<&str, ApiError> {
        match self.role {
            Role::Superuser => Err(ApiError::SeeOther("/admin".to_string())),
            Role::NationalOffice => {
                Err(ApiError::SeeOther("/api/national/dashboard".to_string()))
            }
            Role::Staff => self.center_id.as_deref().ok_or_else(|| {
                ApiError::Forbidden(
                    "Your account is not linked to any project center. Contact the admin."
                        .to_string(),
                )
            }),
        }
    }

    /// National routes are open to national officers and superusers only
    pub fn require_national(&self) -> Result<(), ApiError> {
        if self.role.has_national_access() {
            Ok(())
        } else {
            Err(ApiError::Forbidden(
                "Only National Office can access this resource".to_string(),
            ))
        }
    }
}

/// Authentication middleware
///
/// Expects `Authorization: Bearer <token>`. Returns 401 for a missing or
/// unknown token. Applied to protected routes only; `/health` and the public
/// map view skip it.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| ApiError::Unauthorized("Missing bearer token".to_string()))?;

    let row: Option<(String, String, String, String, Option<String>)> = sqlx::query_as(
        "SELECT guid, username, email, role, center_id FROM users WHERE api_token = ?",
    )
    .bind(token)
    .fetch_optional(&state.db)
    .await?;

    let (user_id, username, email, role, center_id) =
        row.ok_or_else(|| ApiError::Unauthorized("Unknown token".to_string()))?;

    let role = Role::parse(&role)
        .ok_or_else(|| ApiError::Internal(format!("Invalid role in users table: {}", role)))?;

    request.extensions_mut().insert(Identity {
        user_id,
        username,
        email,
        role,
        center_id,
    });

    Ok(next.run(request).await)
}

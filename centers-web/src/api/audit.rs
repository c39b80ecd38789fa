//! Audit trail listing and CSV export (national only)

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use centers_common::db::{AuditAction, AuditLogEntry};
use serde::{Deserialize, Serialize};

use crate::auth::Identity;
use crate::db::audit::{self, AuditFilter};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Query parameters shared by listing and export
#[derive(Debug, Deserialize)]
pub struct AuditQuery {
    pub action: Option<String>,
    pub center_code: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct AuditListResponse {
    pub entries: Vec<AuditLogEntry>,
    pub total: usize,
}

fn to_filter(query: AuditQuery) -> ApiResult<AuditFilter> {
    if let Some(action) = query.action.as_deref() {
        if AuditAction::parse(action).is_none() {
            return Err(ApiError::BadRequest(format!("Unknown action: {}", action)));
        }
    }

    Ok(AuditFilter {
        action: query.action,
        center_code: query.center_code,
        from: query.from,
        to: query.to,
        limit: query.limit,
    })
}

/// GET /api/audit
pub async fn list_audit_log(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Query(query): Query<AuditQuery>,
) -> ApiResult<Json<AuditListResponse>> {
    identity.require_national()?;

    let entries = audit::list(&state.db, &to_filter(query)?).await?;

    Ok(Json(AuditListResponse {
        total: entries.len(),
        entries,
    }))
}

/// GET /api/audit/export
///
/// Same filter vocabulary as the listing; responds with the fixed-column CSV.
pub async fn export_audit_log(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Query(query): Query<AuditQuery>,
) -> ApiResult<Response> {
    identity.require_national()?;

    let entries = audit::list(&state.db, &to_filter(query)?).await?;
    let body = audit::export_csv(&entries);

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"audit_log.csv\"",
            ),
        ],
        body,
    )
        .into_response())
}

//! CSV upload preview, confirm and template endpoints
//!
//! Upload never writes to the database: it stages an annotated batch under an
//! opaque token. Confirm redeems the token exactly once, re-validates, and
//! appends a single CSV_IMPORT audit entry summarizing the batch.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use centers_common::db::AuditAction;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::Identity;
use crate::db::audit;
use crate::error::{ApiError, ApiResult};
use crate::import::{self, PreviewRow};
use crate::AppState;

/// Preview summary counters
#[derive(Debug, Serialize)]
pub struct PreviewSummary {
    pub total: usize,
    pub valid: usize,
    pub invalid: usize,
}

/// POST /api/import/preview response
#[derive(Debug, Serialize)]
pub struct PreviewResponse {
    pub token: Uuid,
    pub summary: PreviewSummary,
    pub rows: Vec<PreviewRow>,
}

/// POST /api/import/confirm request
#[derive(Debug, Deserialize)]
pub struct ConfirmRequest {
    pub token: Uuid,
}

/// POST /api/import/confirm response
#[derive(Debug, Serialize)]
pub struct ConfirmResponse {
    pub created: i64,
    pub skipped: i64,
    pub errors: Vec<String>,
    pub center_codes: Vec<String>,
}

/// POST /api/import/preview
///
/// Body is the raw CSV text (UTF-8, BOM tolerated).
pub async fn import_preview(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    body: String,
) -> ApiResult<Json<PreviewResponse>> {
    identity.require_national()?;

    let mut rows = import::parse_rows(&body).map_err(ApiError::BadRequest)?;
    import::validate_rows(&state.db, &mut rows).await?;

    let valid = rows.iter().filter(|r| r.valid).count();
    let summary = PreviewSummary {
        total: rows.len(),
        valid,
        invalid: rows.len() - valid,
    };

    let token = state.previews.insert(rows.clone()).await;

    tracing::info!(
        user = %identity.username,
        total = summary.total,
        valid = summary.valid,
        "Staged CSV import preview"
    );

    Ok(Json(PreviewResponse {
        token,
        summary,
        rows,
    }))
}

/// POST /api/import/confirm
pub async fn import_confirm(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(request): Json<ConfirmRequest>,
) -> ApiResult<Json<ConfirmResponse>> {
    identity.require_national()?;

    let rows = state.previews.take(request.token).await.ok_or_else(|| {
        ApiError::BadRequest(
            "No preview data found. Please upload again to preview.".to_string(),
        )
    })?;

    let outcome = import::commit(&state.db, &rows).await?;

    // Exactly one batch summary entry, whatever the success count
    audit::log_action(
        &state.db,
        &identity,
        AuditAction::CsvImport,
        None,
        None,
        &format!(
            "CSV import completed. Created={}, Skipped={}, Centers={:?}",
            outcome.created, outcome.skipped, outcome.center_codes
        ),
    )
    .await;

    tracing::info!(
        user = %identity.username,
        created = outcome.created,
        skipped = outcome.skipped,
        "CSV import committed"
    );

    Ok(Json(ConfirmResponse {
        created: outcome.created,
        skipped: outcome.skipped,
        errors: outcome.errors,
        center_codes: outcome.center_codes,
    }))
}

/// GET /api/import/template
///
/// Downloadable CSV template with the required header and one example row.
pub async fn import_template(
    Extension(identity): Extension<Identity>,
) -> ApiResult<Response> {
    identity.require_national()?;

    let mut body = crate::csv::write_record(&import::REQUIRED_COLUMNS);
    body.push_str(&crate::csv::write_record(&[
        "MD1111",
        "John Doe",
        "MD1111-001",
        "M",
        "Jane Doe",
        "39.2904",
        "-76.6122",
    ]));

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"participants_template.csv\"",
            ),
        ],
        body,
    )
        .into_response())
}

//! National dashboard endpoint

use axum::{extract::State, Extension, Json};

use crate::auth::Identity;
use crate::db::reports::{self, Dashboard};
use crate::error::ApiResult;
use crate::AppState;

/// GET /api/national/dashboard
///
/// Read-only rollups over trailing 7/30 day windows, recomputed per request.
pub async fn national_dashboard(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> ApiResult<Json<Dashboard>> {
    identity.require_national()?;

    let dashboard = reports::compute(&state.db).await?;
    Ok(Json(dashboard))
}

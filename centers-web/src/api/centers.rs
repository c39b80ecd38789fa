//! Center map view and national center management

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Extension, Json,
};
use centers_common::db::{AuditAction, CenterFields, ProjectCenter};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::Identity;
use crate::db::{audit, centers};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Query parameters for the public map view
#[derive(Debug, Deserialize)]
pub struct MapQuery {
    #[serde(default)]
    pub territory: String,
    #[serde(default)]
    pub cluster: String,
}

/// Map view response: filtered centers plus the filter vocabulary
#[derive(Debug, Serialize)]
pub struct MapViewResponse {
    pub centers: Vec<ProjectCenter>,
    pub territories: Vec<String>,
    pub clusters: Vec<String>,
    pub selected_territory: String,
    pub selected_cluster: String,
}

/// GET /api/centers?territory=&cluster=
///
/// Public map view. Clusters are only offered once a territory is selected.
pub async fn map_view(
    State(state): State<AppState>,
    Query(query): Query<MapQuery>,
) -> ApiResult<Json<MapViewResponse>> {
    let territory = (!query.territory.is_empty()).then_some(query.territory.as_str());
    let cluster = (!query.cluster.is_empty()).then_some(query.cluster.as_str());

    let centers = centers::list(&state.db, territory, cluster).await?;
    let territories = centers::territories(&state.db).await?;
    let clusters = match territory {
        Some(t) => centers::clusters(&state.db, t).await?,
        None => Vec::new(),
    };

    Ok(Json(MapViewResponse {
        centers,
        territories,
        clusters,
        selected_territory: query.territory,
        selected_cluster: query.cluster,
    }))
}

/// GET /api/national/centers
pub async fn national_centers_list(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> ApiResult<Json<Vec<ProjectCenter>>> {
    identity.require_national()?;

    let centers = centers::list(&state.db, None, None).await?;
    Ok(Json(centers))
}

/// POST /api/national/centers
///
/// Create a project center. Duplicate center codes are a 409.
pub async fn national_center_add(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(fields): Json<CenterFields>,
) -> ApiResult<(StatusCode, Json<ProjectCenter>)> {
    identity.require_national()?;

    fields.validate().map_err(ApiError::Validation)?;

    if centers::code_exists(&state.db, fields.center_code.trim()).await? {
        return Err(ApiError::Conflict(format!(
            "Center code already exists: {}",
            fields.center_code.trim()
        )));
    }

    let guid = Uuid::new_v4().to_string();
    let center = centers::insert(&state.db, &guid, &fields).await?;

    audit::log_action(
        &state.db,
        &identity,
        AuditAction::Create,
        Some(&center),
        None,
        &format!("Created project center: {} ({})", center.name, center.center_code),
    )
    .await;

    Ok((StatusCode::CREATED, Json(center)))
}

//! Participant CRUD handlers, scoped to the caller's center
//!
//! Every lookup is constrained by the resolved center, so a participant
//! belonging to another center is indistinguishable from a missing one (404).

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use centers_common::db::{AuditAction, FieldError, Participant, ParticipantFields, ProjectCenter};
use serde::Serialize;
use uuid::Uuid;

use crate::auth::Identity;
use crate::db::{audit, centers, participants};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Roster response with the per-sex counts shown on the list page
#[derive(Debug, Serialize)]
pub struct ParticipantListResponse {
    pub center: ProjectCenter,
    pub participants: Vec<Participant>,
    pub total_count: i64,
    pub male_count: i64,
    pub female_count: i64,
}

/// Resolve the caller's center row, or the appropriate redirect/forbidden
async fn caller_center(state: &AppState, identity: &Identity) -> ApiResult<ProjectCenter> {
    let center_id = identity.require_center()?;

    centers::find_by_guid(&state.db, center_id)
        .await?
        .ok_or_else(|| {
            ApiError::Forbidden(
                "Your account is linked to a project center that no longer exists.".to_string(),
            )
        })
}

/// GET /api/participants
pub async fn list_participants(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> ApiResult<Json<ParticipantListResponse>> {
    let center = caller_center(&state, &identity).await?;

    let roster = participants::list_by_center(&state.db, &center.guid).await?;
    let (male_count, female_count) = participants::sex_counts(&state.db, &center.guid).await?;

    Ok(Json(ParticipantListResponse {
        total_count: roster.len() as i64,
        male_count,
        female_count,
        participants: roster,
        center,
    }))
}

/// GET /api/participants/map
///
/// Same roster, intended for the house-location map render.
pub async fn participant_map(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> ApiResult<Json<ParticipantListResponse>> {
    list_participants(State(state), Extension(identity)).await
}

/// POST /api/participants
pub async fn create_participant(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(fields): Json<ParticipantFields>,
) -> ApiResult<(StatusCode, Json<Participant>)> {
    let center = caller_center(&state, &identity).await?;

    fields.validate().map_err(ApiError::Validation)?;

    if participants::id_exists(&state.db, fields.participant_id.trim()).await? {
        return Err(ApiError::Validation(vec![FieldError::new(
            "participant_id",
            "already exists",
        )]));
    }

    let guid = Uuid::new_v4().to_string();
    participants::insert(&state.db, &guid, &center.guid, &fields)
        .await
        .map_err(|e| match e {
            // Concurrent create with the same identifier
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                ApiError::Validation(vec![FieldError::new("participant_id", "already exists")])
            }
            other => ApiError::Database(other),
        })?;

    let participant = participants::find_scoped(&state.db, &guid, &center.guid)
        .await?
        .ok_or_else(|| ApiError::Internal("participant vanished after insert".to_string()))?;

    audit::log_action(
        &state.db,
        &identity,
        AuditAction::Create,
        Some(&center),
        Some(&participant.participant_id),
        &format!("Created participant: {}", participant.participant_name),
    )
    .await;

    Ok((StatusCode::CREATED, Json(participant)))
}

/// GET /api/participants/:guid
pub async fn get_participant(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(guid): Path<String>,
) -> ApiResult<Json<Participant>> {
    let center = caller_center(&state, &identity).await?;

    let participant = participants::find_scoped(&state.db, &guid, &center.guid)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Participant not found: {}", guid)))?;

    Ok(Json(participant))
}

/// PUT /api/participants/:guid
pub async fn update_participant(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(guid): Path<String>,
    Json(fields): Json<ParticipantFields>,
) -> ApiResult<Json<Participant>> {
    let center = caller_center(&state, &identity).await?;

    let old = participants::find_scoped(&state.db, &guid, &center.guid)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Participant not found: {}", guid)))?;

    fields.validate().map_err(ApiError::Validation)?;

    let new_id = fields.participant_id.trim();
    if new_id != old.participant_id && participants::id_exists(&state.db, new_id).await? {
        return Err(ApiError::Validation(vec![FieldError::new(
            "participant_id",
            "already exists",
        )]));
    }

    participants::update(&state.db, &guid, &fields)
        .await
        .map_err(|e| match e {
            // Concurrent writer took the identifier after the check above
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                ApiError::Validation(vec![FieldError::new("participant_id", "already exists")])
            }
            other => ApiError::Database(other),
        })?;

    let updated = participants::find_scoped(&state.db, &guid, &center.guid)
        .await?
        .ok_or_else(|| ApiError::Internal("participant vanished after update".to_string()))?;

    let details = format!(
        "Updated participant {}. Old: name={}, sex={}, caregiver={}, lat={}, lng={}. \
         New: name={}, sex={}, caregiver={}, lat={}, lng={}.",
        old.participant_id,
        old.participant_name,
        old.sex,
        old.caregiver_name,
        old.house_latitude,
        old.house_longitude,
        updated.participant_name,
        updated.sex,
        updated.caregiver_name,
        updated.house_latitude,
        updated.house_longitude,
    );

    audit::log_action(
        &state.db,
        &identity,
        AuditAction::Update,
        Some(&center),
        Some(&updated.participant_id),
        &details,
    )
    .await;

    Ok(Json(updated))
}

/// DELETE /api/participants/:guid
pub async fn delete_participant(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(guid): Path<String>,
) -> ApiResult<StatusCode> {
    let center = caller_center(&state, &identity).await?;

    let participant = participants::find_scoped(&state.db, &guid, &center.guid)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Participant not found: {}", guid)))?;

    audit::log_action(
        &state.db,
        &identity,
        AuditAction::Delete,
        Some(&center),
        Some(&participant.participant_id),
        &format!("Deleted participant: {}", participant.participant_name),
    )
    .await;

    participants::delete(&state.db, &guid).await?;

    Ok(StatusCode::NO_CONTENT)
}

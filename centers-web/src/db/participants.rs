//! Participant queries
//!
//! Lookups used by staff handlers are always scoped by the caller's center,
//! so a cross-center guid simply does not resolve.

use centers_common::db::{Participant, ParticipantFields};
use centers_common::Result;
use sqlx::SqlitePool;

const PARTICIPANT_COLUMNS: &str = "guid, center_id, participant_name, participant_id, sex, \
     caregiver_name, house_latitude, house_longitude, created_at";

/// List a center's participants ordered by name
pub async fn list_by_center(pool: &SqlitePool, center_id: &str) -> Result<Vec<Participant>> {
    let sql = format!(
        "SELECT {PARTICIPANT_COLUMNS} FROM participants \
         WHERE center_id = ? ORDER BY participant_name"
    );

    let participants = sqlx::query_as::<_, Participant>(&sql)
        .bind(center_id)
        .fetch_all(pool)
        .await?;

    Ok(participants)
}

/// Find a participant by guid within a specific center
pub async fn find_scoped(
    pool: &SqlitePool,
    guid: &str,
    center_id: &str,
) -> Result<Option<Participant>> {
    let sql = format!(
        "SELECT {PARTICIPANT_COLUMNS} FROM participants WHERE guid = ? AND center_id = ?"
    );

    let participant = sqlx::query_as::<_, Participant>(&sql)
        .bind(guid)
        .bind(center_id)
        .fetch_optional(pool)
        .await?;

    Ok(participant)
}

/// Check whether a participant identifier is already taken
pub async fn id_exists(pool: &SqlitePool, participant_id: &str) -> Result<bool> {
    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM participants WHERE participant_id = ?)")
            .bind(participant_id)
            .fetch_one(pool)
            .await?;

    Ok(exists)
}

/// Insert a new participant into a center
///
/// The UNIQUE constraint on participant_id is the last line of defense when
/// two writers race; callers treat that violation as a duplicate.
pub async fn insert(
    pool: &SqlitePool,
    guid: &str,
    center_id: &str,
    fields: &ParticipantFields,
) -> std::result::Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO participants (guid, center_id, participant_name, participant_id,
                                  sex, caregiver_name, house_latitude, house_longitude)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(guid)
    .bind(center_id)
    .bind(fields.participant_name.trim())
    .bind(fields.participant_id.trim())
    .bind(&fields.sex)
    .bind(fields.caregiver_name.trim())
    .bind(fields.house_latitude)
    .bind(fields.house_longitude)
    .execute(pool)
    .await?;

    Ok(())
}

/// Update an existing participant's fields
///
/// Like `insert`, a UNIQUE violation on participant_id can still fire when a
/// concurrent writer takes the identifier between check and update.
pub async fn update(
    pool: &SqlitePool,
    guid: &str,
    fields: &ParticipantFields,
) -> std::result::Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE participants
        SET participant_name = ?, participant_id = ?, sex = ?,
            caregiver_name = ?, house_latitude = ?, house_longitude = ?
        WHERE guid = ?
        "#,
    )
    .bind(fields.participant_name.trim())
    .bind(fields.participant_id.trim())
    .bind(&fields.sex)
    .bind(fields.caregiver_name.trim())
    .bind(fields.house_latitude)
    .bind(fields.house_longitude)
    .bind(guid)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn delete(pool: &SqlitePool, guid: &str) -> Result<()> {
    sqlx::query("DELETE FROM participants WHERE guid = ?")
        .bind(guid)
        .execute(pool)
        .await?;

    Ok(())
}

/// Per-sex counts for a center's roster
pub async fn sex_counts(pool: &SqlitePool, center_id: &str) -> Result<(i64, i64)> {
    let male: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM participants WHERE center_id = ? AND sex = 'M'",
    )
    .bind(center_id)
    .fetch_one(pool)
    .await?;

    let female: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM participants WHERE center_id = ? AND sex = 'F'",
    )
    .bind(center_id)
    .fetch_one(pool)
    .await?;

    Ok((male, female))
}

pub async fn count(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM participants")
        .fetch_one(pool)
        .await?;

    Ok(count)
}

//! Audit trail queries
//!
//! The trail is append-only; UPDATE and DELETE fail at the schema triggers.
//! `log_action` is best-effort: audit unavailability never blocks the
//! primary mutation.

use centers_common::db::{AuditAction, AuditLogEntry, ProjectCenter};
use centers_common::Result;
use sqlx::SqlitePool;
use tracing::warn;

use crate::auth::Identity;

/// Append an audit entry, swallowing any failure
pub async fn log_action(
    pool: &SqlitePool,
    identity: &Identity,
    action: AuditAction,
    center: Option<&ProjectCenter>,
    participant_id: Option<&str>,
    details: &str,
) {
    if let Err(e) = try_log_action(pool, identity, action, center, participant_id, details).await {
        // Deliberate best-effort policy: the mutation already happened,
        // losing the trail entry must not fail the request.
        warn!(
            action = action.as_str(),
            user = %identity.username,
            error = %e,
            "Failed to append audit log entry"
        );
    }
}

async fn try_log_action(
    pool: &SqlitePool,
    identity: &Identity,
    action: AuditAction,
    center: Option<&ProjectCenter>,
    participant_id: Option<&str>,
    details: &str,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO audit_log (user_id, username, email, action,
                               center_code, center_name, participant_id, details)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&identity.user_id)
    .bind(&identity.username)
    .bind(&identity.email)
    .bind(action.as_str())
    .bind(center.map(|c| c.center_code.as_str()))
    .bind(center.map(|c| c.name.as_str()))
    .bind(participant_id)
    .bind(details)
    .execute(pool)
    .await?;

    Ok(())
}

/// Filters for audit listing and export
#[derive(Debug, Default, Clone)]
pub struct AuditFilter {
    pub action: Option<String>,
    pub center_code: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub limit: Option<i64>,
}

const AUDIT_COLUMNS: &str = "id, user_id, username, email, action, center_code, center_name, \
     participant_id, details, timestamp";

/// List audit entries newest-first under the given filter
pub async fn list(pool: &SqlitePool, filter: &AuditFilter) -> Result<Vec<AuditLogEntry>> {
    let sql = format!(
        "SELECT {AUDIT_COLUMNS} FROM audit_log \
         WHERE (?1 IS NULL OR action = ?1) \
           AND (?2 IS NULL OR center_code = ?2) \
           AND (?3 IS NULL OR timestamp >= ?3) \
           AND (?4 IS NULL OR timestamp <= ?4) \
         ORDER BY timestamp DESC, id DESC \
         LIMIT ?5"
    );

    let entries = sqlx::query_as::<_, AuditLogEntry>(&sql)
        .bind(filter.action.as_deref())
        .bind(filter.center_code.as_deref())
        .bind(filter.from.as_deref())
        .bind(filter.to.as_deref())
        .bind(filter.limit.unwrap_or(1000))
        .fetch_all(pool)
        .await?;

    Ok(entries)
}

/// Render entries as the fixed-column export CSV
pub fn export_csv(entries: &[AuditLogEntry]) -> String {
    let mut out = crate::csv::write_record(&[
        "timestamp",
        "action",
        "user",
        "user_email",
        "center",
        "center_code",
        "participant_id",
        "details",
    ]);

    for entry in entries {
        out.push_str(&crate::csv::write_record(&[
            &entry.timestamp,
            &entry.action,
            &entry.username,
            &entry.email,
            entry.center_name.as_deref().unwrap_or(""),
            entry.center_code.as_deref().unwrap_or(""),
            entry.participant_id.as_deref().unwrap_or(""),
            &entry.details,
        ]));
    }

    out
}

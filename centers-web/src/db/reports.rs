//! National dashboard rollups
//!
//! Everything here is recomputed per request over fixed trailing windows.
//! No caching; volumes are small.

use centers_common::db::{AuditLogEntry, Sex};
use centers_common::Result;
use chrono::{Duration, Utc};
use serde::Serialize;
use sqlx::SqlitePool;

/// One label/count pair in a rollup
#[derive(Debug, Clone, Serialize)]
pub struct LabelCount {
    pub label: String,
    pub total: i64,
}

/// Dashboard response body
#[derive(Debug, Serialize)]
pub struct Dashboard {
    pub total_centers: i64,
    pub total_participants: i64,
    pub logs_last_7: i64,
    pub logs_last_30: i64,
    pub deletes_last_30: i64,
    pub csv_imports_last_30: i64,
    pub participants_by_territory: Vec<LabelCount>,
    pub participants_by_sex: Vec<LabelCount>,
    pub logs_by_day: Vec<LabelCount>,
    pub logs_by_action: Vec<LabelCount>,
    pub top_centers: Vec<LabelCount>,
    pub top_users: Vec<LabelCount>,
    pub recent_logs: Vec<AuditLogEntry>,
}

/// Compute the full dashboard
pub async fn compute(pool: &SqlitePool) -> Result<Dashboard> {
    let total_centers = super::centers::count(pool).await?;
    let total_participants = super::participants::count(pool).await?;

    let logs_last_7 = logs_since(pool, "-7 days", None).await?;
    let logs_last_30 = logs_since(pool, "-30 days", None).await?;
    let deletes_last_30 = logs_since(pool, "-30 days", Some("DELETE")).await?;
    let csv_imports_last_30 = logs_since(pool, "-30 days", Some("CSV_IMPORT")).await?;

    let participants_by_territory = participants_by_territory(pool).await?;
    let participants_by_sex = participants_by_sex(pool).await?;
    let logs_by_day = logs_by_day(pool).await?;
    let logs_by_action = logs_by_action(pool).await?;
    let top_centers = top_centers(pool).await?;
    let top_users = top_users(pool).await?;

    let recent_logs = super::audit::list(
        pool,
        &super::audit::AuditFilter {
            limit: Some(20),
            ..Default::default()
        },
    )
    .await?;

    Ok(Dashboard {
        total_centers,
        total_participants,
        logs_last_7,
        logs_last_30,
        deletes_last_30,
        csv_imports_last_30,
        participants_by_territory,
        participants_by_sex,
        logs_by_day,
        logs_by_action,
        top_centers,
        top_users,
        recent_logs,
    })
}

async fn logs_since(pool: &SqlitePool, window: &str, action: Option<&str>) -> Result<i64> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM audit_log \
         WHERE timestamp >= datetime('now', ?1) AND (?2 IS NULL OR action = ?2)",
    )
    .bind(window)
    .bind(action)
    .fetch_one(pool)
    .await?;

    Ok(count)
}

async fn participants_by_territory(pool: &SqlitePool) -> Result<Vec<LabelCount>> {
    let rows: Vec<(String, i64)> = sqlx::query_as(
        "SELECT c.territory, COUNT(*) AS total \
         FROM participants p JOIN centers c ON p.center_id = c.guid \
         GROUP BY c.territory ORDER BY total DESC",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(label, total)| LabelCount { label, total })
        .collect())
}

async fn participants_by_sex(pool: &SqlitePool) -> Result<Vec<LabelCount>> {
    let rows: Vec<(String, i64)> =
        sqlx::query_as("SELECT sex, COUNT(*) FROM participants GROUP BY sex ORDER BY sex")
            .fetch_all(pool)
            .await?;

    Ok(rows
        .into_iter()
        .map(|(sex, total)| LabelCount {
            label: Sex::parse(&sex)
                .map(|s| s.label().to_string())
                .unwrap_or_else(|| "Unknown".to_string()),
            total,
        })
        .collect())
}

/// Daily audit volume for the last 31 calendar days, zero-filled
async fn logs_by_day(pool: &SqlitePool) -> Result<Vec<LabelCount>> {
    let rows: Vec<(String, i64)> = sqlx::query_as(
        "SELECT date(timestamp) AS day, COUNT(*) \
         FROM audit_log WHERE timestamp >= datetime('now', '-30 days') \
         GROUP BY day ORDER BY day",
    )
    .fetch_all(pool)
    .await?;

    let by_day: std::collections::HashMap<String, i64> = rows.into_iter().collect();
    let today = Utc::now().date_naive();

    let mut series = Vec::with_capacity(31);
    for i in (0..=30).rev() {
        let day = (today - Duration::days(i)).format("%Y-%m-%d").to_string();
        let total = by_day.get(&day).copied().unwrap_or(0);
        series.push(LabelCount { label: day, total });
    }

    Ok(series)
}

async fn logs_by_action(pool: &SqlitePool) -> Result<Vec<LabelCount>> {
    let rows: Vec<(String, i64)> = sqlx::query_as(
        "SELECT action, COUNT(*) FROM audit_log \
         WHERE timestamp >= datetime('now', '-30 days') \
         GROUP BY action ORDER BY action",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(label, total)| LabelCount { label, total })
        .collect())
}

async fn top_centers(pool: &SqlitePool) -> Result<Vec<LabelCount>> {
    let rows: Vec<(String, String, i64)> = sqlx::query_as(
        "SELECT center_code, center_name, COUNT(*) AS total \
         FROM audit_log \
         WHERE timestamp >= datetime('now', '-30 days') \
           AND center_code IS NOT NULL AND center_name IS NOT NULL \
         GROUP BY center_code, center_name ORDER BY total DESC LIMIT 10",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(code, name, total)| LabelCount {
            label: format!("{} ({})", name, code),
            total,
        })
        .collect())
}

async fn top_users(pool: &SqlitePool) -> Result<Vec<LabelCount>> {
    let rows: Vec<(String, i64)> = sqlx::query_as(
        "SELECT username, COUNT(*) AS total \
         FROM audit_log \
         WHERE timestamp >= datetime('now', '-30 days') \
         GROUP BY username ORDER BY total DESC LIMIT 10",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(label, total)| LabelCount { label, total })
        .collect())
}

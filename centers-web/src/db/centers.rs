//! Project center queries

use centers_common::db::{CenterFields, ProjectCenter};
use centers_common::Result;
use sqlx::SqlitePool;

const CENTER_COLUMNS: &str = "guid, name, center_code, territory, cluster, latitude, longitude, \
     beneficiaries, address, created_at";

/// List centers, optionally filtered by territory and cluster
pub async fn list(
    pool: &SqlitePool,
    territory: Option<&str>,
    cluster: Option<&str>,
) -> Result<Vec<ProjectCenter>> {
    let sql = format!(
        "SELECT {CENTER_COLUMNS} FROM centers \
         WHERE (?1 IS NULL OR territory = ?1) AND (?2 IS NULL OR cluster = ?2) \
         ORDER BY name"
    );

    let centers = sqlx::query_as::<_, ProjectCenter>(&sql)
        .bind(territory)
        .bind(cluster)
        .fetch_all(pool)
        .await?;

    Ok(centers)
}

/// Distinct territories, sorted
pub async fn territories(pool: &SqlitePool) -> Result<Vec<String>> {
    let rows: Vec<(String,)> =
        sqlx::query_as("SELECT DISTINCT territory FROM centers ORDER BY territory")
            .fetch_all(pool)
            .await?;

    Ok(rows.into_iter().map(|(t,)| t).collect())
}

/// Distinct clusters within a territory, sorted
pub async fn clusters(pool: &SqlitePool, territory: &str) -> Result<Vec<String>> {
    let rows: Vec<(String,)> = sqlx::query_as(
        "SELECT DISTINCT cluster FROM centers WHERE territory = ? ORDER BY cluster",
    )
    .bind(territory)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|(c,)| c).collect())
}

pub async fn find_by_guid(pool: &SqlitePool, guid: &str) -> Result<Option<ProjectCenter>> {
    let sql = format!("SELECT {CENTER_COLUMNS} FROM centers WHERE guid = ?");
    let center = sqlx::query_as::<_, ProjectCenter>(&sql)
        .bind(guid)
        .fetch_optional(pool)
        .await?;

    Ok(center)
}

pub async fn find_by_code(pool: &SqlitePool, center_code: &str) -> Result<Option<ProjectCenter>> {
    let sql = format!("SELECT {CENTER_COLUMNS} FROM centers WHERE center_code = ?");
    let center = sqlx::query_as::<_, ProjectCenter>(&sql)
        .bind(center_code)
        .fetch_optional(pool)
        .await?;

    Ok(center)
}

pub async fn code_exists(pool: &SqlitePool, center_code: &str) -> Result<bool> {
    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM centers WHERE center_code = ?)")
            .bind(center_code)
            .fetch_one(pool)
            .await?;

    Ok(exists)
}

/// Insert a new center and return it
pub async fn insert(pool: &SqlitePool, guid: &str, fields: &CenterFields) -> Result<ProjectCenter> {
    sqlx::query(
        r#"
        INSERT INTO centers (guid, name, center_code, territory, cluster,
                             latitude, longitude, beneficiaries, address)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(guid)
    .bind(fields.name.trim())
    .bind(fields.center_code.trim())
    .bind(fields.territory.trim())
    .bind(fields.cluster.trim())
    .bind(fields.latitude)
    .bind(fields.longitude)
    .bind(fields.beneficiaries)
    .bind(fields.address.trim())
    .execute(pool)
    .await?;

    let center = find_by_guid(pool, guid)
        .await?
        .ok_or_else(|| centers_common::Error::Internal("center vanished after insert".into()))?;

    Ok(center)
}

pub async fn count(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM centers")
        .fetch_one(pool)
        .await?;

    Ok(count)
}

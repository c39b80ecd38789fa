//! Database initialization
//!
//! Creates the schema on first run. All statements are idempotent
//! (`CREATE ... IF NOT EXISTS`) so startup is safe to repeat.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // WAL allows concurrent readers with one writer
    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;
    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    init_schema(&pool).await?;

    Ok(pool)
}

/// Initialize an in-memory database (tests)
///
/// A single connection is required: each in-memory SQLite connection is a
/// separate database.
pub async fn init_memory_database() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;

    init_schema(&pool).await?;

    Ok(pool)
}

/// Create all tables, indexes and triggers (idempotent)
pub async fn init_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query("PRAGMA foreign_keys = ON").execute(pool).await?;

    create_centers_table(pool).await?;
    create_participants_table(pool).await?;
    create_users_table(pool).await?;
    create_audit_log_table(pool).await?;

    Ok(())
}

/// Create the centers table
///
/// One row per project center (physical program site). Coordinate ranges are
/// double-checked here so raw SQL cannot sneak an invalid location past the
/// application-level validation.
pub async fn create_centers_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS centers (
            guid TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            center_code TEXT NOT NULL UNIQUE,
            territory TEXT NOT NULL,
            cluster TEXT NOT NULL,
            latitude REAL NOT NULL,
            longitude REAL NOT NULL,
            beneficiaries INTEGER NOT NULL DEFAULT 0,
            address TEXT NOT NULL DEFAULT '',
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            CHECK (latitude >= -90.0 AND latitude <= 90.0),
            CHECK (longitude >= -180.0 AND longitude <= 180.0),
            CHECK (beneficiaries >= 0)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_centers_code ON centers(center_code)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_centers_territory ON centers(territory)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the participants table
///
/// Each participant belongs to exactly one center and is removed with it
/// (ON DELETE CASCADE). `participant_id` is the externally assigned
/// beneficiary identifier and is globally unique.
pub async fn create_participants_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS participants (
            guid TEXT PRIMARY KEY,
            center_id TEXT NOT NULL REFERENCES centers(guid) ON DELETE CASCADE,
            participant_name TEXT NOT NULL,
            participant_id TEXT NOT NULL UNIQUE,
            sex TEXT NOT NULL CHECK (sex IN ('M', 'F')),
            caregiver_name TEXT NOT NULL,
            house_latitude REAL NOT NULL,
            house_longitude REAL NOT NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            CHECK (house_latitude >= -90.0 AND house_latitude <= 90.0),
            CHECK (house_longitude >= -180.0 AND house_longitude <= 180.0)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_participants_center ON participants(center_id)")
        .execute(pool)
        .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_participants_participant_id ON participants(participant_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the users table
///
/// Carries an explicit role plus an optional center link. A staff user with
/// no center link has no scope and is denied access to center-scoped routes.
pub async fn create_users_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            guid TEXT PRIMARY KEY,
            username TEXT NOT NULL UNIQUE,
            email TEXT NOT NULL DEFAULT '',
            api_token TEXT NOT NULL UNIQUE,
            role TEXT NOT NULL DEFAULT 'staff'
                CHECK (role IN ('staff', 'national_office', 'superuser')),
            center_id TEXT REFERENCES centers(guid) ON DELETE SET NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_users_token ON users(api_token)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the audit_log table and its immutability triggers
///
/// Rows are append-only. User and center data is snapshotted into the row
/// (no foreign keys) so that deleting a user or center can never touch the
/// trail. The triggers make UPDATE and DELETE fail at the storage layer.
pub async fn create_audit_log_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS audit_log (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id TEXT NOT NULL,
            username TEXT NOT NULL,
            email TEXT NOT NULL DEFAULT '',
            action TEXT NOT NULL
                CHECK (action IN ('CREATE', 'UPDATE', 'DELETE', 'CSV_IMPORT')),
            center_code TEXT,
            center_name TEXT,
            participant_id TEXT,
            details TEXT NOT NULL DEFAULT '',
            timestamp TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_audit_log_timestamp ON audit_log(timestamp)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_audit_log_action ON audit_log(action)")
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TRIGGER IF NOT EXISTS audit_log_no_update
        BEFORE UPDATE ON audit_log
        BEGIN
            SELECT RAISE(ABORT, 'audit_log rows are immutable');
        END
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TRIGGER IF NOT EXISTS audit_log_no_delete
        BEFORE DELETE ON audit_log
        BEGIN
            SELECT RAISE(ABORT, 'audit_log rows are immutable');
        END
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

//! Database initialization
//!
//! Creates the database on first run with the default schema, then applies
//! versioned migrations. Safe to call on every startup.

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
        .min_connections(2)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // Enable foreign keys
    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;

    // WAL mode allows the dashboard SSE reader and the editor writer to
    // overlap without lock contention
    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;

    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    init_schema(&pool).await?;

    Ok(pool)
}

/// Create tables and apply migrations (idempotent)
///
/// Split from [`init_database`] so tests can run against `sqlite::memory:`.
pub async fn init_schema(pool: &SqlitePool) -> Result<()> {
    create_sessions_table(pool).await?;
    create_blocks_table(pool).await?;
    create_session_analysis_table(pool).await?;
    create_settings_table(pool).await?;

    crate::db::migrations::run_migrations(pool).await?;
    crate::db::settings::init_default_settings(pool).await?;

    Ok(())
}

/// Sessions table: one row per `(candidate_name, session_number)`
///
/// The UNIQUE natural key makes every save an upsert; the row never
/// disappears between a delete and a reinsert.
async fn create_sessions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sessions (
            guid TEXT PRIMARY KEY,
            candidate_name TEXT NOT NULL,
            session_number INTEGER NOT NULL,
            session_id TEXT,
            impedance_h TEXT,
            impedance_l TEXT,
            started_at TEXT,
            ended_at TEXT,
            UNIQUE(candidate_name, session_number)
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

/// Blocks table: one row per `(session_guid, block_index)`
///
/// Authoritative block storage; there is no denormalized JSON alternative.
async fn create_blocks_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS blocks (
            guid TEXT PRIMARY KEY,
            session_guid TEXT NOT NULL REFERENCES sessions(guid),
            block_index INTEGER NOT NULL,
            start_time TEXT,
            end_time TEXT,
            notes TEXT,
            is_recording INTEGER NOT NULL DEFAULT 0,
            UNIQUE(session_guid, block_index)
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

/// Append-only analysis reports written by the summarization service
async fn create_session_analysis_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS session_analysis (
            guid TEXT PRIMARY KEY,
            candidate_name TEXT NOT NULL,
            analysis TEXT NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

/// Key-value settings store
async fn create_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

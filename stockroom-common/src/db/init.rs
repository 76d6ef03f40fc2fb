//! Database initialization
//!
//! The cache database is created on first run. Every table is created with
//! `CREATE TABLE IF NOT EXISTS`, so opening an existing file is a no-op for
//! the schema.
//!
//! Tables:
//! - `records`: mirror of the remote products datasheet, keyed by remote id
//!   with a secondary index on the scannable external code
//! - `settings`: flat key/value runtime configuration

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    // The record store is the only writer, a small pool is enough
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(4)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // WAL lets readers proceed while a sync rewrites the records table
    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;

    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    create_schema(&pool).await?;

    Ok(pool)
}

/// Create every table used by the client (idempotent)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_records_table(pool).await?;
    create_settings_table(pool).await?;
    Ok(())
}

/// Create the records table
///
/// `fields` holds the remote field map as a JSON object, `updated_at` is the
/// local write time in unix milliseconds, and `position` preserves the order
/// in which the last sync returned the records.
pub async fn create_records_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS records (
            id TEXT PRIMARY KEY,
            external_code TEXT NOT NULL,
            fields TEXT NOT NULL DEFAULT '{}',
            updated_at INTEGER NOT NULL,
            position INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_records_external_code ON records(external_code)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the settings table
///
/// Stores application configuration key-value pairs.
pub async fn create_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

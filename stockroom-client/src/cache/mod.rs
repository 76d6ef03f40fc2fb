//! Local cache store
//!
//! Embedded SQLite mirror of the remote products datasheet plus the flat
//! key/value runtime configuration. Only the record store writes the records
//! table; the configuration layer owns the settings table.

mod records;
mod settings;

use sqlx::SqlitePool;
use std::path::Path;
use stockroom_common::db::init_database;
use stockroom_common::Result;

/// Handle to the embedded store
#[derive(Clone)]
pub struct CacheStore {
    pool: SqlitePool,
}

impl CacheStore {
    /// Open (creating if needed) the database file at `path`
    pub async fn open(path: &Path) -> Result<Self> {
        let pool = init_database(path).await?;
        Ok(Self { pool })
    }

    /// Wrap an existing pool whose schema has already been created
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

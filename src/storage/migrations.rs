//! # Database Migration Management
//!
//! Schema migrations are embedded in the binary from `./migrations` and
//! tracked by sqlx in `_sqlx_migrations`.

use crate::errors::{GantryError, Result};
use crate::storage::DbPool;
use sqlx::migrate::Migrator;
use tracing::{error, info};

pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Run all pending database migrations
pub async fn run_migrations(pool: &DbPool) -> Result<()> {
    info!(available = MIGRATOR.iter().count(), "Starting database migration process");

    MIGRATOR.run(pool).await.map_err(|e| {
        error!(error = %e, "Database migration failed");
        GantryError::from(e)
    })?;

    let version = get_migration_version(pool).await?;
    info!(version = ?version, "Database migrations completed");
    Ok(())
}

/// Highest applied migration version, `None` on a fresh database.
pub async fn get_migration_version(pool: &DbPool) -> Result<Option<i64>> {
    let exists: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = '_sqlx_migrations'",
    )
    .fetch_one(pool)
    .await
    .map_err(|e| GantryError::database(e, "Failed to inspect migration table"))?;
    if exists.0 == 0 {
        return Ok(None);
    }

    let version: (Option<i64>,) =
        sqlx::query_as("SELECT MAX(version) FROM _sqlx_migrations WHERE success = 1")
            .fetch_one(pool)
            .await
            .map_err(|e| GantryError::database(e, "Failed to read migration version"))?;
    Ok(version.0)
}

//! # Storage and Persistence
//!
//! SQLite-backed mirror store used for backup and restore of config items.

pub mod migrations;
pub mod mirror;
pub mod pool;

pub use crate::config::DatabaseConfig;

pub use migrations::{get_migration_version, run_migrations};
pub use mirror::{MirrorRecord, MirrorStore, SqlMirrorStore};
pub use pool::{create_pool, DbPool};

use crate::errors::{GantryError, Result};

/// Check database connectivity
pub async fn check_connection(pool: &DbPool) -> Result<()> {
    sqlx::query("SELECT 1")
        .fetch_one(pool)
        .await
        .map_err(|e| GantryError::database(e, "Database connectivity check failed"))?;

    Ok(())
}

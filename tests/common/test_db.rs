//! Test database utilities for integration tests.
//!
//! Each test gets its own migrated SQLite file inside a temporary directory
//! that is removed on drop.

#![allow(clippy::duplicate_mod)]

use gantry::config::DatabaseConfig;
use gantry::storage::{create_pool, DbPool, SqlMirrorStore};
use std::path::PathBuf;
use tempfile::TempDir;

/// A migrated mirror database that is deleted when dropped.
pub struct TestDatabase {
    pub pool: DbPool,
    pub path: PathBuf,
    _dir: TempDir,
}

impl TestDatabase {
    pub async fn new(prefix: &str) -> Self {
        let dir = tempfile::tempdir().expect("create test database directory");
        let path = dir.path().join(format!("{}.db", prefix));
        let config = DatabaseConfig {
            url: format!("sqlite://{}", path.display()),
            max_connections: 5,
            min_connections: 0,
            idle_timeout_seconds: 0,
            auto_migrate: true,
            ..Default::default()
        };
        let pool = create_pool(&config).await.expect("create test database pool");

        Self { pool, path, _dir: dir }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub fn mirror(&self) -> SqlMirrorStore {
        SqlMirrorStore::new(self.pool.clone())
    }
}

//! Mirror store for config items
//!
//! The mirror keeps the last value written through gantry for every item so
//! a backend can be backed up and restored. It is addressed by the same
//! `(tenant, project, environment, key)` identity as the backends.

use crate::domain::{ConfigItem, Scope};
use crate::errors::{GantryError, Result};
use crate::storage::DbPool;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use tracing::instrument;

/// Timestamp layout used when mirror dates are copied onto config items.
pub const DISPLAY_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Database row structure for mirrored items
#[derive(Debug, Clone, FromRow)]
struct MirrorRow {
    pub id: i64,
    pub tenant: String,
    pub project: String,
    pub environment: String,
    pub config_key: String,
    pub application: String,
    pub value: String,
    pub last_update_user: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A mirrored config item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirrorRecord {
    pub id: i64,
    pub tenant: String,
    pub project: String,
    pub environment: String,
    pub key: String,
    pub application: String,
    pub value: String,
    pub last_update_user: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<MirrorRow> for MirrorRecord {
    fn from(row: MirrorRow) -> Self {
        Self {
            id: row.id,
            tenant: row.tenant,
            project: row.project,
            environment: row.environment,
            key: row.config_key,
            application: row.application,
            value: row.value,
            last_update_user: row.last_update_user,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl MirrorRecord {
    /// Config item carrying the mirrored value and dates.
    pub fn to_item(&self) -> ConfigItem {
        ConfigItem {
            tenant: self.tenant.clone(),
            project: self.project.clone(),
            application: self.application.clone(),
            environment: self.environment.clone(),
            key: self.key.clone(),
            value: self.value.clone(),
            revision: 0,
            created_time: self.created_at.format(DISPLAY_TIME_FORMAT).to_string(),
            last_modified_time: self.updated_at.format(DISPLAY_TIME_FORMAT).to_string(),
            last_update_user: self.last_update_user.clone(),
        }
    }

    /// Whether `item` carries content this record does not.
    ///
    /// Both the value and the application tag are compared.
    pub fn differs_from(&self, item: &ConfigItem) -> bool {
        self.value != item.value || self.application != item.application
    }
}

/// Persistence operations on mirrored items.
#[async_trait]
pub trait MirrorStore: Send + Sync {
    /// Record with the item's identity, if any.
    async fn find(&self, item: &ConfigItem) -> Result<Option<MirrorRecord>>;

    /// Records under `scope`; an empty environment covers the whole project.
    async fn find_all(&self, scope: &Scope) -> Result<Vec<MirrorRecord>>;

    /// Insert the item, or update value, application, user and modification
    /// time when the stored content differs. Unchanged records are left as is.
    async fn upsert(&self, item: &ConfigItem, acting_user: &str) -> Result<MirrorRecord>;

    /// Remove the record with the item's identity; absence is not an error.
    async fn delete(&self, item: &ConfigItem) -> Result<()>;
}

/// SQLite-backed mirror store.
#[derive(Debug, Clone)]
pub struct SqlMirrorStore {
    pool: DbPool,
}

const SELECT_COLUMNS: &str = "SELECT id, tenant, project, environment, config_key, application, value, last_update_user, created_at, updated_at FROM config_mirror";

impl SqlMirrorStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl MirrorStore for SqlMirrorStore {
    #[instrument(skip(self, item), fields(item = %item), name = "db_find_mirror_record")]
    async fn find(&self, item: &ConfigItem) -> Result<Option<MirrorRecord>> {
        let row = sqlx::query_as::<_, MirrorRow>(&format!(
            "{} WHERE tenant = ? AND project = ? AND environment = ? AND config_key = ?",
            SELECT_COLUMNS
        ))
        .bind(&item.tenant)
        .bind(&item.project)
        .bind(&item.environment)
        .bind(&item.key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, item = %item, "Failed to find mirror record");
            GantryError::database(e, format!("Failed to find mirror record '{}'", item))
        })?;

        Ok(row.map(MirrorRecord::from))
    }

    #[instrument(skip(self, scope), fields(scope = %scope), name = "db_find_mirror_records")]
    async fn find_all(&self, scope: &Scope) -> Result<Vec<MirrorRecord>> {
        let rows = if scope.environment.is_empty() {
            sqlx::query_as::<_, MirrorRow>(&format!(
                "{} WHERE tenant = ? AND project = ? ORDER BY environment, config_key",
                SELECT_COLUMNS
            ))
            .bind(&scope.tenant)
            .bind(&scope.project)
            .fetch_all(&self.pool)
            .await
        } else {
            sqlx::query_as::<_, MirrorRow>(&format!(
                "{} WHERE tenant = ? AND project = ? AND environment = ? ORDER BY config_key",
                SELECT_COLUMNS
            ))
            .bind(&scope.tenant)
            .bind(&scope.project)
            .bind(&scope.environment)
            .fetch_all(&self.pool)
            .await
        }
        .map_err(|e| {
            tracing::error!(error = %e, scope = %scope, "Failed to list mirror records");
            GantryError::database(e, format!("Failed to list mirror records under '{}'", scope))
        })?;

        Ok(rows.into_iter().map(MirrorRecord::from).collect())
    }

    #[instrument(skip(self, item), fields(item = %item, user = %acting_user), name = "db_upsert_mirror_record")]
    async fn upsert(&self, item: &ConfigItem, acting_user: &str) -> Result<MirrorRecord> {
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO config_mirror (tenant, project, environment, config_key, application, value, last_update_user, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT (tenant, project, environment, config_key) DO UPDATE SET \
                 application = excluded.application, \
                 value = excluded.value, \
                 last_update_user = excluded.last_update_user, \
                 updated_at = excluded.updated_at \
             WHERE config_mirror.value <> excluded.value OR config_mirror.application <> excluded.application",
        )
        .bind(&item.tenant)
        .bind(&item.project)
        .bind(&item.environment)
        .bind(&item.key)
        .bind(&item.application)
        .bind(&item.value)
        .bind(acting_user)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, item = %item, "Failed to upsert mirror record");
            GantryError::database(e, format!("Failed to upsert mirror record '{}'", item))
        })?;

        self.find(item).await?.ok_or_else(|| {
            GantryError::internal(format!("Mirror record '{}' missing after upsert", item))
        })
    }

    #[instrument(skip(self, item), fields(item = %item), name = "db_delete_mirror_record")]
    async fn delete(&self, item: &ConfigItem) -> Result<()> {
        sqlx::query(
            "DELETE FROM config_mirror WHERE tenant = ? AND project = ? AND environment = ? AND config_key = ?",
        )
        .bind(&item.tenant)
        .bind(&item.project)
        .bind(&item.environment)
        .bind(&item.key)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, item = %item, "Failed to delete mirror record");
            GantryError::database(e, format!("Failed to delete mirror record '{}'", item))
        })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::migrations::run_migrations;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn store() -> SqlMirrorStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        run_migrations(&pool).await.unwrap();
        SqlMirrorStore::new(pool)
    }

    #[tokio::test]
    async fn test_upsert_inserts_then_updates_on_change() {
        let store = store().await;
        let item = ConfigItem::new("t1", "p1", "dev", "A").with_value("1");

        let created = store.upsert(&item, "alice").await.unwrap();
        assert_eq!(created.value, "1");
        assert_eq!(created.last_update_user, "alice");

        let updated =
            store.upsert(&item.clone().with_value("2").with_application("web"), "bob").await.unwrap();
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.value, "2");
        assert_eq!(updated.application, "web");
        assert_eq!(updated.last_update_user, "bob");
        assert_eq!(updated.created_at, created.created_at);
    }

    #[tokio::test]
    async fn test_upsert_without_change_keeps_record() {
        let store = store().await;
        let item = ConfigItem::new("t1", "p1", "dev", "A").with_value("1");

        let first = store.upsert(&item, "alice").await.unwrap();
        let second = store.upsert(&item, "bob").await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_find_all_scopes() {
        let store = store().await;
        for (env, key) in [("dev", "A"), ("dev", "B"), ("prod", "A")] {
            store.upsert(&ConfigItem::new("t1", "p1", env, key).with_value("v"), "u").await.unwrap();
        }
        store.upsert(&ConfigItem::new("t1", "p2", "dev", "A").with_value("v"), "u").await.unwrap();

        let dev = store.find_all(&Scope::new("t1", "p1", "dev")).await.unwrap();
        assert_eq!(dev.iter().map(|r| r.key.as_str()).collect::<Vec<_>>(), vec!["A", "B"]);

        let project = store.find_all(&Scope::new("t1", "p1", "")).await.unwrap();
        assert_eq!(project.len(), 3);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let store = store().await;
        let item = ConfigItem::new("t1", "p1", "dev", "A").with_value("1");
        store.upsert(&item, "alice").await.unwrap();

        store.delete(&item).await.unwrap();
        store.delete(&item).await.unwrap();
        assert!(store.find(&item).await.unwrap().is_none());
    }

    #[test]
    fn test_record_to_item_formats_dates() {
        let at = DateTime::parse_from_rfc3339("2024-03-01T08:30:00Z").unwrap().with_timezone(&Utc);
        let record = MirrorRecord {
            id: 1,
            tenant: "t1".to_string(),
            project: "p1".to_string(),
            environment: "dev".to_string(),
            key: "A".to_string(),
            application: String::new(),
            value: "1".to_string(),
            last_update_user: "alice".to_string(),
            created_at: at,
            updated_at: at,
        };
        let item = record.to_item();
        assert_eq!(item.created_time, "2024-03-01 08:30:00");
        assert_eq!(item.last_update_user, "alice");
        assert!(!record.differs_from(&item));
        assert!(record.differs_from(&item.clone().with_application("web")));
    }
}

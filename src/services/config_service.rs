//! Config item business logic service
//!
//! Routes every call to the tenant's backend and keeps the mirror store in
//! step with writes made through gantry.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{error, info, Instrument};

use crate::{
    backends::{BackendRegistry, ConfigBackend},
    domain::{Account, ConfigItem, HistoryVersion, ListOptions, Scope},
    errors::Result,
    storage::MirrorStore,
    sync::{sync_backend_to_mirror, sync_mirror_to_backend, SyncReport},
};

/// Service for config items across all registered backends
pub struct ConfigService {
    registry: Arc<BackendRegistry>,
    mirror: Arc<dyn MirrorStore>,
}

impl ConfigService {
    pub fn new(registry: Arc<BackendRegistry>, mirror: Arc<dyn MirrorStore>) -> Self {
        Self { registry, mirror }
    }

    pub fn registry(&self) -> &BackendRegistry {
        &self.registry
    }

    fn backend(&self, tenant: &str) -> Result<Arc<dyn ConfigBackend>> {
        self.registry.resolve(tenant)
    }

    /// Read an item; a non-zero `revision` reads that historical revision.
    pub async fn get(&self, item: &ConfigItem) -> Result<ConfigItem> {
        let backend = self.backend(&item.tenant)?;
        let span = crate::backend_span!("get", backend.kind(), item, revision = item.revision);

        async move {
            let mut item = item.clone();
            backend.get(&mut item).await?;
            Ok(item)
        }
        .instrument(span)
        .await
    }

    /// Publish to the backend, then record the value in the mirror.
    pub async fn publish(&self, item: &ConfigItem, acting_user: &str) -> Result<()> {
        let backend = self.backend(&item.tenant)?;
        let span = crate::backend_span!("publish", backend.kind(), item, user = %acting_user);

        async move {
            backend.publish(item).await?;
            self.mirror.upsert(item, acting_user).await.map_err(|e| {
                error!(error = %e, item = %item, "Published to backend but mirror update failed");
                e
            })?;
            info!(item = %item, user = %acting_user, "Config item published");
            Ok(())
        }
        .instrument(span)
        .await
    }

    /// Delete from the backend, then drop the mirror record.
    pub async fn delete(&self, item: &ConfigItem) -> Result<()> {
        let backend = self.backend(&item.tenant)?;
        let span = crate::backend_span!("delete", backend.kind(), item);

        async move {
            backend.delete(item).await?;
            self.mirror.delete(item).await.map_err(|e| {
                error!(error = %e, item = %item, "Deleted from backend but mirror delete failed");
                e
            })?;
            info!(item = %item, "Config item deleted");
            Ok(())
        }
        .instrument(span)
        .await
    }

    /// List backend items with creation/modification dates and the last
    /// acting user taken from the mirror.
    pub async fn list(&self, options: &ListOptions) -> Result<Vec<ConfigItem>> {
        let backend = self.backend(&options.item.tenant)?;
        let span = crate::backend_span!(
            "list",
            backend.kind(),
            options.item,
            page = options.page,
            size = options.size
        );

        async move {
            let mut items = backend.list(options).await?;
            self.fill_dates(&options.item.scope(), &mut items).await?;
            Ok(items)
        }
        .instrument(span)
        .await
    }

    async fn fill_dates(&self, scope: &Scope, items: &mut [ConfigItem]) -> Result<()> {
        if items.is_empty() {
            return Ok(());
        }

        let records: HashMap<(String, String), ConfigItem> = self
            .mirror
            .find_all(scope)
            .await?
            .into_iter()
            .map(|record| ((record.environment.clone(), record.key.clone()), record.to_item()))
            .collect();

        for item in items.iter_mut() {
            if let Some(mirrored) = records.get(&(item.environment.clone(), item.key.clone())) {
                item.created_time = mirrored.created_time.clone();
                item.last_modified_time = mirrored.last_modified_time.clone();
                item.last_update_user = mirrored.last_update_user.clone();
            }
        }
        Ok(())
    }

    pub async fn history(&self, item: &ConfigItem) -> Result<Vec<HistoryVersion>> {
        let backend = self.backend(&item.tenant)?;
        let span = crate::backend_span!("history", backend.kind(), item);
        backend.history(item).instrument(span).await
    }

    /// Read and read-write principals of the item's namespace.
    pub fn accounts(&self, item: &ConfigItem) -> Result<Vec<Account>> {
        self.backend(&item.tenant)?.accounts(item)
    }

    pub fn base_info(&self, item: &ConfigItem) -> Result<BTreeMap<String, String>> {
        self.backend(&item.tenant)?.base_info(item)
    }

    pub async fn listener_status(&self, item: &ConfigItem) -> Result<BTreeMap<String, String>> {
        let backend = self.backend(&item.tenant)?;
        let span = crate::backend_span!("listener_status", backend.kind(), item);
        backend.listener_status(item).instrument(span).await
    }

    /// Copy the scope's backend content into the mirror.
    pub async fn backup(&self, scope: &Scope) -> Result<SyncReport> {
        let backend = self.backend(&scope.tenant)?;
        sync_backend_to_mirror(scope, backend.as_ref(), self.mirror.as_ref()).await
    }

    /// Publish the scope's mirrored values the backend is missing.
    pub async fn restore(&self, scope: &Scope) -> Result<SyncReport> {
        let backend = self.backend(&scope.tenant)?;
        sync_mirror_to_backend(scope, self.mirror.as_ref(), backend.as_ref()).await
    }
}

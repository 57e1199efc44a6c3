//! etcd implementation of [`ConfigBackend`].

use super::access::EtcdAccessControl;
use super::mapper::{prefix_range_end, EtcdKeyMapper};
use super::transport::{EtcdTransport, KvRecord};
use crate::backends::backend::{BackendKind, ConfigBackend};
use crate::backends::history::{revision_walk, RevisionMeta};
use crate::backends::provisioner::{AccessProvisioner, ProvisioningPolicy};
use crate::domain::{Account, ConfigItem, HistoryVersion, ListOptions};
use crate::errors::{GantryError, Result};
use crate::observability::MetricsRecorder;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{instrument, warn};

/// Page size applied to the key-ordered range when the caller gives none.
pub const DEFAULT_LIST_SIZE: i64 = 500;

/// Config items stored as plain keys in an etcd cluster.
#[derive(Debug)]
pub struct EtcdConfigBackend {
    mapper: EtcdKeyMapper,
    transport: Arc<dyn EtcdTransport>,
    provisioner: AccessProvisioner,
    metrics: MetricsRecorder,
}

impl EtcdConfigBackend {
    pub fn new(root: impl Into<String>, transport: Arc<dyn EtcdTransport>) -> Self {
        let access = Arc::new(EtcdAccessControl::new(transport.clone()));
        Self {
            mapper: EtcdKeyMapper::new(root),
            transport,
            provisioner: AccessProvisioner::new(BackendKind::Etcd, access, ProvisioningPolicy::etcd()),
            metrics: MetricsRecorder::new(),
        }
    }

    /// Connect to the cluster described by `settings`.
    #[cfg(feature = "etcd")]
    pub async fn connect(settings: &crate::config::EtcdBackendSettings) -> Result<Self> {
        let transport = super::transport::EtcdClientTransport::connect(
            &settings.endpoints,
            settings.username.as_deref(),
            settings.password.as_deref(),
            std::time::Duration::from_secs(settings.dial_timeout_seconds),
        )
        .await?;
        Ok(Self::new(settings.root.clone(), Arc::new(transport)))
    }

    pub fn mapper(&self) -> &EtcdKeyMapper {
        &self.mapper
    }

    /// Validate identity and provision the item's namespace.
    async fn authorize(&self, item: &ConfigItem, operation: &'static str) -> Result<()> {
        let plan = self.mapper.plan(item)?;
        self.provisioner.ensure(&plan).await?;
        self.metrics.record_backend_operation(BackendKind::Etcd.as_str(), operation);
        Ok(())
    }

    /// Read one key without provisioning; exactly one record must match.
    async fn fetch(&self, key: &str, revision: i64) -> Result<KvRecord> {
        let mut records = self.transport.get(key, revision).await?;
        match records.len() {
            1 => Ok(records.remove(0)),
            0 => Err(GantryError::not_found("config item", key)),
            n => Err(GantryError::not_found(
                "config item",
                format!("{} ({} records matched)", key, n),
            )),
        }
    }
}

fn revision_meta(record: &KvRecord) -> RevisionMeta {
    RevisionMeta {
        version: record.version,
        mod_revision: record.mod_revision,
        create_revision: record.create_revision,
    }
}

#[async_trait]
impl ConfigBackend for EtcdConfigBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Etcd
    }

    fn base_info(&self, item: &ConfigItem) -> Result<BTreeMap<String, String>> {
        item.validate_identity()?;
        Ok(BTreeMap::from([("provider".to_string(), BackendKind::Etcd.to_string())]))
    }

    #[instrument(
        skip(self, item),
        fields(tenant = %item.tenant, project = %item.project, environment = %item.environment, key = %item.key, revision = item.revision),
        name = "etcd_get"
    )]
    async fn get(&self, item: &mut ConfigItem) -> Result<()> {
        self.authorize(item, "get").await?;
        let key = self.mapper.key(item)?;
        let record = self.fetch(&key, item.revision).await?;
        item.value = record.value;
        Ok(())
    }

    #[instrument(
        skip(self, item),
        fields(tenant = %item.tenant, project = %item.project, environment = %item.environment, key = %item.key),
        name = "etcd_publish"
    )]
    async fn publish(&self, item: &ConfigItem) -> Result<()> {
        self.authorize(item, "publish").await?;
        let key = self.mapper.key(item)?;
        self.transport.put(&key, &item.value).await
    }

    #[instrument(
        skip(self, item),
        fields(tenant = %item.tenant, project = %item.project, environment = %item.environment, key = %item.key),
        name = "etcd_delete"
    )]
    async fn delete(&self, item: &ConfigItem) -> Result<()> {
        self.authorize(item, "delete").await?;
        let key = self.mapper.key(item)?;
        self.transport.delete(&key).await
    }

    #[instrument(
        skip(self, options),
        fields(tenant = %options.item.tenant, project = %options.item.project, environment = %options.item.environment, page = options.page, size = options.size),
        name = "etcd_list"
    )]
    async fn list(&self, options: &ListOptions) -> Result<Vec<ConfigItem>> {
        self.authorize(&options.item, "list").await?;
        let prefix = self.mapper.list_key(&options.item)?;
        let records = self.transport.range(&prefix, &prefix_range_end(&prefix)).await?;

        let (page, size) = options.normalized(DEFAULT_LIST_SIZE);
        let skip = usize::try_from((page - 1).saturating_mul(size)).unwrap_or(usize::MAX);
        let take = usize::try_from(size).unwrap_or(usize::MAX);

        Ok(records
            .into_iter()
            .filter_map(|record| {
                let parsed = self.mapper.parse_key(&record.key, &record.value);
                if parsed.is_none() {
                    warn!(key = %record.key, "Skipping key outside the config layout");
                }
                parsed
            })
            .skip(skip)
            .take(take)
            .collect())
    }

    #[instrument(
        skip(self, item),
        fields(tenant = %item.tenant, project = %item.project, environment = %item.environment, key = %item.key),
        name = "etcd_history"
    )]
    async fn history(&self, item: &ConfigItem) -> Result<Vec<HistoryVersion>> {
        self.authorize(item, "history").await?;
        let key = self.mapper.key(item)?;
        let latest = self.fetch(&key, 0).await?;

        // Provisioning already held for the initial read; the walk reads directly.
        let key = key.as_str();
        revision_walk(revision_meta(&latest), |revision| async move {
            self.fetch(key, revision).await.map(|record| revision_meta(&record))
        })
        .await
    }

    fn accounts(&self, item: &ConfigItem) -> Result<Vec<Account>> {
        self.mapper.accounts(item)
    }

    async fn listener_status(&self, item: &ConfigItem) -> Result<BTreeMap<String, String>> {
        item.validate_identity()?;
        Ok(BTreeMap::new())
    }
}

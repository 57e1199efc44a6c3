//! Nacos implementation of [`ConfigBackend`].

use super::client::{ConfigAddress, NacosClient};
use super::mapper::NacosKeyMapper;
use crate::backends::backend::{BackendKind, ConfigBackend};
use crate::backends::history::direct_query;
use crate::backends::provisioner::{AccessProvisioner, ProvisioningPolicy};
use crate::domain::{Account, ConfigItem, HistoryVersion, ListOptions};
use crate::errors::Result;
use crate::observability::MetricsRecorder;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::instrument;

/// Page size passed to Nacos when the caller gives none.
pub const DEFAULT_LIST_SIZE: i64 = 10;

#[derive(Debug)]
pub struct NacosConfigBackend {
    mapper: NacosKeyMapper,
    client: Arc<NacosClient>,
    provisioner: AccessProvisioner,
    metrics: MetricsRecorder,
}

impl NacosConfigBackend {
    pub fn new(root: impl Into<String>, client: Arc<NacosClient>) -> Self {
        Self::with_policy(root, client, ProvisioningPolicy::nacos())
    }

    /// Backend with custom provisioning cache lifetimes.
    pub fn with_policy(
        root: impl Into<String>,
        client: Arc<NacosClient>,
        policy: ProvisioningPolicy,
    ) -> Self {
        Self {
            mapper: NacosKeyMapper::new(root),
            provisioner: AccessProvisioner::new(BackendKind::Nacos, client.clone(), policy),
            client,
            metrics: MetricsRecorder::new(),
        }
    }

    pub fn from_settings(settings: &crate::config::NacosBackendSettings) -> Result<Self> {
        let client = NacosClient::new(
            settings.address.clone(),
            settings.username.clone(),
            settings.password.clone(),
            std::time::Duration::from_secs(settings.request_timeout_seconds),
        )?;
        Ok(Self::new(settings.root.clone(), Arc::new(client)))
    }

    pub fn mapper(&self) -> &NacosKeyMapper {
        &self.mapper
    }

    async fn authorize(&self, item: &ConfigItem, operation: &'static str) -> Result<String> {
        let plan = self.mapper.plan(item)?;
        self.provisioner.ensure(&plan).await?;
        self.metrics.record_backend_operation(BackendKind::Nacos.as_str(), operation);
        self.mapper.tenant_id(item)
    }

    fn address<'a>(&self, tenant_id: &'a str, item: &'a ConfigItem) -> ConfigAddress<'a> {
        ConfigAddress {
            tenant: tenant_id,
            group: self.mapper.group(item),
            data_id: self.mapper.data_id(item),
        }
    }
}

#[async_trait]
impl ConfigBackend for NacosConfigBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Nacos
    }

    fn base_info(&self, item: &ConfigItem) -> Result<BTreeMap<String, String>> {
        Ok(BTreeMap::from([
            ("provider".to_string(), BackendKind::Nacos.to_string()),
            ("nacos_tenant".to_string(), self.mapper.tenant_id(item)?),
            ("nacos_group".to_string(), self.mapper.group(item).to_string()),
        ]))
    }

    #[instrument(
        skip(self, item),
        fields(tenant = %item.tenant, project = %item.project, environment = %item.environment, key = %item.key, revision = item.revision),
        name = "nacos_get"
    )]
    async fn get(&self, item: &mut ConfigItem) -> Result<()> {
        let tenant_id = self.authorize(item, "get").await?;
        let address = self.address(&tenant_id, item);
        let value = if item.revision != 0 {
            self.client.get_history_entry(address, item.revision).await?
        } else {
            self.client.get_config(address).await?
        };
        item.value = value;
        Ok(())
    }

    #[instrument(
        skip(self, item),
        fields(tenant = %item.tenant, project = %item.project, environment = %item.environment, key = %item.key),
        name = "nacos_publish"
    )]
    async fn publish(&self, item: &ConfigItem) -> Result<()> {
        let tenant_id = self.authorize(item, "publish").await?;
        self.client.publish_config(self.address(&tenant_id, item), &item.application, &item.value).await
    }

    #[instrument(
        skip(self, item),
        fields(tenant = %item.tenant, project = %item.project, environment = %item.environment, key = %item.key),
        name = "nacos_delete"
    )]
    async fn delete(&self, item: &ConfigItem) -> Result<()> {
        let tenant_id = self.authorize(item, "delete").await?;
        self.client.delete_config(self.address(&tenant_id, item)).await
    }

    #[instrument(
        skip(self, options),
        fields(tenant = %options.item.tenant, project = %options.item.project, environment = %options.item.environment, page = options.page, size = options.size),
        name = "nacos_list"
    )]
    async fn list(&self, options: &ListOptions) -> Result<Vec<ConfigItem>> {
        let scope = &options.item;
        let tenant_id = self.authorize(scope, "list").await?;
        let (page_no, page_size) = options.normalized(DEFAULT_LIST_SIZE);
        let page = self
            .client
            .list_configs(self.address(&tenant_id, scope), &scope.application, page_no, page_size)
            .await?;

        Ok(page
            .page_items
            .into_iter()
            .map(|row| ConfigItem {
                tenant: scope.tenant.clone(),
                project: scope.project.clone(),
                application: row.app_name,
                environment: row.group,
                key: row.data_id,
                value: row.content,
                created_time: row.created_time,
                last_modified_time: row.last_modified_time,
                ..Default::default()
            })
            .collect())
    }

    #[instrument(
        skip(self, item),
        fields(tenant = %item.tenant, project = %item.project, environment = %item.environment, key = %item.key),
        name = "nacos_history"
    )]
    async fn history(&self, item: &ConfigItem) -> Result<Vec<HistoryVersion>> {
        let tenant_id = self.authorize(item, "history").await?;
        let page = self.client.list_history(self.address(&tenant_id, item)).await?;
        Ok(direct_query(page.page_items))
    }

    fn accounts(&self, item: &ConfigItem) -> Result<Vec<Account>> {
        self.mapper.accounts(item)
    }

    async fn listener_status(&self, item: &ConfigItem) -> Result<BTreeMap<String, String>> {
        let tenant_id = self.mapper.tenant_id(item)?;
        let response = self.client.listener_status(self.address(&tenant_id, item)).await?;
        Ok(response.listeners)
    }
}

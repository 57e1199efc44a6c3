//! Config backend registry
//!
//! Holds one backend instance per configured endpoint and routes every tenant
//! to exactly one of them: an explicit tenant mapping first, the default
//! backend otherwise.

use super::backend::ConfigBackend;
use crate::config::{AppConfig, BackendSettings};
use crate::errors::{GantryError, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Default)]
pub struct BackendRegistry {
    backends: HashMap<String, Arc<dyn ConfigBackend>>,
    tenants: HashMap<String, String>,
    default_backend: Option<String>,
}

impl std::fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("backends", &self.registered_backends())
            .field("tenants", &self.tenants)
            .field("default_backend", &self.default_backend)
            .finish()
    }
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a backend under `name`, replacing any previous one.
    pub fn register(&mut self, name: impl Into<String>, backend: Arc<dyn ConfigBackend>) {
        let name = name.into();
        info!(backend = %name, kind = %backend.kind(), "Registering config backend");
        self.backends.insert(name, backend);
    }

    /// Pin `tenant` to the backend registered as `backend`.
    pub fn route_tenant(&mut self, tenant: impl Into<String>, backend: impl Into<String>) -> Result<()> {
        let backend = backend.into();
        if !self.backends.contains_key(&backend) {
            return Err(GantryError::config(format!("Unknown backend '{}' in tenant route", backend)));
        }
        self.tenants.insert(tenant.into(), backend);
        Ok(())
    }

    pub fn set_default(&mut self, backend: impl Into<String>) -> Result<()> {
        let backend = backend.into();
        if !self.backends.contains_key(&backend) {
            return Err(GantryError::config(format!("Unknown default backend '{}'", backend)));
        }
        self.default_backend = Some(backend);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ConfigBackend>> {
        self.backends.get(name).cloned()
    }

    /// Registered backend names, sorted.
    pub fn registered_backends(&self) -> Vec<String> {
        let mut names: Vec<String> = self.backends.keys().cloned().collect();
        names.sort();
        names
    }

    /// The backend serving `tenant`.
    pub fn resolve(&self, tenant: &str) -> Result<Arc<dyn ConfigBackend>> {
        let name = self
            .tenants
            .get(tenant)
            .or(self.default_backend.as_ref())
            .ok_or_else(|| GantryError::not_found("backend route", tenant))?;
        debug!(tenant = %tenant, backend = %name, "Resolved config backend");
        self.get(name).ok_or_else(|| GantryError::not_found("config backend", name.as_str()))
    }

    /// Build every configured backend and apply the routing table.
    pub async fn from_config(config: &AppConfig) -> Result<Self> {
        let mut registry = Self::new();

        for settings in &config.backends {
            let backend: Arc<dyn ConfigBackend> = match settings {
                #[cfg(feature = "etcd")]
                BackendSettings::Etcd(etcd) => {
                    Arc::new(super::etcd::EtcdConfigBackend::connect(etcd).await?)
                }
                #[cfg(not(feature = "etcd"))]
                BackendSettings::Etcd(etcd) => {
                    return Err(GantryError::config(format!(
                        "Backend '{}' needs etcd support; rebuild with the `etcd` feature",
                        etcd.name
                    )));
                }
                BackendSettings::Nacos(nacos) => {
                    Arc::new(super::nacos::NacosConfigBackend::from_settings(nacos)?)
                }
            };
            registry.register(settings.name(), backend);
        }

        for (tenant, backend) in &config.routing.tenants {
            registry.route_tenant(tenant.clone(), backend.clone())?;
        }
        registry.set_default(config.routing.default_backend.clone())?;

        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::backend::BackendKind;
    use crate::domain::{Account, ConfigItem, HistoryVersion, ListOptions};
    use async_trait::async_trait;
    use std::collections::BTreeMap;

    #[derive(Debug)]
    struct Stub(BackendKind);

    #[async_trait]
    impl ConfigBackend for Stub {
        fn kind(&self) -> BackendKind {
            self.0
        }
        fn base_info(&self, _item: &ConfigItem) -> Result<BTreeMap<String, String>> {
            Ok(BTreeMap::new())
        }
        async fn get(&self, _item: &mut ConfigItem) -> Result<()> {
            Ok(())
        }
        async fn publish(&self, _item: &ConfigItem) -> Result<()> {
            Ok(())
        }
        async fn delete(&self, _item: &ConfigItem) -> Result<()> {
            Ok(())
        }
        async fn list(&self, _options: &ListOptions) -> Result<Vec<ConfigItem>> {
            Ok(Vec::new())
        }
        async fn history(&self, _item: &ConfigItem) -> Result<Vec<HistoryVersion>> {
            Ok(Vec::new())
        }
        fn accounts(&self, _item: &ConfigItem) -> Result<Vec<Account>> {
            Ok(Vec::new())
        }
        async fn listener_status(&self, _item: &ConfigItem) -> Result<BTreeMap<String, String>> {
            Ok(BTreeMap::new())
        }
    }

    fn registry() -> BackendRegistry {
        let mut registry = BackendRegistry::new();
        registry.register("primary-etcd", Arc::new(Stub(BackendKind::Etcd)));
        registry.register("shared-nacos", Arc::new(Stub(BackendKind::Nacos)));
        registry
    }

    #[test]
    fn test_routes_tenant_then_default() {
        let mut registry = registry();
        registry.route_tenant("acme", "shared-nacos").unwrap();
        registry.set_default("primary-etcd").unwrap();

        assert_eq!(registry.resolve("acme").unwrap().kind(), BackendKind::Nacos);
        assert_eq!(registry.resolve("globex").unwrap().kind(), BackendKind::Etcd);
    }

    #[test]
    fn test_unrouted_tenant_without_default() {
        let registry = registry();
        let err = registry.resolve("acme").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_unknown_route_targets_rejected() {
        let mut registry = registry();
        assert!(registry.route_tenant("acme", "missing").is_err());
        assert!(registry.set_default("missing").is_err());
        assert_eq!(registry.registered_backends(), vec!["primary-etcd", "shared-nacos"]);
    }
}

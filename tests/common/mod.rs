//! Common test utilities for all integration tests.
//!
//! Provides an in-memory etcd transport, throwaway mirror databases and
//! small builders shared by the backend, sync and service tests.

#![allow(dead_code)]
#![allow(clippy::duplicate_mod)]

pub mod memory_etcd;
pub mod test_db;

use gantry::backends::{BackendRegistry, ConfigBackend, EtcdConfigBackend};
use gantry::ConfigItem;
use memory_etcd::MemoryEtcd;
use std::sync::Arc;

pub const ROOT: &str = "root";

/// etcd backend over a fresh in-memory cluster.
pub fn etcd_backend() -> (Arc<MemoryEtcd>, Arc<EtcdConfigBackend>) {
    let etcd = Arc::new(MemoryEtcd::new());
    let backend = Arc::new(EtcdConfigBackend::new(ROOT, etcd.clone()));
    (etcd, backend)
}

/// Registry routing every tenant to `backend`.
pub fn single_backend_registry(backend: Arc<dyn ConfigBackend>) -> BackendRegistry {
    let mut registry = BackendRegistry::new();
    registry.register("primary", backend);
    registry.set_default("primary").expect("default backend is registered");
    registry
}

pub fn item(environment: &str, key: &str, value: &str) -> ConfigItem {
    ConfigItem::new("t1", "p1", environment, key).with_value(value)
}

//! Pluggable config center backends
//!
//! Every backend exposes the same [`ConfigBackend`] surface and is composed of
//! a key mapper, an [`AccessProvisioner`] and the technology's transport.
//!
//! ## Supported Backends
//!
//! - **etcd**: keys under a configurable root, MVCC revision history
//!   (requires the `etcd` feature for the network transport)
//! - **Nacos**: HTTP open API with hashed namespaces and native history

pub mod access;
pub mod backend;
pub mod etcd;
pub mod history;
pub mod nacos;
pub mod provisioner;
pub mod registry;

pub use access::{AccessControl, BackendNamespace, PermissionGrant, ProvisioningPlan, RoleBinding};
pub use backend::{BackendKind, ConfigBackend};
pub use etcd::EtcdConfigBackend;
pub use history::{revision_walk, RevisionMeta, HISTORY_LIMIT};
pub use nacos::NacosConfigBackend;
pub use provisioner::{AccessProvisioner, GrantStrategy, ProvisioningPolicy};
pub use registry::BackendRegistry;

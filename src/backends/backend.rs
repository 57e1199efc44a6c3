//! Config backend trait and types
//!
//! Defines the operation surface every configuration center implements.

use crate::domain::{Account, ConfigItem, HistoryVersion, ListOptions};
use crate::errors::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Type of config backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// etcd v3 key-value store
    Etcd,
    /// Nacos HTTP config center
    Nacos,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Etcd => "etcd",
            Self::Nacos => "nacos",
        }
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "etcd" => Ok(Self::Etcd),
            "nacos" => Ok(Self::Nacos),
            _ => Err(format!("Unknown config backend type: {}", s)),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Trait for config backends
///
/// Every operation that touches backend storage validates identity first and
/// then provisions the namespace principals. `accounts` and `base_info` are
/// pure and never reach the network.
///
/// Implementations must be Send + Sync; one instance is shared by all callers
/// of a backend endpoint.
#[async_trait]
pub trait ConfigBackend: Send + Sync + fmt::Debug {
    fn kind(&self) -> BackendKind;

    /// Backend addressing details for an item (`provider` plus backend-native ids).
    fn base_info(&self, item: &ConfigItem) -> Result<BTreeMap<String, String>>;

    /// Fill `item.value` (and revision metadata) from the backend.
    ///
    /// A non-zero `item.revision` reads that historical revision.
    async fn get(&self, item: &mut ConfigItem) -> Result<()>;

    /// Create or overwrite the value at the item's address.
    async fn publish(&self, item: &ConfigItem) -> Result<()>;

    /// Remove the item; a missing key is not an error.
    async fn delete(&self, item: &ConfigItem) -> Result<()>;

    /// Items under the option's tenant/project[/environment] scope.
    async fn list(&self, options: &ListOptions) -> Result<Vec<ConfigItem>>;

    /// Previous versions of a key, most recent first.
    async fn history(&self, item: &ConfigItem) -> Result<Vec<HistoryVersion>>;

    /// The read and read-write principals of the item's namespace.
    fn accounts(&self, item: &ConfigItem) -> Result<Vec<Account>>;

    /// Best-effort listener status, keyed by listener group key.
    async fn listener_status(&self, item: &ConfigItem) -> Result<BTreeMap<String, String>>;
}

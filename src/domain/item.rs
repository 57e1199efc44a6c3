//! Configuration item identity and value types.

use crate::errors::{GantryError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single configuration value addressed by `(tenant, project, environment, key)`.
///
/// `revision` is a backend-specific marker; `0` always means "latest".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigItem {
    pub tenant: String,
    pub project: String,
    /// Advisory tag, carried as metadata and never part of addressing
    pub application: String,
    pub environment: String,
    pub key: String,
    pub value: String,
    #[serde(rename = "rev")]
    pub revision: i64,
    pub created_time: String,
    pub last_modified_time: String,
    pub last_update_user: String,
}

impl ConfigItem {
    /// Identity-only item, as used for get/delete/history.
    pub fn new(
        tenant: impl Into<String>,
        project: impl Into<String>,
        environment: impl Into<String>,
        key: impl Into<String>,
    ) -> Self {
        Self {
            tenant: tenant.into(),
            project: project.into(),
            environment: environment.into(),
            key: key.into(),
            ..Default::default()
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    pub fn with_application(mut self, application: impl Into<String>) -> Self {
        self.application = application.into();
        self
    }

    pub fn with_revision(mut self, revision: i64) -> Self {
        self.revision = revision;
        self
    }

    /// Fails with `InvalidIdentity` unless tenant and project are both set.
    pub fn validate_identity(&self) -> Result<()> {
        if self.tenant.is_empty() || self.project.is_empty() {
            return Err(GantryError::invalid_identity("tenant and project must be specified"));
        }
        Ok(())
    }

    /// The namespace this item belongs to.
    pub fn scope(&self) -> Scope {
        Scope {
            tenant: self.tenant.clone(),
            project: self.project.clone(),
            environment: self.environment.clone(),
        }
    }
}

impl fmt::Display for ConfigItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}/{}", self.tenant, self.project, self.environment, self.key)
    }
}

/// `tenant/project[/environment]` grouping used for listing and synchronization.
///
/// An empty `environment` means the whole project.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Scope {
    pub tenant: String,
    pub project: String,
    pub environment: String,
}

impl Scope {
    pub fn new(
        tenant: impl Into<String>,
        project: impl Into<String>,
        environment: impl Into<String>,
    ) -> Self {
        Self { tenant: tenant.into(), project: project.into(), environment: environment.into() }
    }

    /// Item carrying only this scope's identity (empty key).
    pub fn to_item(&self) -> ConfigItem {
        ConfigItem::new(&self.tenant, &self.project, &self.environment, "")
    }

    pub fn contains(&self, item: &ConfigItem) -> bool {
        item.tenant == self.tenant
            && item.project == self.project
            && (self.environment.is_empty() || item.environment == self.environment)
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.environment.is_empty() {
            write!(f, "{}/{}", self.tenant, self.project)
        } else {
            write!(f, "{}/{}/{}", self.tenant, self.project, self.environment)
        }
    }
}

/// Listing request: a scope item plus 1-based pagination.
///
/// Non-positive `page`/`size` are replaced by backend defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListOptions {
    #[serde(flatten)]
    pub item: ConfigItem,
    pub page: i64,
    pub size: i64,
}

impl ListOptions {
    pub fn new(item: ConfigItem, page: i64, size: i64) -> Self {
        Self { item, page, size }
    }

    /// `(page, size)` with non-positive values replaced by the given defaults.
    pub fn normalized(&self, default_size: i64) -> (i64, i64) {
        let page = if self.page <= 0 { 1 } else { self.page };
        let size = if self.size <= 0 { default_size } else { self.size };
        (page, size)
    }
}

/// One reconstructed historical version of a key, most recent first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryVersion {
    #[serde(rename = "rev")]
    pub revision: String,
    pub version: String,
    pub last_update_time: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_validation() {
        assert!(ConfigItem::new("t1", "p1", "", "").validate_identity().is_ok());

        let err = ConfigItem::new("", "p1", "dev", "k").validate_identity().unwrap_err();
        assert!(matches!(err, GantryError::InvalidIdentity { .. }));

        let err = ConfigItem::new("t1", "", "dev", "k").validate_identity().unwrap_err();
        assert!(matches!(err, GantryError::InvalidIdentity { .. }));
    }

    #[test]
    fn test_list_options_normalization() {
        let opts = ListOptions::new(ConfigItem::new("t", "p", "", ""), 0, -3);
        assert_eq!(opts.normalized(10), (1, 10));

        let opts = ListOptions::new(ConfigItem::new("t", "p", "", ""), 3, 25);
        assert_eq!(opts.normalized(10), (3, 25));
    }

    #[test]
    fn test_scope_contains() {
        let project = Scope::new("t", "p", "");
        let dev = Scope::new("t", "p", "dev");
        let item = ConfigItem::new("t", "p", "prod", "k");

        assert!(project.contains(&item));
        assert!(!dev.contains(&item));
        assert_eq!(dev.to_string(), "t/p/dev");
        assert_eq!(project.to_string(), "t/p");
    }

    #[test]
    fn test_item_json_field_names() {
        let item = ConfigItem::new("t", "p", "dev", "k").with_value("v").with_revision(7);
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["rev"], 7);
        assert_eq!(json["lastUpdateUser"], "");
        assert_eq!(json["createdTime"], "");
    }
}

//! Key layout for etcd.
//!
//! Items live at `{root}/{tenant}/{project}/{environment}/{key}`. A namespace
//! is everything under `{root}/{tenant}/{project}/{environment}`; its two
//! principals are named after that prefix with `-r` / `-rw` suffixes, and
//! each role carries the same name as its user.

use crate::backends::access::{PermissionGrant, PrincipalPlan, ProvisioningPlan, RoleBinding};
use crate::domain::{Access, Account, ConfigItem};
use crate::errors::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EtcdKeyMapper {
    root: String,
}

impl EtcdKeyMapper {
    pub fn new(root: impl Into<String>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    /// Full address of the item.
    pub fn key(&self, item: &ConfigItem) -> Result<String> {
        item.validate_identity()?;
        Ok(format!(
            "{}/{}/{}/{}/{}",
            self.root, item.tenant, item.project, item.environment, item.key
        ))
    }

    /// Listing prefix at project or environment scope.
    ///
    /// The trailing `/` keeps project `p1` from matching `p10`.
    pub fn list_key(&self, item: &ConfigItem) -> Result<String> {
        item.validate_identity()?;
        if item.environment.is_empty() {
            Ok(format!("{}/{}/{}/", self.root, item.tenant, item.project))
        } else {
            Ok(format!("{}/{}/{}/{}/", self.root, item.tenant, item.project, item.environment))
        }
    }

    /// Namespace prefix that principals and permissions are scoped to.
    pub fn ns_prefix(&self, item: &ConfigItem) -> Result<String> {
        item.validate_identity()?;
        Ok(format!("{}/{}/{}/{}", self.root, item.tenant, item.project, item.environment))
    }

    pub fn accounts(&self, item: &ConfigItem) -> Result<Vec<Account>> {
        Ok(self.plan(item)?.accounts())
    }

    /// Provisioning target for the item's namespace.
    pub fn plan(&self, item: &ConfigItem) -> Result<ProvisioningPlan> {
        let prefix = self.ns_prefix(item)?;
        let principal = |access: Access| {
            let name = format!("{}-{}", prefix, access.as_str());
            PrincipalPlan {
                account: Account::derived(name.clone()),
                role: RoleBinding::new(name.clone()),
                grant: PermissionGrant {
                    role: name.clone(),
                    username: name,
                    resource: prefix.clone(),
                    range_end: Some(prefix_range_end(&prefix)),
                    access,
                },
            }
        };
        Ok(ProvisioningPlan {
            namespace: None,
            read: principal(Access::Read),
            read_write: principal(Access::ReadWrite),
        })
    }

    /// Rebuild an item from a stored key; `None` for keys outside the layout.
    pub fn parse_key(&self, key: &str, value: &str) -> Option<ConfigItem> {
        let segments: Vec<&str> = key.split('/').collect();
        if segments.len() != 5 || segments[0] != self.root {
            return None;
        }
        Some(ConfigItem::new(segments[1], segments[2], segments[3], segments[4]).with_value(value))
    }
}

/// Exclusive end of the key range covering every key with `prefix`.
///
/// Increments the last byte that is not `0xff` and truncates after it. A
/// prefix made only of `0xff` bytes (or an empty one) yields `\0`, which etcd
/// reads as "to the end of the keyspace".
pub fn prefix_range_end(prefix: &str) -> Vec<u8> {
    let mut end = prefix.as_bytes().to_vec();
    while let Some(last) = end.pop() {
        if last < 0xff {
            end.push(last + 1);
            return end;
        }
    }
    vec![0]
}

//! Addressing for Nacos.
//!
//! A tenant/project pair becomes one Nacos namespace whose id is a stable
//! content hash, the environment becomes the group and the key becomes the
//! data id. The application travels as `appName` metadata only.

use crate::backends::access::{
    BackendNamespace, PermissionGrant, PrincipalPlan, ProvisioningPlan, RoleBinding,
};
use crate::domain::{Access, Account, ConfigItem};
use crate::errors::Result;
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NacosKeyMapper {
    root: String,
}

impl NacosKeyMapper {
    pub fn new(root: impl Into<String>) -> Self {
        Self { root: root.into() }
    }

    /// Hashed namespace id for the item's tenant/project.
    pub fn tenant_id(&self, item: &ConfigItem) -> Result<String> {
        item.validate_identity()?;
        let mut hasher = Sha256::new();
        hasher.update(format!("{}_{}_{}", self.root, item.tenant, item.project).as_bytes());
        Ok(hex::encode(hasher.finalize()))
    }

    /// Human-readable namespace name, `{root}/{tenant}/{project}`.
    pub fn namespace_name(&self, item: &ConfigItem) -> Result<String> {
        item.validate_identity()?;
        Ok(format!("{}/{}/{}", self.root, item.tenant, item.project))
    }

    pub fn group<'a>(&self, item: &'a ConfigItem) -> &'a str {
        &item.environment
    }

    pub fn data_id<'a>(&self, item: &'a ConfigItem) -> &'a str {
        &item.key
    }

    /// Permission resource covering one group of the namespace.
    pub fn resource(&self, item: &ConfigItem) -> Result<String> {
        Ok(format!("{}:{}", self.tenant_id(item)?, item.environment))
    }

    pub fn accounts(&self, item: &ConfigItem) -> Result<Vec<Account>> {
        Ok(self.plan(item)?.accounts())
    }

    pub fn plan(&self, item: &ConfigItem) -> Result<ProvisioningPlan> {
        let namespace =
            BackendNamespace { id: self.tenant_id(item)?, name: self.namespace_name(item)? };
        let resource = self.resource(item)?;
        let principal = |access: Access| {
            let name = format!("{}:{}:{}", namespace.name, item.environment, access.as_str());
            PrincipalPlan {
                account: Account::derived(name.clone()),
                role: RoleBinding::bound_to(name.clone(), name.clone()),
                grant: PermissionGrant {
                    role: name.clone(),
                    username: name,
                    resource: resource.clone(),
                    range_end: None,
                    access,
                },
            }
        };
        let read = principal(Access::Read);
        let read_write = principal(Access::ReadWrite);
        Ok(ProvisioningPlan { namespace: Some(namespace), read, read_write })
    }
}

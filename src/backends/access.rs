//! Access-control capability interface.
//!
//! Each config center exposes its own user/role/permission API. The
//! [`AccessControl`] trait is the transport-facing half of provisioning: it
//! only lists and creates. Ordering, caching and tie-break policy live in
//! [`AccessProvisioner`](super::provisioner::AccessProvisioner).

use crate::domain::{Access, Account};
use crate::errors::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Backend-side namespace (the Nacos "tenant") that must exist before any
/// config inside it can be addressed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BackendNamespace {
    pub id: String,
    pub name: String,
}

/// A role, optionally bound to the user that carries it.
///
/// Backends that bind users to roles in a separate grant step (etcd) report
/// and request roles without a user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoleBinding {
    pub role: String,
    pub username: Option<String>,
}

impl RoleBinding {
    pub fn new(role: impl Into<String>) -> Self {
        Self { role: role.into(), username: None }
    }

    pub fn bound_to(role: impl Into<String>, username: impl Into<String>) -> Self {
        Self { role: role.into(), username: Some(username.into()) }
    }

    /// Whether this listed binding fulfils `wanted`.
    pub fn satisfies(&self, wanted: &RoleBinding) -> bool {
        self.role == wanted.role
            && (wanted.username.is_none() || self.username == wanted.username)
    }
}

/// Permission of a role over a namespace resource.
///
/// `resource` is backend-native: a key prefix for etcd, `tenantId:group` for
/// Nacos. `range_end` bounds prefix permissions on range-based stores.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PermissionGrant {
    pub role: String,
    pub username: String,
    pub resource: String,
    pub range_end: Option<Vec<u8>>,
    pub access: Access,
}

impl PermissionGrant {
    /// Whether this listed grant fulfils `wanted`.
    pub fn satisfies(&self, wanted: &PermissionGrant) -> bool {
        self.role == wanted.role && self.resource == wanted.resource && self.access == wanted.access
    }
}

/// Everything one namespace principal needs: its account, its role and the
/// grant binding that role to the namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalPlan {
    pub account: Account,
    pub role: RoleBinding,
    pub grant: PermissionGrant,
}

/// The provisioning target for one namespace, derived purely from identity.
///
/// `principals()` always yields the read principal before the read-write one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisioningPlan {
    pub namespace: Option<BackendNamespace>,
    pub read: PrincipalPlan,
    pub read_write: PrincipalPlan,
}

impl ProvisioningPlan {
    pub fn principals(&self) -> [&PrincipalPlan; 2] {
        [&self.read, &self.read_write]
    }

    /// The two derived accounts, read first.
    pub fn accounts(&self) -> Vec<Account> {
        vec![self.read.account.clone(), self.read_write.account.clone()]
    }
}

/// List/create primitives of a config center's auth subsystem.
///
/// Namespace and permission listing have no-op defaults for stores without a
/// namespace concept or without a permission listing API.
#[async_trait]
pub trait AccessControl: Send + Sync {
    async fn list_namespaces(&self) -> Result<Vec<BackendNamespace>> {
        Ok(Vec::new())
    }

    async fn create_namespace(&self, _namespace: &BackendNamespace) -> Result<()> {
        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<String>>;

    async fn create_user(&self, account: &Account) -> Result<()>;

    async fn list_roles(&self) -> Result<Vec<RoleBinding>>;

    async fn create_role(&self, role: &RoleBinding) -> Result<()>;

    async fn list_permissions(&self) -> Result<Vec<PermissionGrant>> {
        Ok(Vec::new())
    }

    async fn grant_permission(&self, grant: &PermissionGrant) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_binding_matching() {
        let wanted = RoleBinding::bound_to("ns:dev:r", "ns:dev:r");
        assert!(RoleBinding::bound_to("ns:dev:r", "ns:dev:r").satisfies(&wanted));
        assert!(!RoleBinding::bound_to("ns:dev:r", "someone-else").satisfies(&wanted));
        assert!(!RoleBinding::new("ns:dev:r").satisfies(&wanted));

        let unbound = RoleBinding::new("root/t/p/dev-r");
        assert!(RoleBinding::new("root/t/p/dev-r").satisfies(&unbound));
        assert!(RoleBinding::bound_to("root/t/p/dev-r", "x").satisfies(&unbound));
    }

    #[test]
    fn test_permission_matching_ignores_range_and_user() {
        let wanted = PermissionGrant {
            role: "r".to_string(),
            username: "u".to_string(),
            resource: "tid:dev".to_string(),
            range_end: None,
            access: Access::Read,
        };
        let listed = PermissionGrant { username: String::new(), ..wanted.clone() };
        assert!(listed.satisfies(&wanted));

        let wrong_access = PermissionGrant { access: Access::ReadWrite, ..wanted.clone() };
        assert!(!wrong_access.satisfies(&wanted));
    }
}

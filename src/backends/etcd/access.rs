//! etcd auth subsystem as an [`AccessControl`] capability.
//!
//! etcd has no namespace objects and no permission listing, so those keep the
//! trait defaults. Roles are unbound until a grant, which both attaches the
//! key-range permission and binds the role to its user.

use super::transport::EtcdTransport;
use crate::backends::access::{AccessControl, PermissionGrant, RoleBinding};
use crate::domain::Account;
use crate::errors::{GantryError, Result};
use async_trait::async_trait;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct EtcdAccessControl {
    transport: Arc<dyn EtcdTransport>,
}

impl EtcdAccessControl {
    pub fn new(transport: Arc<dyn EtcdTransport>) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl AccessControl for EtcdAccessControl {
    async fn list_users(&self) -> Result<Vec<String>> {
        self.transport.user_list().await
    }

    async fn create_user(&self, account: &Account) -> Result<()> {
        self.transport.user_add(&account.username, &account.password).await
    }

    async fn list_roles(&self) -> Result<Vec<RoleBinding>> {
        Ok(self.transport.role_list().await?.into_iter().map(RoleBinding::new).collect())
    }

    async fn create_role(&self, role: &RoleBinding) -> Result<()> {
        self.transport.role_add(&role.role).await
    }

    async fn grant_permission(&self, grant: &PermissionGrant) -> Result<()> {
        let range_end = grant.range_end.as_deref().ok_or_else(|| {
            GantryError::internal(format!("etcd grant for role '{}' has no range end", grant.role))
        })?;
        self.transport
            .role_grant_permission(&grant.role, &grant.resource, range_end, grant.access)
            .await?;
        self.transport.user_grant_role(&grant.username, &grant.role).await
    }
}

//! Lazy access provisioning with an optimistic fact cache.
//!
//! Before any storage call a backend asks the provisioner to make sure its
//! namespace has a read principal and a read-write principal, each made of a
//! user, a role and a permission grant. Provisioning runs as four independent
//! steps, always in this order:
//!
//! 1. backend namespace (only for stores that have one)
//! 2. users
//! 3. roles
//! 4. permission grants
//!
//! Each step first checks its own cached fact. A fresh cache entry that
//! already contains the wanted object short-circuits that step. Otherwise the
//! step re-lists the object kind from the backend (authoritative), creates
//! what is still missing and records the result. Within every step the read
//! principal is handled before the read-write principal.
//!
//! All slow-path work is serialized by one lock per provisioner. The TTLs only
//! let callers skip that lock; the lock plus the re-list is what prevents
//! duplicate creates when callers race on the same namespace.
//!
//! Failures abort with [`GantryError::ProvisioningFailed`]. Nothing is rolled
//! back: objects created before the failure stay, and the next call picks up
//! from the first missing one.

use super::access::{
    AccessControl, BackendNamespace, PermissionGrant, PrincipalPlan, ProvisioningPlan, RoleBinding,
};
use super::backend::BackendKind;
use crate::errors::{GantryError, Result};
use crate::observability::MetricsRecorder;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

/// How permission grants are decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantStrategy {
    /// List grants and create the missing ones (Nacos).
    Listed,
    /// Grant whenever the principal's user or role was created by this
    /// provisioner and not yet granted, so a new role is never left unbound
    /// (etcd).
    OnFreshPrincipal,
}

/// Cache lifetimes and grant strategy for one backend technology.
///
/// A `None` TTL means a fact, once listed, stays valid for the provisioner's
/// lifetime.
#[derive(Debug, Clone)]
pub struct ProvisioningPolicy {
    pub namespace_ttl: Option<Duration>,
    pub users_ttl: Option<Duration>,
    pub roles_ttl: Option<Duration>,
    pub permissions_ttl: Option<Duration>,
    pub grants: GrantStrategy,
}

impl ProvisioningPolicy {
    pub fn nacos() -> Self {
        Self {
            namespace_ttl: Some(Duration::from_secs(10 * 60)),
            users_ttl: Some(Duration::from_secs(30 * 60)),
            roles_ttl: Some(Duration::from_secs(30 * 60)),
            permissions_ttl: Some(Duration::from_secs(30 * 60)),
            grants: GrantStrategy::Listed,
        }
    }

    pub fn etcd() -> Self {
        Self {
            namespace_ttl: None,
            users_ttl: None,
            roles_ttl: None,
            permissions_ttl: None,
            grants: GrantStrategy::OnFreshPrincipal,
        }
    }
}

/// Last listing of one object kind.
#[derive(Debug)]
struct Fact<T> {
    entries: Vec<T>,
    refreshed_at: Option<Instant>,
}

impl<T> Default for Fact<T> {
    fn default() -> Self {
        Self { entries: Vec::new(), refreshed_at: None }
    }
}

impl<T> Fact<T> {
    fn is_fresh(&self, ttl: Option<Duration>) -> bool {
        match (self.refreshed_at, ttl) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(at), Some(ttl)) => at.elapsed() <= ttl,
        }
    }

    fn holds(&self, ttl: Option<Duration>, wanted: impl Fn(&T) -> bool) -> bool {
        self.is_fresh(ttl) && self.entries.iter().any(wanted)
    }

    fn replace(&mut self, entries: Vec<T>) {
        self.entries = entries;
        self.refreshed_at = Some(Instant::now());
    }
}

/// Known backend objects, owned by one provisioner.
#[derive(Debug, Default)]
pub struct ProvisioningCache {
    namespaces: Fact<BackendNamespace>,
    users: Fact<String>,
    roles: Fact<RoleBinding>,
    permissions: Fact<PermissionGrant>,
    /// Principals created here whose grant has not succeeded yet.
    pending_grants: HashSet<String>,
}

/// Ensures namespace principals exist before backend operations.
///
/// One instance per backend endpoint; safe to share across tasks.
pub struct AccessProvisioner {
    kind: BackendKind,
    access: Arc<dyn AccessControl>,
    policy: ProvisioningPolicy,
    cache: RwLock<ProvisioningCache>,
    lock: Mutex<()>,
}

impl std::fmt::Debug for AccessProvisioner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessProvisioner")
            .field("kind", &self.kind)
            .field("policy", &self.policy)
            .finish()
    }
}

impl AccessProvisioner {
    pub fn new(
        kind: BackendKind,
        access: Arc<dyn AccessControl>,
        policy: ProvisioningPolicy,
    ) -> Self {
        Self {
            kind,
            access,
            policy,
            cache: RwLock::new(ProvisioningCache::default()),
            lock: Mutex::new(()),
        }
    }

    pub fn policy(&self) -> &ProvisioningPolicy {
        &self.policy
    }

    /// Make sure every object in `plan` exists.
    pub async fn ensure(&self, plan: &ProvisioningPlan) -> Result<()> {
        if self.is_satisfied(plan).await {
            debug!(backend = %self.kind, user = %plan.read.account.username, "Provisioning cache hit");
            return Ok(());
        }

        let _guard = self.lock.lock().await;

        // A concurrent caller may have finished the same namespace while we waited.
        if self.is_satisfied(plan).await {
            return Ok(());
        }

        self.ensure_namespace(plan).await?;
        self.ensure_users(plan).await?;
        self.ensure_roles(plan).await?;
        self.ensure_grants(plan).await?;
        Ok(())
    }

    async fn is_satisfied(&self, plan: &ProvisioningPlan) -> bool {
        let cache = self.cache.read().await;
        let namespace_ready = match &plan.namespace {
            Some(namespace) => cache.namespaces.holds(self.policy.namespace_ttl, |n| n == namespace),
            None => true,
        };
        namespace_ready
            && plan.principals().iter().all(|principal| {
                self.user_cached(&cache, principal)
                    && self.role_cached(&cache, principal)
                    && self.grant_cached(&cache, principal)
            })
    }

    fn user_cached(&self, cache: &ProvisioningCache, principal: &PrincipalPlan) -> bool {
        cache.users.holds(self.policy.users_ttl, |u| *u == principal.account.username)
    }

    fn role_cached(&self, cache: &ProvisioningCache, principal: &PrincipalPlan) -> bool {
        cache.roles.holds(self.policy.roles_ttl, |r| r.satisfies(&principal.role))
    }

    fn grant_cached(&self, cache: &ProvisioningCache, principal: &PrincipalPlan) -> bool {
        match self.policy.grants {
            GrantStrategy::OnFreshPrincipal => !cache.pending_grants.contains(&principal.grant.role),
            GrantStrategy::Listed => cache
                .permissions
                .holds(self.policy.permissions_ttl, |p| p.satisfies(&principal.grant)),
        }
    }

    async fn ensure_namespace(&self, plan: &ProvisioningPlan) -> Result<()> {
        let Some(namespace) = &plan.namespace else {
            return Ok(());
        };
        if self.cache.read().await.namespaces.holds(self.policy.namespace_ttl, |n| n == namespace) {
            return Ok(());
        }

        let listed = self
            .access
            .list_namespaces()
            .await
            .map_err(|e| GantryError::provisioning("list namespaces", e))?;
        let exists = listed.contains(namespace);
        self.cache.write().await.namespaces.replace(listed);

        if !exists {
            self.access
                .create_namespace(namespace)
                .await
                .map_err(|e| GantryError::provisioning("create namespace", e))?;
            self.cache.write().await.namespaces.entries.push(namespace.clone());
            self.record_create("namespace");
            info!(backend = %self.kind, namespace = %namespace.name, "Created backend namespace");
        }
        Ok(())
    }

    async fn ensure_users(&self, plan: &ProvisioningPlan) -> Result<()> {
        let principals = plan.principals();
        {
            let cache = self.cache.read().await;
            if principals.iter().all(|p| self.user_cached(&cache, p)) {
                return Ok(());
            }
        }

        let listed =
            self.access.list_users().await.map_err(|e| GantryError::provisioning("list users", e))?;
        let missing = principals.map(|p| !listed.contains(&p.account.username));
        self.cache.write().await.users.replace(listed);

        for (idx, principal) in principals.iter().enumerate() {
            if !missing[idx] {
                continue;
            }
            self.access
                .create_user(&principal.account)
                .await
                .map_err(|e| GantryError::provisioning("create user", e))?;
            let mut cache = self.cache.write().await;
            cache.users.entries.push(principal.account.username.clone());
            self.mark_pending(&mut cache, principal);
            drop(cache);
            self.record_create("user");
            info!(backend = %self.kind, user = %principal.account.username, "Created namespace user");
        }
        Ok(())
    }

    async fn ensure_roles(&self, plan: &ProvisioningPlan) -> Result<()> {
        let principals = plan.principals();
        {
            let cache = self.cache.read().await;
            if principals.iter().all(|p| self.role_cached(&cache, p)) {
                return Ok(());
            }
        }

        let listed =
            self.access.list_roles().await.map_err(|e| GantryError::provisioning("list roles", e))?;
        let missing = principals.map(|p| !listed.iter().any(|r| r.satisfies(&p.role)));
        self.cache.write().await.roles.replace(listed);

        for (idx, principal) in principals.iter().enumerate() {
            if !missing[idx] {
                continue;
            }
            self.access
                .create_role(&principal.role)
                .await
                .map_err(|e| GantryError::provisioning("create role", e))?;
            let mut cache = self.cache.write().await;
            cache.roles.entries.push(principal.role.clone());
            self.mark_pending(&mut cache, principal);
            drop(cache);
            self.record_create("role");
            info!(backend = %self.kind, role = %principal.role.role, "Created namespace role");
        }
        Ok(())
    }

    fn mark_pending(&self, cache: &mut ProvisioningCache, principal: &PrincipalPlan) {
        if self.policy.grants == GrantStrategy::OnFreshPrincipal {
            cache.pending_grants.insert(principal.grant.role.clone());
        }
    }

    async fn ensure_grants(&self, plan: &ProvisioningPlan) -> Result<()> {
        let principals = plan.principals();
        let needs_grant = match self.policy.grants {
            GrantStrategy::OnFreshPrincipal => {
                let cache = self.cache.read().await;
                let pending = principals.map(|p| cache.pending_grants.contains(&p.grant.role));
                pending
            }
            GrantStrategy::Listed => {
                {
                    let cache = self.cache.read().await;
                    if principals.iter().all(|p| self.grant_cached(&cache, p)) {
                        return Ok(());
                    }
                }
                let listed = self
                    .access
                    .list_permissions()
                    .await
                    .map_err(|e| GantryError::provisioning("list permissions", e))?;
                let missing = principals.map(|p| !listed.iter().any(|g| g.satisfies(&p.grant)));
                self.cache.write().await.permissions.replace(listed);
                missing
            }
        };

        for (idx, principal) in principals.iter().enumerate() {
            if !needs_grant[idx] {
                continue;
            }
            self.access
                .grant_permission(&principal.grant)
                .await
                .map_err(|e| GantryError::provisioning("grant permission", e))?;
            match self.policy.grants {
                GrantStrategy::Listed => {
                    self.cache.write().await.permissions.entries.push(principal.grant.clone())
                }
                GrantStrategy::OnFreshPrincipal => {
                    self.cache.write().await.pending_grants.remove(&principal.grant.role);
                }
            }
            self.record_create("permission");
            info!(
                backend = %self.kind,
                role = %principal.grant.role,
                resource = %principal.grant.resource,
                access = %principal.grant.access,
                "Granted namespace permission"
            );
        }
        Ok(())
    }

    fn record_create(&self, kind: &'static str) {
        MetricsRecorder::new().record_provisioning_create(self.kind.as_str(), kind);
    }
}

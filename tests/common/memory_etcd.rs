//! In-memory etcd model.
//!
//! Keeps an append-only event log so reads at any past revision return the
//! record as etcd would (`version`, `mod_revision`, `create_revision`). The
//! auth subsystem rejects duplicate users and roles like a real cluster.

use async_trait::async_trait;
use gantry::backends::etcd::{EtcdTransport, KvRecord};
use gantry::domain::Access;
use gantry::errors::{GantryError, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RolePermission {
    pub key: String,
    pub range_end: Vec<u8>,
    pub access: Access,
}

#[derive(Debug, Default)]
struct State {
    revision: i64,
    /// `(revision, key, value)`; `None` marks a delete
    events: Vec<(i64, String, Option<String>)>,
    users: BTreeMap<String, (String, BTreeSet<String>)>,
    roles: BTreeMap<String, Vec<RolePermission>>,
    calls: Vec<String>,
}

impl State {
    fn record_at(&self, key: &str, at: i64) -> Option<KvRecord> {
        let mut record: Option<KvRecord> = None;
        for (revision, event_key, value) in &self.events {
            if *revision > at {
                break;
            }
            if event_key != key {
                continue;
            }
            record = value.as_ref().map(|value| match record.take() {
                Some(previous) => KvRecord {
                    key: key.to_string(),
                    value: value.clone(),
                    version: previous.version + 1,
                    mod_revision: *revision,
                    create_revision: previous.create_revision,
                },
                None => KvRecord {
                    key: key.to_string(),
                    value: value.clone(),
                    version: 1,
                    mod_revision: *revision,
                    create_revision: *revision,
                },
            });
        }
        record
    }

    fn keys(&self) -> BTreeSet<String> {
        self.events.iter().map(|(_, key, _)| key.clone()).collect()
    }
}

#[derive(Debug, Default)]
pub struct MemoryEtcd {
    state: Mutex<State>,
}

impl MemoryEtcd {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write a key directly, bypassing the backend.
    pub fn seed(&self, key: &str, value: &str) {
        let mut state = self.state.lock().unwrap();
        state.revision += 1;
        let revision = state.revision;
        state.events.push((revision, key.to_string(), Some(value.to_string())));
    }

    pub fn revision(&self) -> i64 {
        self.state.lock().unwrap().revision
    }

    pub fn value(&self, key: &str) -> Option<String> {
        let state = self.state.lock().unwrap();
        state.record_at(key, state.revision).map(|record| record.value)
    }

    /// Every transport call so far, e.g. `put root/t1/p1/dev/A`.
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn calls_starting_with(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|call| call.starts_with(prefix)).count()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    pub fn users(&self) -> Vec<String> {
        self.state.lock().unwrap().users.keys().cloned().collect()
    }

    pub fn roles_of(&self, user: &str) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state.users.get(user).map(|(_, roles)| roles.iter().cloned().collect()).unwrap_or_default()
    }

    pub fn password_of(&self, user: &str) -> Option<String> {
        self.state.lock().unwrap().users.get(user).map(|(password, _)| password.clone())
    }

    pub fn permissions_of(&self, role: &str) -> Vec<RolePermission> {
        self.state.lock().unwrap().roles.get(role).cloned().unwrap_or_default()
    }

    fn log(&self, call: String) {
        self.state.lock().unwrap().calls.push(call);
    }
}

fn in_range(key: &str, start: &str, range_end: &[u8]) -> bool {
    key >= start && (range_end == [0] || key.as_bytes() < range_end)
}

#[async_trait]
impl EtcdTransport for MemoryEtcd {
    async fn get(&self, key: &str, revision: i64) -> Result<Vec<KvRecord>> {
        self.log(format!("get {}@{}", key, revision));
        let state = self.state.lock().unwrap();
        if revision > state.revision {
            return Err(GantryError::rejected("etcd", 11, "required revision is a future revision"));
        }
        let at = if revision > 0 { revision } else { state.revision };
        Ok(state.record_at(key, at).into_iter().collect())
    }

    async fn range(&self, start: &str, range_end: &[u8]) -> Result<Vec<KvRecord>> {
        self.log(format!("range {}", start));
        let state = self.state.lock().unwrap();
        Ok(state
            .keys()
            .into_iter()
            .filter(|key| in_range(key, start, range_end))
            .filter_map(|key| state.record_at(&key, state.revision))
            .collect())
    }

    async fn put(&self, key: &str, value: &str) -> Result<()> {
        self.log(format!("put {}", key));
        let mut state = self.state.lock().unwrap();
        state.revision += 1;
        let revision = state.revision;
        state.events.push((revision, key.to_string(), Some(value.to_string())));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.log(format!("delete {}", key));
        let mut state = self.state.lock().unwrap();
        if state.record_at(key, state.revision).is_some() {
            state.revision += 1;
            let revision = state.revision;
            state.events.push((revision, key.to_string(), None));
        }
        Ok(())
    }

    async fn user_list(&self) -> Result<Vec<String>> {
        self.log("user_list".to_string());
        Ok(self.users())
    }

    async fn user_add(&self, name: &str, password: &str) -> Result<()> {
        self.log(format!("user_add {}", name));
        let mut state = self.state.lock().unwrap();
        if state.users.contains_key(name) {
            return Err(GantryError::rejected("etcd", 9, "user name already exists"));
        }
        state.users.insert(name.to_string(), (password.to_string(), BTreeSet::new()));
        Ok(())
    }

    async fn role_list(&self) -> Result<Vec<String>> {
        self.log("role_list".to_string());
        Ok(self.state.lock().unwrap().roles.keys().cloned().collect())
    }

    async fn role_add(&self, name: &str) -> Result<()> {
        self.log(format!("role_add {}", name));
        let mut state = self.state.lock().unwrap();
        if state.roles.contains_key(name) {
            return Err(GantryError::rejected("etcd", 9, "role name already exists"));
        }
        state.roles.insert(name.to_string(), Vec::new());
        Ok(())
    }

    async fn role_grant_permission(
        &self,
        role: &str,
        key: &str,
        range_end: &[u8],
        access: Access,
    ) -> Result<()> {
        self.log(format!("role_grant_permission {}", role));
        let mut state = self.state.lock().unwrap();
        let permissions = state
            .roles
            .get_mut(role)
            .ok_or_else(|| GantryError::rejected("etcd", 5, "role name not found"))?;
        let permission = RolePermission { key: key.to_string(), range_end: range_end.to_vec(), access };
        if !permissions.contains(&permission) {
            permissions.push(permission);
        }
        Ok(())
    }

    async fn user_grant_role(&self, user: &str, role: &str) -> Result<()> {
        self.log(format!("user_grant_role {} {}", user, role));
        let mut state = self.state.lock().unwrap();
        if !state.roles.contains_key(role) {
            return Err(GantryError::rejected("etcd", 5, "role name not found"));
        }
        let (_, roles) = state
            .users
            .get_mut(user)
            .ok_or_else(|| GantryError::rejected("etcd", 5, "user name not found"))?;
        roles.insert(role.to_string());
        Ok(())
    }
}

//! etcd wire boundary.
//!
//! [`EtcdTransport`] covers exactly the KV and auth RPCs the backend needs so
//! the backend logic can run against any implementation. The production
//! implementation wraps `etcd-client` and is compiled with the `etcd` feature.

use crate::domain::Access;
use crate::errors::Result;
use async_trait::async_trait;

/// One key-value record with its MVCC metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KvRecord {
    pub key: String,
    pub value: String,
    pub version: i64,
    pub mod_revision: i64,
    pub create_revision: i64,
}

#[async_trait]
pub trait EtcdTransport: Send + Sync + std::fmt::Debug {
    /// Records stored exactly at `key`; `revision > 0` reads that revision.
    async fn get(&self, key: &str, revision: i64) -> Result<Vec<KvRecord>>;

    /// Records in `[start, range_end)`, ascending by key.
    async fn range(&self, start: &str, range_end: &[u8]) -> Result<Vec<KvRecord>>;

    async fn put(&self, key: &str, value: &str) -> Result<()>;

    async fn delete(&self, key: &str) -> Result<()>;

    async fn user_list(&self) -> Result<Vec<String>>;

    async fn user_add(&self, name: &str, password: &str) -> Result<()>;

    async fn role_list(&self) -> Result<Vec<String>>;

    async fn role_add(&self, name: &str) -> Result<()>;

    async fn role_grant_permission(
        &self,
        role: &str,
        key: &str,
        range_end: &[u8],
        access: Access,
    ) -> Result<()>;

    async fn user_grant_role(&self, user: &str, role: &str) -> Result<()>;
}

#[cfg(feature = "etcd")]
pub use client::EtcdClientTransport;

#[cfg(feature = "etcd")]
mod client {
    use super::{EtcdTransport, KvRecord};
    use crate::domain::Access;
    use crate::errors::{GantryError, Result};
    use async_trait::async_trait;
    use etcd_client::{
        Client, ConnectOptions, GetOptions, KeyValue, Permission, PermissionType,
    };
    use std::time::Duration;
    use tracing::info;

    const BACKEND: &str = "etcd";

    /// `etcd-client` backed transport.
    ///
    /// The client multiplexes one channel; each call works on a cheap clone
    /// because the client API takes `&mut self`.
    #[derive(Clone)]
    pub struct EtcdClientTransport {
        client: Client,
        endpoints: Vec<String>,
    }

    impl std::fmt::Debug for EtcdClientTransport {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("EtcdClientTransport").field("endpoints", &self.endpoints).finish()
        }
    }

    impl EtcdClientTransport {
        pub async fn connect(
            endpoints: &[String],
            username: Option<&str>,
            password: Option<&str>,
            dial_timeout: Duration,
        ) -> Result<Self> {
            let mut options = ConnectOptions::new().with_connect_timeout(dial_timeout);
            if let (Some(username), Some(password)) = (username, password) {
                options = options.with_user(username, password);
            }
            let client = Client::connect(endpoints, Some(options)).await.map_err(map_error)?;
            info!(endpoints = ?endpoints, "Connected to etcd");
            Ok(Self { client, endpoints: endpoints.to_vec() })
        }
    }

    fn map_error(err: etcd_client::Error) -> GantryError {
        match err {
            // Unavailable, deadline exceeded and cancelled are transport conditions.
            etcd_client::Error::GRpcStatus(status)
                if !matches!(status.code() as i32, 1 | 4 | 14) =>
            {
                GantryError::rejected(BACKEND, status.code() as i32 as u16, status.message())
            }
            other => GantryError::unavailable(BACKEND, other.to_string()),
        }
    }

    fn record(kv: &KeyValue) -> KvRecord {
        KvRecord {
            key: String::from_utf8_lossy(kv.key()).into_owned(),
            value: String::from_utf8_lossy(kv.value()).into_owned(),
            version: kv.version(),
            mod_revision: kv.mod_revision(),
            create_revision: kv.create_revision(),
        }
    }

    #[async_trait]
    impl EtcdTransport for EtcdClientTransport {
        async fn get(&self, key: &str, revision: i64) -> Result<Vec<KvRecord>> {
            let mut options = GetOptions::new();
            if revision > 0 {
                options = options.with_revision(revision);
            }
            let response =
                self.client.clone().get(key, Some(options)).await.map_err(map_error)?;
            Ok(response.kvs().iter().map(record).collect())
        }

        async fn range(&self, start: &str, range_end: &[u8]) -> Result<Vec<KvRecord>> {
            let options = GetOptions::new().with_range(range_end.to_vec());
            let response =
                self.client.clone().get(start, Some(options)).await.map_err(map_error)?;
            Ok(response.kvs().iter().map(record).collect())
        }

        async fn put(&self, key: &str, value: &str) -> Result<()> {
            self.client.clone().put(key, value, None).await.map_err(map_error)?;
            Ok(())
        }

        async fn delete(&self, key: &str) -> Result<()> {
            self.client.clone().delete(key, None).await.map_err(map_error)?;
            Ok(())
        }

        async fn user_list(&self) -> Result<Vec<String>> {
            let response = self.client.clone().user_list().await.map_err(map_error)?;
            Ok(response.users().to_vec())
        }

        async fn user_add(&self, name: &str, password: &str) -> Result<()> {
            self.client.clone().user_add(name, password, None).await.map_err(map_error)?;
            Ok(())
        }

        async fn role_list(&self) -> Result<Vec<String>> {
            let response = self.client.clone().role_list().await.map_err(map_error)?;
            Ok(response.roles().to_vec())
        }

        async fn role_add(&self, name: &str) -> Result<()> {
            self.client.clone().role_add(name).await.map_err(map_error)?;
            Ok(())
        }

        async fn role_grant_permission(
            &self,
            role: &str,
            key: &str,
            range_end: &[u8],
            access: Access,
        ) -> Result<()> {
            let permission_type = match access {
                Access::Read => PermissionType::Read,
                Access::ReadWrite => PermissionType::Readwrite,
            };
            let permission =
                Permission::new(permission_type, key).with_range_end(range_end.to_vec());
            self.client
                .clone()
                .role_grant_permission(role, permission)
                .await
                .map_err(map_error)?;
            Ok(())
        }

        async fn user_grant_role(&self, user: &str, role: &str) -> Result<()> {
            self.client.clone().user_grant_role(user, role).await.map_err(map_error)?;
            Ok(())
        }
    }
}

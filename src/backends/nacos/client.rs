//! HTTP client for the Nacos open API.
//!
//! Handles admin login and token refresh, config CRUD, history, listener
//! status and the auth endpoints used for provisioning. Every request carries
//! the current token as the `accessToken` query parameter; a server with auth
//! disabled is used anonymously when no username is configured.

use super::types::{
    ListenerResponse, LoginResponse, NacosConfigRow, NacosPermission, NacosRole, NacosUser,
    NamespaceListResponse, Page,
};
use crate::backends::access::{AccessControl, BackendNamespace, PermissionGrant, RoleBinding};
use crate::domain::{Access, Account};
use crate::errors::{GantryError, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info};

pub const LOGIN_PATH: &str = "/nacos/v1/auth/login";
pub const CONFIG_PATH: &str = "/nacos/v1/cs/configs";
pub const LISTENER_PATH: &str = "/nacos/v1/cs/configs/listener";
pub const HISTORY_PATH: &str = "/nacos/v1/cs/history";
pub const NAMESPACE_PATH: &str = "/nacos/v1/console/namespaces";
pub const USER_PATH: &str = "/nacos/v1/auth/users";
pub const PERMISSION_PATH: &str = "/nacos/v1/auth/permissions";
pub const ROLE_PATH: &str = "/nacos/v1/auth/roles";

/// Page size used when walking auth listings.
pub const AUTH_PAGE_SIZE: i64 = 500;
/// Page size of the single history request.
pub const HISTORY_PAGE_SIZE: i64 = 100;

/// Tokens are renewed this long before the server-side expiry, or at half
/// their lifetime when that is shorter.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(300);

const BACKEND: &str = "nacos";

#[derive(Debug, Clone)]
struct AccessToken {
    value: String,
    ttl: Duration,
    obtained_at: Instant,
}

impl AccessToken {
    fn needs_refresh(&self) -> bool {
        self.obtained_at.elapsed() >= self.refresh_after()
    }

    fn refresh_after(&self) -> Duration {
        self.ttl - TOKEN_REFRESH_MARGIN.min(self.ttl / 2)
    }
}

/// Config coordinates inside one Nacos namespace.
#[derive(Debug, Clone, Copy)]
pub struct ConfigAddress<'a> {
    pub tenant: &'a str,
    pub group: &'a str,
    pub data_id: &'a str,
}

pub struct NacosClient {
    http: Client,
    base_url: String,
    username: String,
    password: String,
    token: Mutex<Option<AccessToken>>,
}

impl std::fmt::Debug for NacosClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NacosClient")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .finish()
    }
}

fn transport_error(err: reqwest::Error) -> GantryError {
    GantryError::unavailable(BACKEND, err.to_string())
}

impl NacosClient {
    pub fn new(
        base_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = Client::builder().timeout(timeout).build().map_err(|e| {
            GantryError::internal(format!("Failed to create HTTP client: {}", e))
        })?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            username: username.into(),
            password: password.into(),
            token: Mutex::new(None),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Current token, logging in when absent or close to expiry.
    async fn access_token(&self) -> Result<Option<String>> {
        if self.username.is_empty() {
            return Ok(None);
        }
        let mut token = self.token.lock().await;
        if let Some(current) = token.as_ref().filter(|t| !t.needs_refresh()) {
            return Ok(Some(current.value.clone()));
        }

        let fresh = self.login().await?;
        let value = fresh.value.clone();
        *token = Some(fresh);
        Ok(Some(value))
    }

    async fn login(&self) -> Result<AccessToken> {
        let response = self
            .http
            .post(self.url(LOGIN_PATH))
            .form(&[("username", self.username.as_str()), ("password", self.password.as_str())])
            .send()
            .await
            .map_err(transport_error)?;
        let response = Self::ensure_success(response, "login").await?;
        let login: LoginResponse = response.json().await.map_err(transport_error)?;
        info!(base_url = %self.base_url, ttl_seconds = login.token_ttl, "Logged in to Nacos");
        Ok(AccessToken {
            value: login.access_token,
            ttl: Duration::from_secs(login.token_ttl),
            obtained_at: Instant::now(),
        })
    }

    /// Attach the token and send.
    async fn execute(&self, request: RequestBuilder) -> Result<Response> {
        let request = match self.access_token().await? {
            Some(token) => request.query(&[("accessToken", token)]),
            None => request,
        };
        request.send().await.map_err(transport_error)
    }

    async fn ensure_success(response: Response, action: &str) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(GantryError::rejected(
            BACKEND,
            status.as_u16(),
            format!("{} failed: {}", action, body.trim()),
        ))
    }

    async fn send_checked(&self, request: RequestBuilder, action: &str) -> Result<Response> {
        let response = self.execute(request).await?;
        Self::ensure_success(response, action).await
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder, action: &str) -> Result<T> {
        self.send_checked(request, action).await?.json().await.map_err(transport_error)
    }

    /// Walk `pageNo` until `pagesAvailable` is reached.
    async fn list_pages<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut page_no = 1_i64;
        loop {
            let request = self.http.get(self.url(path)).query(&[
                ("pageNo", page_no.to_string()),
                ("pageSize", AUTH_PAGE_SIZE.to_string()),
            ]);
            let page: Page<T> = self.send_json(request, path).await?;
            let exhausted = page.page_items.is_empty() || page_no >= page.pages_available;
            items.extend(page.page_items);
            if exhausted {
                return Ok(items);
            }
            page_no += 1;
        }
    }

    /// Latest content of a config; `NotFound` when Nacos has none.
    pub async fn get_config(&self, address: ConfigAddress<'_>) -> Result<String> {
        let request = self.http.get(self.url(CONFIG_PATH)).query(&[
            ("tenant", address.tenant),
            ("group", address.group),
            ("dataId", address.data_id),
        ]);
        let response = self.execute(request).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(GantryError::not_found("config item", address.data_id));
        }
        Self::ensure_success(response, "get config").await?.text().await.map_err(transport_error)
    }

    /// Content of one history entry.
    pub async fn get_history_entry(&self, address: ConfigAddress<'_>, nid: i64) -> Result<String> {
        let nid = nid.to_string();
        let request = self.http.get(self.url(HISTORY_PATH)).query(&[
            ("tenant", address.tenant),
            ("group", address.group),
            ("dataId", address.data_id),
            ("nid", nid.as_str()),
        ]);
        let response = self.execute(request).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(GantryError::not_found("config history", nid));
        }
        let row: NacosConfigRow = Self::ensure_success(response, "get history entry")
            .await?
            .json()
            .await
            .map_err(transport_error)?;
        Ok(row.content)
    }

    pub async fn publish_config(
        &self,
        address: ConfigAddress<'_>,
        app_name: &str,
        content: &str,
    ) -> Result<()> {
        let request = self.http.post(self.url(CONFIG_PATH)).form(&[
            ("tenant", address.tenant),
            ("group", address.group),
            ("dataId", address.data_id),
            ("appName", app_name),
            ("content", content),
        ]);
        self.send_checked(request, "publish config").await?;
        Ok(())
    }

    /// Delete a config; Nacos answers success for absent ones.
    pub async fn delete_config(&self, address: ConfigAddress<'_>) -> Result<()> {
        let request = self.http.delete(self.url(CONFIG_PATH)).query(&[
            ("tenant", address.tenant),
            ("group", address.group),
            ("dataId", address.data_id),
        ]);
        let response = self.execute(request).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        Self::ensure_success(response, "delete config").await?;
        Ok(())
    }

    /// One page of configs matching `address`; empty group or data id match all.
    pub async fn list_configs(
        &self,
        address: ConfigAddress<'_>,
        app_name: &str,
        page_no: i64,
        page_size: i64,
    ) -> Result<Page<NacosConfigRow>> {
        let page_no = page_no.to_string();
        let page_size = page_size.to_string();
        let mut query = vec![
            ("tenant", address.tenant),
            ("group", address.group),
            ("dataId", address.data_id),
            ("search", "accurate"),
            ("pageNo", page_no.as_str()),
            ("pageSize", page_size.as_str()),
        ];
        if !app_name.is_empty() {
            query.push(("appName", app_name));
        }
        let request = self.http.get(self.url(CONFIG_PATH)).query(&query);
        self.send_json(request, "list configs").await
    }

    pub async fn list_history(&self, address: ConfigAddress<'_>) -> Result<Page<NacosConfigRow>> {
        let page_size = HISTORY_PAGE_SIZE.to_string();
        let request = self.http.get(self.url(HISTORY_PATH)).query(&[
            ("search", "accurate"),
            ("tenant", address.tenant),
            ("group", address.group),
            ("dataId", address.data_id),
            ("pageNo", "1"),
            ("pageSize", page_size.as_str()),
        ]);
        self.send_json(request, "list history").await
    }

    pub async fn listener_status(&self, address: ConfigAddress<'_>) -> Result<ListenerResponse> {
        let request = self.http.get(self.url(LISTENER_PATH)).query(&[
            ("tenant", address.tenant),
            ("group", address.group),
            ("dataId", address.data_id),
        ]);
        self.send_json(request, "listener status").await
    }
}

#[async_trait]
impl AccessControl for NacosClient {
    async fn list_namespaces(&self) -> Result<Vec<BackendNamespace>> {
        let response: NamespaceListResponse =
            self.send_json(self.http.get(self.url(NAMESPACE_PATH)), "list namespaces").await?;
        Ok(response
            .data
            .into_iter()
            .map(|ns| BackendNamespace { id: ns.namespace, name: ns.namespace_show_name })
            .collect())
    }

    async fn create_namespace(&self, namespace: &BackendNamespace) -> Result<()> {
        let request = self.http.post(self.url(NAMESPACE_PATH)).query(&[
            ("customNamespaceId", namespace.id.as_str()),
            ("namespaceName", namespace.name.as_str()),
            ("namespaceDesc", namespace.name.as_str()),
        ]);
        self.send_checked(request, "create namespace").await?;
        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<String>> {
        let users: Vec<NacosUser> = self.list_pages(USER_PATH).await?;
        Ok(users.into_iter().map(|u| u.username).collect())
    }

    async fn create_user(&self, account: &Account) -> Result<()> {
        let request = self.http.post(self.url(USER_PATH)).form(&[
            ("username", account.username.as_str()),
            ("password", account.password.as_str()),
        ]);
        self.send_checked(request, "create user").await?;
        Ok(())
    }

    async fn list_roles(&self) -> Result<Vec<RoleBinding>> {
        let roles: Vec<NacosRole> = self.list_pages(ROLE_PATH).await?;
        Ok(roles.into_iter().map(|r| RoleBinding::bound_to(r.role, r.username)).collect())
    }

    async fn create_role(&self, role: &RoleBinding) -> Result<()> {
        let username = role.username.as_deref().unwrap_or(&role.role);
        let request = self
            .http
            .post(self.url(ROLE_PATH))
            .form(&[("role", role.role.as_str()), ("username", username)]);
        self.send_checked(request, "create role").await?;
        Ok(())
    }

    async fn list_permissions(&self) -> Result<Vec<PermissionGrant>> {
        let permissions: Vec<NacosPermission> = self.list_pages(PERMISSION_PATH).await?;
        Ok(permissions
            .into_iter()
            .filter_map(|p| {
                let access = match p.action.as_str() {
                    "r" => Access::Read,
                    "rw" => Access::ReadWrite,
                    other => {
                        debug!(role = %p.role, action = other, "Ignoring permission action");
                        return None;
                    }
                };
                Some(PermissionGrant {
                    role: p.role,
                    username: String::new(),
                    resource: p.resource,
                    range_end: None,
                    access,
                })
            })
            .collect())
    }

    async fn grant_permission(&self, grant: &PermissionGrant) -> Result<()> {
        let request = self.http.post(self.url(PERMISSION_PATH)).form(&[
            ("role", grant.role.as_str()),
            ("resource", grant.resource.as_str()),
            ("action", grant.access.as_str()),
        ]);
        self.send_checked(request, "grant permission").await?;
        Ok(())
    }
}

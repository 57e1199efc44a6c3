//! Nacos open API payloads.
//!
//! Field names follow the Nacos JSON, including the misspelled listener key.

use crate::domain::HistoryVersion;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// `POST /nacos/v1/auth/login` response.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
    /// Token lifetime in seconds
    pub token_ttl: u64,
    #[serde(default)]
    pub global_admin: bool,
}

/// Paged list envelope shared by config, history and auth listings.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", bound(deserialize = "T: Deserialize<'de>"))]
pub struct Page<T> {
    #[serde(default)]
    pub total_count: i64,
    #[serde(default)]
    pub page_number: i64,
    #[serde(default)]
    pub pages_available: i64,
    #[serde(default)]
    pub page_items: Vec<T>,
}

/// One config (or config history) row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NacosConfigRow {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub data_id: String,
    pub group: String,
    pub content: String,
    pub md5: String,
    pub tenant: String,
    pub app_name: String,
    #[serde(rename = "type")]
    pub config_type: String,
    #[serde(deserialize_with = "string_or_number")]
    pub created_time: String,
    #[serde(deserialize_with = "string_or_number")]
    pub last_modified_time: String,
}

impl From<NacosConfigRow> for HistoryVersion {
    fn from(row: NacosConfigRow) -> Self {
        Self { revision: row.id.clone(), version: row.id, last_update_time: row.last_modified_time }
    }
}

/// `GET /nacos/v1/console/namespaces` response.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NamespaceListResponse {
    pub code: i64,
    pub message: Option<String>,
    pub data: Vec<NacosNamespace>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NacosNamespace {
    pub namespace: String,
    pub namespace_show_name: String,
    pub quota: i64,
    pub config_count: i64,
    #[serde(rename = "type")]
    pub namespace_type: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NacosUser {
    pub username: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NacosRole {
    pub role: String,
    pub username: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NacosPermission {
    pub role: String,
    pub resource: String,
    pub action: String,
}

/// `GET /nacos/v1/cs/configs/listener` response.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ListenerResponse {
    #[serde(rename = "collectStatus")]
    pub collect_status: i64,
    #[serde(rename = "lisentersGroupkeyStatus", deserialize_with = "null_as_empty")]
    pub listeners: BTreeMap<String, String>,
}

fn null_as_empty<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Nacos versions disagree on whether ids and timestamps are strings or numbers.
fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    })
}

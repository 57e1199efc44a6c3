//! # Configuration Settings
//!
//! Defines the configuration structure for gantry.

use crate::errors::{GantryError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::time::Duration;
use validator::Validate;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Mirror database configuration
    #[validate(nested)]
    pub database: DatabaseConfig,

    /// Observability configuration
    #[validate(nested)]
    pub observability: ObservabilityConfig,

    /// Config center endpoints, one backend instance each
    pub backends: Vec<BackendSettings>,

    /// Tenant to backend routing
    pub routing: RoutingConfig,
}

impl AppConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<()> {
        Validate::validate(self).map_err(GantryError::from)?;

        for backend in &self.backends {
            backend.validate()?;
        }

        self.validate_custom()?;

        Ok(())
    }

    fn validate_custom(&self) -> Result<()> {
        if self.backends.is_empty() {
            return Err(GantryError::validation_field(
                "At least one backend must be configured",
                "backends",
            ));
        }

        let mut names = HashSet::new();
        for backend in &self.backends {
            if !names.insert(backend.name()) {
                return Err(GantryError::validation_field(
                    format!("Backend name '{}' is configured twice", backend.name()),
                    "backends",
                ));
            }
        }

        if !names.contains(self.routing.default_backend.as_str()) {
            return Err(GantryError::validation_field(
                format!(
                    "Default backend '{}' is not a configured backend",
                    self.routing.default_backend
                ),
                "routing.default_backend",
            ));
        }

        for (tenant, backend) in &self.routing.tenants {
            if !names.contains(backend.as_str()) {
                return Err(GantryError::validation_field(
                    format!("Tenant '{}' routes to unknown backend '{}'", tenant, backend),
                    "routing.tenants",
                ));
            }
        }

        if !self.database.is_sqlite() {
            return Err(GantryError::validation_field(
                "Database URL must start with 'sqlite:'",
                "database.url",
            ));
        }

        Ok(())
    }

    /// Settings of the backend registered under `name`.
    pub fn backend(&self, name: &str) -> Option<&BackendSettings> {
        self.backends.iter().find(|backend| backend.name() == name)
    }
}

/// Database configuration for the mirror store
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database connection URL
    #[validate(length(min = 1, message = "Database URL cannot be empty"))]
    pub url: String,

    /// Maximum number of connections in the pool
    #[validate(range(min = 1, max = 100, message = "Max connections must be between 1 and 100"))]
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    #[validate(range(min = 0, max = 50, message = "Min connections must be between 0 and 50"))]
    pub min_connections: u32,

    /// Connection timeout in seconds
    #[validate(range(
        min = 1,
        max = 60,
        message = "Connect timeout must be between 1 and 60 seconds"
    ))]
    pub connect_timeout_seconds: u64,

    /// Idle timeout in seconds (0 = no timeout)
    pub idle_timeout_seconds: u64,

    /// Run embedded migrations when the pool is created
    pub auto_migrate: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://./data/gantry.db".to_string(),
            max_connections: 5,
            min_connections: 0,
            connect_timeout_seconds: 10,
            idle_timeout_seconds: 600,
            auto_migrate: true,
        }
    }
}

impl DatabaseConfig {
    /// Get connection timeout as Duration
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }

    /// Get idle timeout as Duration (None if 0)
    pub fn idle_timeout(&self) -> Option<Duration> {
        if self.idle_timeout_seconds == 0 {
            None
        } else {
            Some(Duration::from_secs(self.idle_timeout_seconds))
        }
    }

    pub fn is_sqlite(&self) -> bool {
        self.url.starts_with("sqlite:")
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level or filter directive, used when `RUST_LOG` is unset
    #[validate(length(min = 1, message = "Log level cannot be empty"))]
    pub log_level: String,

    /// Enable JSON structured logging
    pub json_logging: bool,

    #[validate(length(min = 1, message = "Service name cannot be empty"))]
    pub service_name: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logging: false,
            service_name: "gantry".to_string(),
        }
    }
}

/// One configured config center.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BackendSettings {
    Etcd(EtcdBackendSettings),
    Nacos(NacosBackendSettings),
}

impl BackendSettings {
    /// Registry name of the backend
    pub fn name(&self) -> &str {
        match self {
            Self::Etcd(settings) => &settings.name,
            Self::Nacos(settings) => &settings.name,
        }
    }

    pub fn root(&self) -> &str {
        match self {
            Self::Etcd(settings) => &settings.root,
            Self::Nacos(settings) => &settings.root,
        }
    }

    /// Field rules plus the checks shared by both variants
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Etcd(settings) => Validate::validate(settings)?,
            Self::Nacos(settings) => {
                Validate::validate(settings)?;
                let address = url::Url::parse(&settings.address).map_err(|e| {
                    GantryError::validation_field(
                        format!("Backend '{}' has an invalid address: {}", settings.name, e),
                        "address",
                    )
                })?;
                if !matches!(address.scheme(), "http" | "https") {
                    return Err(GantryError::validation_field(
                        format!("Backend '{}' address must be http or https", settings.name),
                        "address",
                    ));
                }
            }
        }

        if self.root().contains('/') {
            return Err(GantryError::validation_field(
                format!("Backend '{}' root must not contain '/'", self.name()),
                "root",
            ));
        }

        Ok(())
    }
}

/// etcd cluster connection settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct EtcdBackendSettings {
    #[validate(length(min = 1, message = "Backend name cannot be empty"))]
    pub name: String,

    #[validate(length(min = 1, message = "At least one etcd endpoint is required"))]
    pub endpoints: Vec<String>,

    /// Root user; omit for clusters without auth
    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    /// First segment of every managed key
    #[validate(length(min = 1, message = "Root cannot be empty"))]
    pub root: String,

    #[serde(default = "default_dial_timeout_seconds")]
    #[validate(range(min = 1, max = 60, message = "Dial timeout must be between 1 and 60 seconds"))]
    pub dial_timeout_seconds: u64,
}

fn default_dial_timeout_seconds() -> u64 {
    5
}

/// Nacos server settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NacosBackendSettings {
    #[validate(length(min = 1, message = "Backend name cannot be empty"))]
    pub name: String,

    /// Base URL, e.g. `http://127.0.0.1:8848`
    #[validate(length(min = 1, message = "Nacos address cannot be empty"))]
    pub address: String,

    /// Admin user; empty for servers with auth disabled
    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub password: String,

    /// Prefix of namespace names and input of hashed tenant ids
    #[validate(length(min = 1, message = "Root cannot be empty"))]
    pub root: String,

    #[serde(default = "default_request_timeout_seconds")]
    #[validate(range(
        min = 1,
        max = 300,
        message = "Request timeout must be between 1 and 300 seconds"
    ))]
    pub request_timeout_seconds: u64,
}

fn default_request_timeout_seconds() -> u64 {
    10
}

/// Tenant to backend routing
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RoutingConfig {
    /// Backend used by tenants without an explicit route
    pub default_backend: String,

    /// Explicit tenant routes, tenant name to backend name
    pub tenants: BTreeMap<String, String>,
}

impl RoutingConfig {
    /// Backend name serving `tenant`
    pub fn backend_for(&self, tenant: &str) -> &str {
        self.tenants.get(tenant).map(String::as_str).unwrap_or(&self.default_backend)
    }
}

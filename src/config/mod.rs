//! # Configuration Management
//!
//! Configuration is read from an optional file (TOML, YAML or JSON, chosen by
//! extension) and then from `GANTRY__`-prefixed environment variables, with
//! `__` separating nested keys (`GANTRY__DATABASE__URL`). The merged result is
//! validated before it is returned.

pub mod settings;

pub use settings::{
    AppConfig, BackendSettings, DatabaseConfig, EtcdBackendSettings, NacosBackendSettings,
    ObservabilityConfig, RoutingConfig,
};

use crate::errors::Result;
use config::{Config, Environment, File};
use std::path::Path;

/// Prefix of configuration environment variables
pub const ENV_PREFIX: &str = "GANTRY";

/// Load and validate configuration from `path` (if any) and the environment.
pub fn load(path: Option<&Path>) -> Result<AppConfig> {
    load_with_environment(path, environment())
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX).separator("__").try_parsing(true)
}

fn load_with_environment(path: Option<&Path>, environment: Environment) -> Result<AppConfig> {
    let mut builder = Config::builder();
    if let Some(path) = path {
        builder = builder.add_source(File::from(path).required(true));
    }

    let config: AppConfig = builder.add_source(environment).build()?.try_deserialize()?;
    config.validate()?;

    tracing::debug!(
        file = ?path,
        backends = config.backends.len(),
        "Configuration loaded"
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const TOML: &str = r#"
[database]
url = "sqlite::memory:"

[[backends]]
type = "etcd"
name = "primary"
endpoints = ["http://127.0.0.1:2379"]
root = "gantry"

[[backends]]
type = "nacos"
name = "legacy"
address = "http://127.0.0.1:8848"
username = "nacos"
password = "nacos"
root = "gantry"

[routing]
default_backend = "primary"

[routing.tenants]
t-old = "legacy"
"#;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    fn no_environment() -> Environment {
        environment().source(Some(config::Map::new()))
    }

    #[test]
    fn test_load_from_file() {
        let file = write_config(TOML);
        let config = load_with_environment(Some(file.path()), no_environment()).unwrap();

        assert_eq!(config.database.url, "sqlite::memory:");
        assert_eq!(config.database.max_connections, DatabaseConfig::default().max_connections);
        assert_eq!(config.backends.len(), 2);
        assert_eq!(config.routing.backend_for("t-old"), "legacy");
        match config.backend("primary").unwrap() {
            BackendSettings::Etcd(etcd) => assert_eq!(etcd.dial_timeout_seconds, 5),
            other => panic!("unexpected backend settings: {:?}", other),
        }
    }

    #[test]
    fn test_environment_overrides_file() {
        let file = write_config(TOML);
        let mut vars = config::Map::new();
        vars.insert("GANTRY__DATABASE__MAX_CONNECTIONS".to_string(), "3".to_string());
        vars.insert("GANTRY__OBSERVABILITY__JSON_LOGGING".to_string(), "true".to_string());

        let config =
            load_with_environment(Some(file.path()), environment().source(Some(vars))).unwrap();
        assert_eq!(config.database.max_connections, 3);
        assert!(config.observability.json_logging);
    }

    #[test]
    fn test_invalid_file_is_rejected() {
        let file = write_config(&TOML.replace("default_backend = \"primary\"", "default_backend = \"nope\""));
        assert!(load_with_environment(Some(file.path()), no_environment()).is_err());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("gantry.toml");
        assert!(load_with_environment(Some(&missing), no_environment()).is_err());
    }
}

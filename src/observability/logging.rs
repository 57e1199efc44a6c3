//! # Structured Logging
//!
//! Subscriber setup and span macros built on the tracing ecosystem.
//! Config values and derived passwords are never recorded as span fields.

use crate::config::{AppConfig, ObservabilityConfig};
use crate::errors::Result;
use tracing_subscriber::{fmt, EnvFilter};

/// Create a tracing span for a backend operation.
///
/// ```rust,ignore
/// let span = backend_span!("publish", "etcd", &item);
/// ```
#[macro_export]
macro_rules! backend_span {
    ($operation:expr, $backend:expr, $item:expr) => {
        tracing::debug_span!(
            "backend_operation",
            operation = %$operation,
            backend = %$backend,
            tenant = %$item.tenant,
            project = %$item.project,
            environment = %$item.environment,
            key = %$item.key
        )
    };
    ($operation:expr, $backend:expr, $item:expr, $($field:tt)*) => {
        tracing::debug_span!(
            "backend_operation",
            operation = %$operation,
            backend = %$backend,
            tenant = %$item.tenant,
            project = %$item.project,
            environment = %$item.environment,
            key = %$item.key,
            $($field)*
        )
    };
}

/// Create a tracing span for one synchronization pass over a scope.
#[macro_export]
macro_rules! sync_span {
    ($direction:expr, $scope:expr) => {
        tracing::info_span!(
            "sync_pass",
            direction = %$direction,
            scope = %$scope,
            writes = tracing::field::Empty
        )
    };
    ($direction:expr, $scope:expr, $($field:tt)*) => {
        tracing::info_span!(
            "sync_pass",
            direction = %$direction,
            scope = %$scope,
            writes = tracing::field::Empty,
            $($field)*
        )
    };
}

/// Install the global fmt subscriber.
///
/// `RUST_LOG` wins over the configured level. Calling this again (for
/// example from several tests) leaves the first subscriber in place.
pub fn init_logging(config: &ObservabilityConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let installed = if config.json_logging {
        tracing::subscriber::set_global_default(
            fmt::Subscriber::builder().with_env_filter(filter).json().finish(),
        )
    } else {
        tracing::subscriber::set_global_default(
            fmt::Subscriber::builder().with_env_filter(filter).finish(),
        )
    };

    if installed.is_err() {
        tracing::debug!("Global subscriber already installed");
    }
    Ok(())
}

/// Log configuration at startup
pub fn log_config_info(config: &AppConfig) {
    tracing::info!(
        service_name = %config.observability.service_name,
        database_url = %crate::storage::pool::sanitize_url(&config.database.url),
        backends = config.backends.len(),
        default_backend = %config.routing.default_backend,
        routed_tenants = config.routing.tenants.len(),
        "gantry configuration"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ConfigItem, Scope};

    #[test]
    fn test_macros_compile() {
        let item = ConfigItem::new("t1", "p1", "dev", "config");
        let _span = backend_span!("get", "etcd", item);
        let _span = backend_span!("get", "etcd", item, revision = 3);
        let scope = Scope::new("t1", "p1", "dev");
        let _span = sync_span!("backend_to_mirror", scope);
        let _span = sync_span!("mirror_to_backend", scope, backend = "nacos");
    }

    #[test]
    fn test_init_logging_twice() {
        let config = ObservabilityConfig::default();
        init_logging(&config).unwrap();
        init_logging(&config).unwrap();
    }
}

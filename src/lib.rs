//! # Gantry
//!
//! One configuration-item interface over heterogeneous config centers.
//! Callers read and write `tenant/project/environment/key` items; gantry maps
//! them onto an etcd key space or Nacos namespaces, provisions the read and
//! read-write principals of every namespace on first use, and keeps a SQLite
//! mirror that backs up and restores backend content.
//!
//! ## Architecture
//!
//! ```text
//! ConfigService → BackendRegistry → ConfigBackend (etcd | nacos)
//!      ↓                                 ↓
//!  MirrorStore ← sync ──────────→  KeyMapper + AccessProvisioner + transport
//! ```
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use gantry::{BackendRegistry, ConfigItem, ConfigService, Result};
//! use gantry::storage::{create_pool, SqlMirrorStore};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = gantry::config::load(None)?;
//!     let pool = create_pool(&config.database).await?;
//!     let registry = BackendRegistry::from_config(&config).await?;
//!     let service = ConfigService::new(Arc::new(registry), Arc::new(SqlMirrorStore::new(pool)));
//!
//!     let item = ConfigItem::new("t1", "p1", "dev", "config").with_value("v1");
//!     service.publish(&item, "alice").await?;
//!     Ok(())
//! }
//! ```

pub mod backends;
pub mod cli;
pub mod config;
pub mod domain;
pub mod errors;
pub mod observability;
pub mod services;
pub mod storage;
pub mod sync;

pub use backends::{BackendKind, BackendRegistry, ConfigBackend};
pub use config::AppConfig;
pub use domain::{Account, ConfigItem, HistoryVersion, ListOptions, Scope};
pub use errors::{GantryError, Result};
pub use services::ConfigService;

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

//! Business logic services
//!
//! Service layer components that sit between callers (the CLI, embedding
//! applications) and the backend registry plus mirror store.

pub mod config_service;

pub use config_service::ConfigService;

//! # Error Handling
//!
//! Error types for gantry, built on `thiserror`. Every backend operation,
//! the access provisioner and the mirror synchronizers report failures through
//! [`GantryError`].

pub mod types;

pub use types::{GantryError, Result};

//! Domain layer
//!
//! Pure configuration-item types shared by every backend, with no transport
//! or storage dependencies.
//!
//! ## Module Organization
//!
//! - `item`: the `ConfigItem` identity/value record, list options and history rows
//! - `principal`: derived accounts and deterministic password generation

pub mod item;
pub mod principal;

pub use item::{ConfigItem, HistoryVersion, ListOptions, Scope};
pub use principal::{derive_password, Access, Account};

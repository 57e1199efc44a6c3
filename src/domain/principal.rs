//! Derived namespace accounts.
//!
//! Every namespace gets exactly two principals: a read-only one and a
//! read-write one. Their passwords are a pure function of the username so any
//! holder of the name can recompute them; nothing is stored or rotated.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

const PASSWORD_SALT: &str = "gantry ";

/// A `(username, password)` pair handed to config consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub username: String,
    pub password: String,
}

impl Account {
    /// Account for `username` with its derived password.
    pub fn derived(username: impl Into<String>) -> Self {
        let username = username.into();
        let password = derive_password(&username);
        Self { username, password }
    }
}

/// Access level granted to a namespace principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Access {
    Read,
    ReadWrite,
}

impl Access {
    /// Short suffix used in principal names and permission actions.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "r",
            Self::ReadWrite => "rw",
        }
    }
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Deterministic password for a principal name.
pub fn derive_password(username: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(PASSWORD_SALT.as_bytes());
    hasher.update(username.as_bytes());
    hex::encode(hasher.finalize())
}

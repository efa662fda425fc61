//! Caller identity
//!
//! Authentication happens upstream; ledgers only record who acted.

use serde::{Deserialize, Serialize};

/// Authenticated caller, recorded in `created_by` / `updated_by`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: i64,
    pub username: String,
}

impl CurrentUser {
    pub fn new(id: i64, username: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
        }
    }

    /// Identity used by maintenance tasks
    pub fn system() -> Self {
        Self::new(0, "system")
    }

    /// Value written to audit columns
    pub fn audit_name(&self) -> &str {
        &self.username
    }
}

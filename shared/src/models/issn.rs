//! ISSN models

use serde::{Deserialize, Serialize};

/// ISSN range inside one 4-digit block
///
/// Bounds are 3 digits plus the check character (e.g. "0007"), `next`
/// becomes empty once the range is exhausted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct IssnRange {
    pub id: i64,
    pub block: String,
    pub range_begin: String,
    pub range_end: String,
    pub next: String,
    pub free: i64,
    pub taken: i64,
    pub canceled: i64,
    pub is_active: bool,
    pub is_closed: bool,
    pub created_at: i64,
    pub created_by: String,
    pub updated_at: i64,
    pub updated_by: String,
}

impl IssnRange {
    pub fn has_capacity(&self) -> bool {
        self.free > 0 || self.canceled > 0
    }
}

/// Create ISSN range payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssnRangeCreate {
    pub block: String,
    pub range_begin: String,
    pub range_end: String,
}

/// ISSN currently assigned to a publication
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct IssnUsed {
    pub id: i64,
    pub issn: String,
    pub issn_range_id: i64,
    pub publication_id: i64,
    pub created_at: i64,
    pub created_by: String,
}

/// ISSN waiting in the global reuse pool
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct IssnCanceled {
    pub id: i64,
    pub issn: String,
    pub issn_range_id: i64,
    pub created_at: i64,
    pub created_by: String,
}

/// ISSN application form status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum IssnFormStatus {
    NotHandled,
    NotNotified,
    Completed,
    Rejected,
}

/// ISSN application form
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct IssnForm {
    pub id: i64,
    pub publisher_name: String,
    pub status: IssnFormStatus,
    pub publication_count: i64,
    pub publication_count_issn: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Serial publication applied for on an ISSN form
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct IssnPublication {
    pub id: i64,
    pub form_id: i64,
    pub title: String,
    /// Assigned ISSN, empty when none
    pub issn: String,
    pub created_at: i64,
    pub updated_at: i64,
}

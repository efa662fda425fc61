//! Sub-range Model

use serde::{Deserialize, Serialize};

/// Publisher sub-range (isbn_sub_range / ismn_sub_range)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct SubRange {
    pub id: i64,
    pub publisher_id: i64,
    pub range_id: i64,
    /// Full publisher identifier, e.g. "978-951-000" or "979-0-1234"
    pub publisher_identifier: String,
    pub category: i64,
    pub range_begin: String,
    pub range_end: String,
    pub next: String,
    pub free: i64,
    pub taken: i64,
    pub canceled: i64,
    pub deleted: i64,
    pub is_active: bool,
    pub is_closed: bool,
    pub created_at: i64,
    pub created_by: String,
    pub updated_at: i64,
    pub updated_by: String,
}

impl SubRange {
    /// Publisher part as carved from the parent range
    pub fn publisher_part(&self) -> &str {
        self.publisher_identifier
            .rsplit('-')
            .next()
            .unwrap_or(&self.publisher_identifier)
    }

    pub fn capacity(&self) -> i64 {
        self.free + self.taken + self.canceled + self.deleted
    }

    pub fn has_capacity(&self) -> bool {
        self.free > 0 || self.canceled > 0
    }
}

/// Publisher part archived for reuse after its sub-range was removed
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct CanceledSubRange {
    pub id: i64,
    pub identifier: String,
    pub range_id: i64,
    pub category: i64,
    pub created_at: i64,
    pub created_by: String,
}

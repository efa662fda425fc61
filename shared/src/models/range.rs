//! Range Model

use serde::{Deserialize, Serialize};

use super::CanceledSubRange;

/// Master ISBN/ISMN range (isbn_range / ismn_range)
///
/// `category` is the item-part width of the sub-ranges carved from it.
/// `range_begin`, `range_end` and `next` are publisher parts of width
/// `12 - digits(prefix + lang_group) - category`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Range {
    pub id: i64,
    pub prefix: String,
    /// Empty for ISMN ranges
    pub lang_group: String,
    pub category: i64,
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

impl Range {
    /// Hyphenated scope preceding the publisher part ("978-951", "979-0")
    pub fn scope(&self) -> String {
        if self.lang_group.is_empty() {
            self.prefix.clone()
        } else {
            format!("{}-{}", self.prefix, self.lang_group)
        }
    }

    pub fn has_capacity(&self) -> bool {
        self.free > 0 || self.canceled > 0
    }
}

/// Create range payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RangeCreate {
    pub prefix: String,
    #[serde(default)]
    pub lang_group: String,
    pub category: i64,
    pub range_begin: String,
    pub range_end: String,
}

/// Source of the publisher identifier for a new sub-range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum SubRangeSelection {
    /// Take the range's `next` publisher part
    Next,
    /// Reuse an archived publisher part
    Canceled(i64),
}

/// Choices available when generating a sub-range
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubRangeOptions {
    pub range_id: i64,
    /// Next fresh publisher identifier, if the range still has free slots
    pub next: Option<String>,
    pub canceled: Vec<CanceledSubRange>,
}

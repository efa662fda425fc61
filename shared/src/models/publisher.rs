//! Publisher Model

use serde::{Deserialize, Serialize};

/// Publisher entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Publisher {
    pub id: i64,
    pub name: String,
    /// Publisher identifier of the active ISBN sub-range
    pub active_identifier_isbn: Option<String>,
    /// Publisher identifier of the active ISMN sub-range
    pub active_identifier_ismn: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Create publisher payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublisherCreate {
    pub name: String,
}

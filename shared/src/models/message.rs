//! Message Model

use serde::{Deserialize, Serialize};

/// Message sent to a publisher, optionally about an identifier batch
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Message {
    pub id: i64,
    pub publisher_id: Option<i64>,
    pub identifier_batch_id: Option<i64>,
    pub subject: String,
    pub created_at: i64,
}

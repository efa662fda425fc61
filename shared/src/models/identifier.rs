//! Identifier and batch models

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::IdentifierType;

/// Issued identifier
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Identifier {
    pub id: i64,
    pub identifier: String,
    pub identifier_type: IdentifierType,
    pub sub_range_id: i64,
    pub identifier_batch_id: i64,
    /// Type label inside the publication map, empty for list batches
    pub publication_type: String,
    pub created_at: i64,
    pub created_by: String,
}

/// Identifier waiting in a sub-range's reuse pool
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct CanceledIdentifier {
    pub id: i64,
    pub identifier: String,
    pub identifier_type: IdentifierType,
    pub category: i64,
    pub publisher_id: i64,
    pub sub_range_id: i64,
    pub created_at: i64,
    pub created_by: String,
}

/// One allocation event
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct IdentifierBatch {
    pub id: i64,
    pub identifier_type: IdentifierType,
    pub publisher_id: i64,
    /// 0 for list batches
    pub publication_id: i64,
    /// Primary sub-range the new identifiers were minted from
    pub sub_range_id: i64,
    pub identifier_count: i64,
    pub identifier_canceled_used_count: i64,
    pub identifier_canceled_count: i64,
    pub identifier_deleted_count: i64,
    pub created_at: i64,
    pub created_by: String,
}

impl IdentifierBatch {
    pub fn is_list(&self) -> bool {
        self.publication_id == 0
    }

    /// Identifiers still attached to the batch
    pub fn outstanding(&self) -> i64 {
        self.identifier_count + self.identifier_canceled_used_count
            - self.identifier_canceled_count
            - self.identifier_deleted_count
    }
}

/// Batch with its identifiers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentifierBatchDetail {
    pub batch: IdentifierBatch,
    pub identifiers: Vec<Identifier>,
}

/// What a batch allocation is for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "value", rename_all = "snake_case")]
pub enum BatchRequest {
    /// A plain list of `n` identifiers
    Count(i64),
    /// Identifiers for every print type and file format of a publication
    Publication(i64),
}

/// Batch listing filter
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchQuery {
    pub identifier_type: Option<IdentifierType>,
    pub publisher_id: Option<i64>,
    pub publication_id: Option<i64>,
    /// `Some(true)` list batches only, `Some(false)` publication batches only
    pub list_only: Option<bool>,
    pub created_from: Option<i64>,
    pub created_to: Option<i64>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Download audit row
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct BatchDownloadRecord {
    pub id: i64,
    pub identifier_batch_id: i64,
    pub identifier_count: i64,
    pub content_hash: String,
    pub created_at: i64,
    pub created_by: String,
}

/// Plain-text export of a batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchDownload {
    pub batch_id: i64,
    pub content: String,
    /// SHA-256 of `content`, hex encoded
    pub content_hash: String,
    pub identifier_count: i64,
}

/// Identifier → type label map stored on a publication
///
/// Persisted as a JSON object string, or `""` when empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentifierMap(BTreeMap<String, String>);

impl IdentifierMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the stored column value
    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(raw)
    }

    /// Render the column value
    pub fn to_column(&self) -> Result<String, serde_json::Error> {
        if self.0.is_empty() {
            return Ok(String::new());
        }
        serde_json::to_string(&self.0)
    }

    pub fn insert(&mut self, identifier: impl Into<String>, label: impl Into<String>) {
        self.0.insert(identifier.into(), label.into());
    }

    pub fn remove(&mut self, identifier: &str) -> Option<String> {
        self.0.remove(identifier)
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.0.contains_key(identifier)
    }

    pub fn get(&self, identifier: &str) -> Option<&str> {
        self.0.get(identifier).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

//! Identifier type tag

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of range-backed identifier (ISSN has its own ledger)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum IdentifierType {
    Isbn,
    Ismn,
}

impl IdentifierType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Isbn => "ISBN",
            Self::Ismn => "ISMN",
        }
    }
}

impl fmt::Display for IdentifierType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown identifier type
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported identifier type: {0}")]
pub struct UnsupportedIdentifierType(pub String);

impl FromStr for IdentifierType {
    type Err = UnsupportedIdentifierType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ISBN" => Ok(Self::Isbn),
            "ISMN" => Ok(Self::Ismn),
            _ => Err(UnsupportedIdentifierType(s.to_string())),
        }
    }
}

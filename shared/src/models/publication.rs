//! Publication Model

use serde::{Deserialize, Serialize};

use super::IdentifierType;

/// Publication type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum PublicationType {
    Book,
    Dissertation,
    Map,
    SheetMusic,
    Other,
}

impl PublicationType {
    /// Identifier type a publication of this type receives
    pub fn identifier_type(&self) -> IdentifierType {
        match self {
            Self::SheetMusic => IdentifierType::Ismn,
            _ => IdentifierType::Isbn,
        }
    }
}

/// Publication format
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum PublicationFormat {
    Print,
    Electronical,
    PrintElectronical,
}

/// Publication entity (the identifier-relevant subset)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Publication {
    pub id: i64,
    pub publisher_id: Option<i64>,
    pub title: String,
    pub publication_type: PublicationType,
    pub publication_format: PublicationFormat,
    /// JSON array of print type labels (e.g. ["PAPERBACK", "HARDBACK"])
    #[cfg_attr(feature = "db", sqlx(json))]
    pub print_types: Vec<String>,
    /// JSON array of file format labels (e.g. ["PDF", "EPUB"])
    #[cfg_attr(feature = "db", sqlx(json))]
    pub file_formats: Vec<String>,
    pub is_public: bool,
    pub on_process: bool,
    pub publication_identifier_type: Option<IdentifierType>,
    /// Identifier → print type, JSON object string or ""
    pub publication_identifier_print: String,
    /// Identifier → file format, JSON object string or ""
    pub publication_identifier_electronical: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Publication {
    pub fn has_identifiers(&self) -> bool {
        !self.publication_identifier_print.trim().is_empty()
            || !self.publication_identifier_electronical.trim().is_empty()
    }
}

/// Create publication payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicationCreate {
    pub publisher_id: Option<i64>,
    pub title: String,
    pub publication_type: PublicationType,
    pub publication_format: PublicationFormat,
    pub print_types: Vec<String>,
    pub file_formats: Vec<String>,
    pub is_public: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sheet_music_gets_ismn() {
        assert_eq!(
            PublicationType::SheetMusic.identifier_type(),
            IdentifierType::Ismn
        );
        assert_eq!(PublicationType::Map.identifier_type(), IdentifierType::Isbn);
    }
}

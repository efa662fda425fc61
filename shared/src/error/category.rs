//! Error category classification

use super::codes::ErrorCode;
use serde::{Deserialize, Serialize};

/// Error category classification based on error code ranges
///
/// Categories are determined by the leading digit of the error code:
/// - 0xxx: General errors
/// - 1xxx: Range errors
/// - 2xxx: Sub-range errors
/// - 3xxx: Identifier errors
/// - 4xxx: Identifier batch errors
/// - 5xxx: Publisher / publication errors
/// - 6xxx: ISSN errors
/// - 9xxx: System errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// General errors (0xxx)
    General,
    /// Range errors (1xxx)
    Range,
    /// Sub-range errors (2xxx)
    SubRange,
    /// Identifier errors (3xxx)
    Identifier,
    /// Identifier batch errors (4xxx)
    Batch,
    /// Publisher / publication errors (5xxx)
    Publication,
    /// ISSN errors (6xxx)
    Issn,
    /// System errors (9xxx and anything unmapped)
    System,
}

impl ErrorCategory {
    /// Determine category from error code value
    pub fn from_code(code: u16) -> Self {
        match code {
            0..1000 => Self::General,
            1000..2000 => Self::Range,
            2000..3000 => Self::SubRange,
            3000..4000 => Self::Identifier,
            4000..5000 => Self::Batch,
            5000..6000 => Self::Publication,
            6000..7000 => Self::Issn,
            _ => Self::System,
        }
    }

    /// Get the string name for this category
    pub fn name(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Range => "range",
            Self::SubRange => "sub_range",
            Self::Identifier => "identifier",
            Self::Batch => "batch",
            Self::Publication => "publication",
            Self::Issn => "issn",
            Self::System => "system",
        }
    }
}

impl ErrorCode {
    /// Get the category for this error code
    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::from_code(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_from_code() {
        assert_eq!(ErrorCategory::from_code(0), ErrorCategory::General);
        assert_eq!(ErrorCategory::from_code(999), ErrorCategory::General);
        assert_eq!(ErrorCategory::from_code(1001), ErrorCategory::Range);
        assert_eq!(ErrorCategory::from_code(2004), ErrorCategory::SubRange);
        assert_eq!(ErrorCategory::from_code(3003), ErrorCategory::Identifier);
        assert_eq!(ErrorCategory::from_code(4002), ErrorCategory::Batch);
        assert_eq!(ErrorCategory::from_code(5001), ErrorCategory::Publication);
        assert_eq!(ErrorCategory::from_code(6001), ErrorCategory::Issn);
        assert_eq!(ErrorCategory::from_code(7000), ErrorCategory::System);
        assert_eq!(ErrorCategory::from_code(9001), ErrorCategory::System);
    }

    #[test]
    fn test_error_code_category() {
        assert_eq!(ErrorCode::Success.category(), ErrorCategory::General);
        assert_eq!(ErrorCode::RangeOverlap.category(), ErrorCategory::Range);
        assert_eq!(
            ErrorCode::NoActiveSubRange.category(),
            ErrorCategory::SubRange
        );
        assert_eq!(
            ErrorCode::IdentifierAlreadyCanceled.category(),
            ErrorCategory::Identifier
        );
        assert_eq!(ErrorCode::BatchNotLast.category(), ErrorCategory::Batch);
        assert_eq!(
            ErrorCode::PublicationNotPublic.category(),
            ErrorCategory::Publication
        );
        assert_eq!(ErrorCode::IssnNotFound.category(), ErrorCategory::Issn);
        assert_eq!(ErrorCode::DatabaseError.category(), ErrorCategory::System);
    }

    #[test]
    fn test_category_name() {
        assert_eq!(ErrorCategory::SubRange.name(), "sub_range");
        assert_eq!(ErrorCategory::Issn.name(), "issn");
    }
}

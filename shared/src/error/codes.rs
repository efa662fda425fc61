//! Unified error codes for the identifier registry
//!
//! This module defines all error codes raised by the ledger engine.
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Range errors
//! - 2xxx: Sub-range errors
//! - 3xxx: Identifier errors
//! - 4xxx: Identifier batch errors
//! - 5xxx: Publisher / publication errors
//! - 6xxx: ISSN errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values for efficient serialization
/// and cross-language compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Resource already exists
    AlreadyExists = 4,
    /// Invalid request
    InvalidRequest = 5,
    /// Invalid format (digit bodies, identifier strings)
    InvalidFormat = 6,
    /// Value out of range
    ValueOutOfRange = 8,
    /// Operation conflicts with the current state
    StateConflict = 9,

    // ==================== 1xxx: Range ====================
    /// Range not found
    RangeNotFound = 1001,
    /// Range overlaps an existing range
    RangeOverlap = 1002,
    /// Range bounds, prefix or category are invalid
    RangeInvalidBounds = 1003,
    /// Range is closed
    RangeClosed = 1004,
    /// Range has no free or cancelled capacity left
    RangeExhausted = 1005,
    /// Range still has sub-ranges
    RangeInUse = 1006,
    /// Range is not active
    RangeNotActive = 1007,
    /// Requested range state transition is not allowed
    RangeStateConflict = 1008,
    /// Identifier type is not supported by the operation
    UnsupportedIdentifierType = 1009,
    /// Cancelled sub-range not found in the range pool
    CanceledSubRangeNotFound = 1010,

    // ==================== 2xxx: Sub-range ====================
    /// Sub-range not found
    SubRangeNotFound = 2001,
    /// Publisher has no active sub-range
    NoActiveSubRange = 2002,
    /// Sub-range still has identifiers or batches
    SubRangeInUse = 2003,
    /// Sub-range counters do not match its rows
    SubRangeCounterMismatch = 2004,
    /// Requested sub-range state transition is not allowed
    SubRangeStateConflict = 2005,
    /// Sub-range has permanently removed identifiers
    SubRangeHasDeletedIdentifiers = 2006,

    // ==================== 3xxx: Identifier ====================
    /// Identifier not found
    IdentifierNotFound = 3001,
    /// Identifier is already cancelled
    IdentifierAlreadyCanceled = 3002,
    /// Not enough free and cancelled identifiers
    InsufficientIdentifiers = 3003,
    /// Batch request exceeds the per-request ceiling
    BatchTooLarge = 3004,
    /// Generated identifier failed checksum validation
    ChecksumInvalid = 3005,

    // ==================== 4xxx: Identifier batch ====================
    /// Identifier batch not found
    BatchNotFound = 4001,
    /// Batch is not the latest one of its sub-range
    BatchNotLast = 4002,
    /// Batch has cancelled or removed identifiers
    BatchHasRetiredIdentifiers = 4003,
    /// A message has been sent for the batch
    BatchMessageSent = 4004,
    /// Batch counters do not match its identifiers
    BatchCountMismatch = 4005,

    // ==================== 5xxx: Publisher / publication ====================
    /// Publisher not found
    PublisherNotFound = 5001,
    /// Publication not found
    PublicationNotFound = 5002,
    /// Publication already has identifiers
    PublicationAlreadyIdentified = 5003,
    /// Publication format and type lists do not agree
    PublicationUnsupportedFormat = 5004,
    /// Publication is not public
    PublicationNotPublic = 5005,
    /// Publication has no ISSN
    PublicationHasNoIssn = 5006,

    // ==================== 6xxx: ISSN ====================
    /// ISSN range not found
    IssnRangeNotFound = 6001,
    /// No active ISSN range
    NoActiveIssnRange = 6002,
    /// ISSN not found
    IssnNotFound = 6003,
    /// Publication already has an ISSN
    IssnAlreadyAssigned = 6004,
    /// ISSN range still has issued ISSNs
    IssnRangeInUse = 6005,
    /// Requested ISSN range state transition is not allowed
    IssnRangeStateConflict = 6006,
    /// ISSN request form not found
    IssnFormNotFound = 6007,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Database error
    DatabaseError = 9002,
    /// Configuration error
    ConfigError = 9005,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Check if this is a success code
    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, ErrorCode::Success)
    }

    /// Get the developer-facing English message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::Success => "Operation completed successfully",
            ErrorCode::Unknown => "An unknown error occurred",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::AlreadyExists => "Resource already exists",
            ErrorCode::InvalidRequest => "Invalid request",
            ErrorCode::InvalidFormat => "Invalid format",
            ErrorCode::ValueOutOfRange => "Value is out of range",
            ErrorCode::StateConflict => "Operation conflicts with the current state",

            // Range
            ErrorCode::RangeNotFound => "Range not found",
            ErrorCode::RangeOverlap => "Range overlaps an existing range",
            ErrorCode::RangeInvalidBounds => "Range definition is invalid",
            ErrorCode::RangeClosed => "Range is closed",
            ErrorCode::RangeExhausted => "Range has no capacity left",
            ErrorCode::RangeInUse => "Range has sub-ranges",
            ErrorCode::RangeNotActive => "Range is not active",
            ErrorCode::RangeStateConflict => "Range state transition is not allowed",
            ErrorCode::UnsupportedIdentifierType => "Identifier type is not supported",
            ErrorCode::CanceledSubRangeNotFound => "Cancelled sub-range not found",

            // Sub-range
            ErrorCode::SubRangeNotFound => "Sub-range not found",
            ErrorCode::NoActiveSubRange => "Publisher has no active sub-range",
            ErrorCode::SubRangeInUse => "Sub-range has identifiers",
            ErrorCode::SubRangeCounterMismatch => "Sub-range counters do not match",
            ErrorCode::SubRangeStateConflict => "Sub-range state transition is not allowed",
            ErrorCode::SubRangeHasDeletedIdentifiers => {
                "Sub-range has permanently removed identifiers"
            }

            // Identifier
            ErrorCode::IdentifierNotFound => "Identifier not found",
            ErrorCode::IdentifierAlreadyCanceled => "Identifier is already cancelled",
            ErrorCode::InsufficientIdentifiers => "Not enough identifiers available",
            ErrorCode::BatchTooLarge => "Too many identifiers requested",
            ErrorCode::ChecksumInvalid => "Identifier checksum is invalid",

            // Batch
            ErrorCode::BatchNotFound => "Identifier batch not found",
            ErrorCode::BatchNotLast => "Identifier batch is not the latest of its sub-range",
            ErrorCode::BatchHasRetiredIdentifiers => {
                "Identifier batch has cancelled or removed identifiers"
            }
            ErrorCode::BatchMessageSent => "A message has been sent for the batch",
            ErrorCode::BatchCountMismatch => "Identifier batch counters do not match",

            // Publisher / publication
            ErrorCode::PublisherNotFound => "Publisher not found",
            ErrorCode::PublicationNotFound => "Publication not found",
            ErrorCode::PublicationAlreadyIdentified => "Publication already has identifiers",
            ErrorCode::PublicationUnsupportedFormat => "Publication format is not supported",
            ErrorCode::PublicationNotPublic => "Publication is not public",
            ErrorCode::PublicationHasNoIssn => "Publication has no ISSN",

            // ISSN
            ErrorCode::IssnRangeNotFound => "ISSN range not found",
            ErrorCode::NoActiveIssnRange => "No active ISSN range",
            ErrorCode::IssnNotFound => "ISSN not found",
            ErrorCode::IssnAlreadyAssigned => "Publication already has an ISSN",
            ErrorCode::IssnRangeInUse => "ISSN range has issued ISSNs",
            ErrorCode::IssnRangeStateConflict => "ISSN range state transition is not allowed",
            ErrorCode::IssnFormNotFound => "ISSN form not found",

            // System
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::DatabaseError => "Database error",
            ErrorCode::ConfigError => "Configuration error",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error when converting from an invalid u16 to ErrorCode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            0 => Ok(ErrorCode::Success),
            1 => Ok(ErrorCode::Unknown),
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),
            4 => Ok(ErrorCode::AlreadyExists),
            5 => Ok(ErrorCode::InvalidRequest),
            6 => Ok(ErrorCode::InvalidFormat),
            8 => Ok(ErrorCode::ValueOutOfRange),
            9 => Ok(ErrorCode::StateConflict),

            // Range
            1001 => Ok(ErrorCode::RangeNotFound),
            1002 => Ok(ErrorCode::RangeOverlap),
            1003 => Ok(ErrorCode::RangeInvalidBounds),
            1004 => Ok(ErrorCode::RangeClosed),
            1005 => Ok(ErrorCode::RangeExhausted),
            1006 => Ok(ErrorCode::RangeInUse),
            1007 => Ok(ErrorCode::RangeNotActive),
            1008 => Ok(ErrorCode::RangeStateConflict),
            1009 => Ok(ErrorCode::UnsupportedIdentifierType),
            1010 => Ok(ErrorCode::CanceledSubRangeNotFound),

            // Sub-range
            2001 => Ok(ErrorCode::SubRangeNotFound),
            2002 => Ok(ErrorCode::NoActiveSubRange),
            2003 => Ok(ErrorCode::SubRangeInUse),
            2004 => Ok(ErrorCode::SubRangeCounterMismatch),
            2005 => Ok(ErrorCode::SubRangeStateConflict),
            2006 => Ok(ErrorCode::SubRangeHasDeletedIdentifiers),

            // Identifier
            3001 => Ok(ErrorCode::IdentifierNotFound),
            3002 => Ok(ErrorCode::IdentifierAlreadyCanceled),
            3003 => Ok(ErrorCode::InsufficientIdentifiers),
            3004 => Ok(ErrorCode::BatchTooLarge),
            3005 => Ok(ErrorCode::ChecksumInvalid),

            // Batch
            4001 => Ok(ErrorCode::BatchNotFound),
            4002 => Ok(ErrorCode::BatchNotLast),
            4003 => Ok(ErrorCode::BatchHasRetiredIdentifiers),
            4004 => Ok(ErrorCode::BatchMessageSent),
            4005 => Ok(ErrorCode::BatchCountMismatch),

            // Publisher / publication
            5001 => Ok(ErrorCode::PublisherNotFound),
            5002 => Ok(ErrorCode::PublicationNotFound),
            5003 => Ok(ErrorCode::PublicationAlreadyIdentified),
            5004 => Ok(ErrorCode::PublicationUnsupportedFormat),
            5005 => Ok(ErrorCode::PublicationNotPublic),
            5006 => Ok(ErrorCode::PublicationHasNoIssn),

            // ISSN
            6001 => Ok(ErrorCode::IssnRangeNotFound),
            6002 => Ok(ErrorCode::NoActiveIssnRange),
            6003 => Ok(ErrorCode::IssnNotFound),
            6004 => Ok(ErrorCode::IssnAlreadyAssigned),
            6005 => Ok(ErrorCode::IssnRangeInUse),
            6006 => Ok(ErrorCode::IssnRangeStateConflict),
            6007 => Ok(ErrorCode::IssnFormNotFound),

            // System
            9001 => Ok(ErrorCode::InternalError),
            9002 => Ok(ErrorCode::DatabaseError),
            9005 => Ok(ErrorCode::ConfigError),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

//! HTTP status code mapping for error codes

use super::codes::ErrorCode;
use http::StatusCode;

impl ErrorCode {
    /// Get the appropriate HTTP status code for this error code
    pub fn http_status(&self) -> StatusCode {
        match self {
            // Success
            Self::Success => StatusCode::OK,

            // 404 Not Found
            Self::NotFound
            | Self::RangeNotFound
            | Self::CanceledSubRangeNotFound
            | Self::SubRangeNotFound
            | Self::IdentifierNotFound
            | Self::BatchNotFound
            | Self::PublisherNotFound
            | Self::PublicationNotFound
            | Self::IssnRangeNotFound
            | Self::IssnNotFound
            | Self::IssnFormNotFound => StatusCode::NOT_FOUND,

            // 409 Conflict
            Self::AlreadyExists
            | Self::StateConflict
            | Self::RangeOverlap
            | Self::RangeClosed
            | Self::RangeExhausted
            | Self::RangeInUse
            | Self::RangeNotActive
            | Self::RangeStateConflict
            | Self::NoActiveSubRange
            | Self::SubRangeInUse
            | Self::SubRangeCounterMismatch
            | Self::SubRangeStateConflict
            | Self::SubRangeHasDeletedIdentifiers
            | Self::IdentifierAlreadyCanceled
            | Self::InsufficientIdentifiers
            | Self::BatchNotLast
            | Self::BatchHasRetiredIdentifiers
            | Self::BatchMessageSent
            | Self::BatchCountMismatch
            | Self::PublicationAlreadyIdentified
            | Self::PublicationHasNoIssn
            | Self::NoActiveIssnRange
            | Self::IssnAlreadyAssigned
            | Self::IssnRangeInUse
            | Self::IssnRangeStateConflict => StatusCode::CONFLICT,

            // 422 Unprocessable Entity
            Self::InvalidFormat
            | Self::ValueOutOfRange
            | Self::RangeInvalidBounds
            | Self::UnsupportedIdentifierType
            | Self::BatchTooLarge
            | Self::PublicationUnsupportedFormat
            | Self::PublicationNotPublic => StatusCode::UNPROCESSABLE_ENTITY,

            // 500 Internal Server Error
            Self::Unknown
            | Self::InternalError
            | Self::DatabaseError
            | Self::ConfigError
            | Self::ChecksumInvalid => StatusCode::INTERNAL_SERVER_ERROR,

            // 400 Bad Request (default for validation errors)
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

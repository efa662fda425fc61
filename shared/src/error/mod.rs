//! Unified error system for the identifier registry
//!
//! This module provides the error handling system shared by every ledger:
//! - [`ErrorCode`]: Standardized error codes for all error types
//! - [`ErrorCategory`]: Classification of errors by domain
//! - [`AppError`]: code, message and optional details
//! - [`ApiResponse`]: Unified response format for callers
//!
//! # Error Code Ranges
//!
//! - 0xxx: General errors
//! - 1xxx: Range errors
//! - 2xxx: Sub-range errors
//! - 3xxx: Identifier errors
//! - 4xxx: Identifier batch errors
//! - 5xxx: Publisher / publication errors
//! - 6xxx: ISSN errors
//! - 9xxx: System errors
//!
//! # Example
//!
//! ```
//! use shared::error::{AppError, ErrorCode, ApiResponse};
//!
//! let err = AppError::with_message(ErrorCode::RangeOverlap, "Range overlaps range 3")
//!     .with_detail("range_id", 3);
//! assert_eq!(err.http_status(), http::StatusCode::CONFLICT);
//!
//! let response = ApiResponse::<()>::error(&err);
//! assert_eq!(response.code, Some(1002));
//! ```

mod category;
mod codes;
mod http;
mod types;

pub use category::ErrorCategory;
pub use codes::{ErrorCode, InvalidErrorCode};
pub use types::{ApiResponse, AppError, AppResult, ErrorDetails};

//! Shared types for the identifier registry
//!
//! Data models for ranges, sub-ranges, identifiers, batches and ISSNs,
//! the unified error system, and small utilities.

pub mod error;
pub mod models;
pub mod util;

// Re-exports
pub use error::{ApiResponse, AppError, AppResult, ErrorCode};
pub use http;
pub use models::IdentifierType;
pub use serde::{Deserialize, Serialize};

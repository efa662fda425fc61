//! Data models
//!
//! Shared between registry-server and its callers.
//! DB row types use `#[cfg_attr(feature = "db", derive(sqlx::FromRow))]`.
//! All IDs are `i64` (SQLite INTEGER PRIMARY KEY).

pub mod identifier;
pub mod identifier_type;
pub mod issn;
pub mod message;
pub mod publication;
pub mod publisher;
pub mod range;
pub mod sub_range;

// Re-exports
pub use identifier::*;
pub use identifier_type::*;
pub use issn::*;
pub use message::*;
pub use publication::*;
pub use publisher::*;
pub use range::*;
pub use sub_range::*;

//! Identifier registry - range allocation and reclamation engine
//!
//! # Overview
//!
//! Carves publisher sub-ranges out of master ISBN/ISMN ranges, mints
//! checksummed identifiers from them, hands out ISSNs, and reverses all of
//! it (cancellation, permanent removal, batch and sub-range rollback) while
//! keeping every counter consistent.
//!
//! - **Ledgers** (`ledger`): ranges, sub-ranges, allocation, retirement,
//!   batches, ISSN
//! - **Database** (`db`): SQLite through sqlx, repositories, transaction scope
//! - **Core** (`core`): configuration
//! - **Utils** (`utils`): logging, error re-exports
//!
//! ```text
//! registry-server/src/
//! ├── auth/          # Caller identity
//! ├── core/          # Configuration
//! ├── db/            # Pool, migrations, repositories, TxScope
//! ├── ledger/        # Allocation engine
//! └── utils/         # Logger
//! ```

pub mod auth;
pub mod core;
pub mod db;
pub mod ledger;
pub mod utils;

pub use auth::CurrentUser;
pub use core::Config;
pub use db::{DbService, TxScope};
pub use ledger::{
    BatchLedger, IdentifierAllocator, IdentifierRetirement, IssnLedger, RangeLedger,
    RetirementKind, SubRangeLedger,
};
pub use utils::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};

pub use utils::logger::{cleanup_old_logs, init_logger, init_logger_with_file};

use anyhow::Context;
use tracing_appender::non_blocking::WorkerGuard;

/// Create the working and log directories, start logging
///
/// Expects a config built with [`Config::load`] so `.env` values are seen.
/// Keep the returned guard alive for as long as file logging is wanted.
pub fn setup_environment(config: &Config) -> anyhow::Result<Option<WorkerGuard>> {
    std::fs::create_dir_all(&config.work_dir)
        .with_context(|| format!("Failed to create work dir {}", config.work_dir))?;
    std::fs::create_dir_all(&config.log_dir)
        .with_context(|| format!("Failed to create log dir {}", config.log_dir))?;

    let guard = init_logger_with_file(
        Some(&config.log_level),
        Some(config.log_json),
        Some(&config.log_dir),
    );
    Ok(guard)
}

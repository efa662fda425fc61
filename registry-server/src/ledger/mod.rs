//! Ledgers
//!
//! Range bookkeeping and identifier allocation:
//!
//! - [`RangeLedger`] - master ISBN/ISMN ranges and sub-range generation
//! - [`SubRangeLedger`] - publisher sub-ranges
//! - [`IdentifierAllocator`] - batch allocation with reuse and overflow
//! - [`IdentifierRetirement`] - cancel / permanently remove identifiers
//! - [`BatchLedger`] - batch read, rollback, download and listing
//! - [`IssnLedger`] - ISSN ranges and per-publication ISSNs
//!
//! Every mutating operation runs in a [`TxScope`](crate::db::TxScope) and
//! re-reads the rows it changes through the connection it was given.

pub mod allocator;
pub mod batch;
pub mod checksum;
pub mod issn;
pub mod overlap;
pub mod range;
pub mod retirement;
pub mod state;
pub mod sub_range;

pub use allocator::{IdentifierAllocator, MAX_BATCH_SIZE};
pub use batch::BatchLedger;
pub use issn::IssnLedger;
pub use overlap::RangeOverlapValidator;
pub use range::RangeLedger;
pub use retirement::{IdentifierRetirement, RetirementKind};
pub use sub_range::SubRangeLedger;

use shared::error::{AppError, AppResult, ErrorCode};

/// Parse an all-digit string
pub(crate) fn parse_digits(value: &str) -> AppResult<u64> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AppError::invalid_format(format!(
            "Expected digits, got {:?}",
            value
        )));
    }
    value
        .parse()
        .map_err(|_| AppError::invalid_format(format!("Number out of range: {value}")))
}

/// Zero-padded decimal of at least `width` digits
pub(crate) fn format_digits(value: u64, width: usize) -> String {
    format!("{value:0width$}")
}

/// Number of ASCII digits in `value`
pub(crate) fn digit_count(value: &str) -> usize {
    value.bytes().filter(|b| b.is_ascii_digit()).count()
}

/// `value + delta` rendered at `width`; fails below zero
pub(crate) fn shift_digits(value: &str, delta: i64, width: usize) -> AppResult<String> {
    let current = parse_digits(value)?;
    let shifted = current
        .checked_add_signed(delta)
        .ok_or_else(|| AppError::internal(format!("Cannot shift {value} by {delta}")))?;
    Ok(format_digits(shifted, width))
}

/// Item part of a hyphenated ISBN/ISMN (segment before the check digit)
pub(crate) fn item_part(identifier: &str) -> Option<&str> {
    let mut segments = identifier.rsplit('-');
    segments.next()?;
    segments.next()
}

pub(crate) fn corrupt_column(err: serde_json::Error) -> AppError {
    AppError::with_message(
        ErrorCode::InternalError,
        format!("Stored identifier map is not valid JSON: {err}"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digit_helpers() {
        assert_eq!(parse_digits("007").unwrap(), 7);
        assert!(parse_digits("").is_err());
        assert!(parse_digits("1a").is_err());
        assert_eq!(format_digits(7, 3), "007");
        assert_eq!(format_digits(1000, 3), "1000");
        assert_eq!(digit_count("979-0"), 4);
        assert_eq!(shift_digits("005", 1, 3).unwrap(), "006");
        assert_eq!(shift_digits("1000", -3, 3).unwrap(), "997");
        assert!(shift_digits("000", -1, 3).is_err());
    }

    #[test]
    fn test_item_part() {
        assert_eq!(item_part("978-951-000-001-4"), Some("001"));
        assert_eq!(item_part("979-0-2600-0043-8"), Some("0043"));
        assert_eq!(item_part("9789510000014"), None);
    }
}

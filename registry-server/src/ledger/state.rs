//! Open/active state machine shared by ranges, sub-ranges and ISSN ranges
//!
//! States: Open+Inactive, Open+Active, Closed+Inactive. A row with neither
//! free nor canceled slots is closed automatically.

use shared::models::{IssnRange, Range, SubRange};

pub(crate) trait CounterRow {
    /// Free or canceled slots left
    fn has_capacity(&self) -> bool;
    fn is_active(&self) -> bool;
    fn is_closed(&self) -> bool;
    fn set_flags(&mut self, is_active: bool, is_closed: bool);
}

macro_rules! counter_row {
    ($($ty:ty),*) => {
        $(
            impl CounterRow for $ty {
                fn has_capacity(&self) -> bool {
                    <$ty>::has_capacity(self)
                }
                fn is_active(&self) -> bool {
                    self.is_active
                }
                fn is_closed(&self) -> bool {
                    self.is_closed
                }
                fn set_flags(&mut self, is_active: bool, is_closed: bool) {
                    self.is_active = is_active;
                    self.is_closed = is_closed;
                }
            }
        )*
    };
}

counter_row!(Range, SubRange, IssnRange);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TransitionError {
    Closed,
    NoCapacity,
}

/// Open+Inactive → Open+Active; `Ok(false)` when already active
pub(crate) fn activate<T: CounterRow>(row: &mut T) -> Result<bool, TransitionError> {
    if row.is_closed() {
        return Err(TransitionError::Closed);
    }
    if !row.has_capacity() {
        return Err(TransitionError::NoCapacity);
    }
    if row.is_active() {
        return Ok(false);
    }
    row.set_flags(true, false);
    Ok(true)
}

/// Open+Active → Open+Inactive
pub(crate) fn deactivate<T: CounterRow>(row: &mut T) -> Result<bool, TransitionError> {
    if row.is_closed() {
        return Err(TransitionError::Closed);
    }
    if !row.is_active() {
        return Ok(false);
    }
    row.set_flags(false, false);
    Ok(true)
}

/// Any state → Closed+Inactive
pub(crate) fn close<T: CounterRow>(row: &mut T) -> bool {
    if row.is_closed() && !row.is_active() {
        return false;
    }
    row.set_flags(false, true);
    true
}

/// Closed+Inactive → Open+Inactive
pub(crate) fn open<T: CounterRow>(row: &mut T) -> Result<bool, TransitionError> {
    if !row.is_closed() {
        return Ok(false);
    }
    if !row.has_capacity() {
        return Err(TransitionError::NoCapacity);
    }
    row.set_flags(false, false);
    Ok(true)
}

/// Close a row left with no free and no canceled slots
pub(crate) fn close_if_exhausted<T: CounterRow>(row: &mut T) -> bool {
    if row.has_capacity() || row.is_closed() {
        return false;
    }
    row.set_flags(false, true);
    true
}

/// Re-open a row that was closed for exhaustion and regained capacity
pub(crate) fn reopen_if_refilled<T: CounterRow>(row: &mut T, had_capacity: bool) -> bool {
    if !row.is_closed() || had_capacity || !row.has_capacity() {
        return false;
    }
    row.set_flags(false, false);
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct Row {
        free: i64,
        canceled: i64,
        is_active: bool,
        is_closed: bool,
    }

    impl CounterRow for Row {
        fn has_capacity(&self) -> bool {
            self.free > 0 || self.canceled > 0
        }
        fn is_active(&self) -> bool {
            self.is_active
        }
        fn is_closed(&self) -> bool {
            self.is_closed
        }
        fn set_flags(&mut self, is_active: bool, is_closed: bool) {
            self.is_active = is_active;
            self.is_closed = is_closed;
        }
    }

    #[test]
    fn test_activate_requires_open_with_capacity() {
        let mut row = Row { free: 1, ..Default::default() };
        assert_eq!(activate(&mut row), Ok(true));
        assert_eq!(activate(&mut row), Ok(false));

        let mut empty = Row::default();
        assert_eq!(activate(&mut empty), Err(TransitionError::NoCapacity));

        let mut closed = Row { free: 1, is_closed: true, ..Default::default() };
        assert_eq!(activate(&mut closed), Err(TransitionError::Closed));
    }

    #[test]
    fn test_close_then_open() {
        let mut row = Row { canceled: 2, is_active: true, ..Default::default() };
        assert!(close(&mut row));
        assert!(!row.is_active);
        assert!(row.is_closed);
        assert!(!close(&mut row));
        assert_eq!(open(&mut row), Ok(true));
        assert!(!row.is_active && !row.is_closed);

        let mut exhausted = Row { is_closed: true, ..Default::default() };
        assert_eq!(open(&mut exhausted), Err(TransitionError::NoCapacity));
    }

    #[test]
    fn test_exhaustion_and_refill() {
        let mut row = Row { is_active: true, ..Default::default() };
        assert!(close_if_exhausted(&mut row));
        assert!(row.is_closed && !row.is_active);

        row.canceled = 1;
        assert!(reopen_if_refilled(&mut row, false));
        assert!(!row.is_closed);

        // A manual close is not undone
        let mut manual = Row { free: 3, is_closed: true, ..Default::default() };
        manual.canceled = 1;
        assert!(!reopen_if_refilled(&mut manual, true));
    }

    #[test]
    fn test_model_rows_use_their_own_capacity() {
        let mut issn = IssnRange {
            id: 1,
            block: "1234".into(),
            range_begin: "0006".into(),
            range_end: "0022".into(),
            next: String::new(),
            free: 0,
            taken: 2,
            canceled: 1,
            is_active: true,
            is_closed: false,
            created_at: 0,
            created_by: "admin".into(),
            updated_at: 0,
            updated_by: "admin".into(),
        };
        assert!(CounterRow::has_capacity(&issn));
        assert!(!close_if_exhausted(&mut issn));

        issn.canceled = 0;
        assert!(!CounterRow::has_capacity(&issn));
        assert!(close_if_exhausted(&mut issn));
        assert!(issn.is_closed && !issn.is_active);
    }
}

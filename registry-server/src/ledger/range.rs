//! Master range ledger (ISBN / ISMN)

use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::{IdentifierType, Range, RangeCreate, SubRange, SubRangeOptions, SubRangeSelection};
use sqlx::{SqliteConnection, SqlitePool};

use super::state::{self, TransitionError};
use super::{RangeOverlapValidator, digit_count, format_digits, parse_digits, shift_digits};
use crate::auth::CurrentUser;
use crate::db::repository::{canceled_sub_range, publisher, range, sub_range};
use crate::db::{TxScope, TypeProfile};

/// Digits of an ISBN-13 / ISMN without the check digit
pub(crate) const BODY_DIGITS: usize = 12;

/// Master ranges of one identifier type and the sub-ranges carved from them
#[derive(Clone)]
pub struct RangeLedger {
    pool: SqlitePool,
    profile: &'static TypeProfile,
}

impl RangeLedger {
    pub fn new(pool: SqlitePool, identifier_type: IdentifierType) -> Self {
        Self {
            pool,
            profile: TypeProfile::of(identifier_type),
        }
    }

    pub fn identifier_type(&self) -> IdentifierType {
        self.profile.identifier_type
    }

    /// Create an Open+Inactive range after validating its definition and
    /// checking it against existing ranges of the same scope
    pub async fn create(&self, data: RangeCreate, user: &CurrentUser) -> AppResult<Range> {
        let width = self.validate(&data)?;
        let mut scope = TxScope::begin(&self.pool, None).await?;
        let result = self.create_in(scope.conn(), &data, width, user).await;
        scope.finish(result).await
    }

    async fn create_in(
        &self,
        conn: &mut SqliteConnection,
        data: &RangeCreate,
        width: usize,
        user: &CurrentUser,
    ) -> AppResult<Range> {
        let existing =
            range::find_by_scope(conn, self.profile, &data.prefix, &data.lang_group).await?;
        let validator = RangeOverlapValidator::new(width);
        if let Some(other) = validator.first_overlap(
            (data.range_begin.as_str(), data.range_end.as_str()),
            existing
                .iter()
                .map(|r| (r.id, r.range_begin.as_str(), r.range_end.as_str())),
        ) {
            return Err(AppError::with_message(
                ErrorCode::RangeOverlap,
                format!(
                    "{} range {}-{} overlaps range {other}",
                    self.profile.identifier_type, data.range_begin, data.range_end
                ),
            )
            .with_detail("range_id", other));
        }

        let free = parse_digits(&data.range_end)? - parse_digits(&data.range_begin)? + 1;
        let created = range::create(conn, self.profile, data, free as i64, user.audit_name()).await?;
        tracing::info!(
            identifier_type = %self.profile.identifier_type,
            range_id = created.id,
            begin = %created.range_begin,
            end = %created.range_end,
            category = created.category,
            "Range created"
        );
        Ok(created)
    }

    /// Validate prefix, language group, category and bounds; returns the
    /// combined publisher + item width used for overlap checks
    fn validate(&self, data: &RangeCreate) -> AppResult<usize> {
        let invalid = |msg: String| AppError::with_message(ErrorCode::RangeInvalidBounds, msg);

        match self.profile.identifier_type {
            IdentifierType::Isbn => {
                if data.prefix != "978" && data.prefix != "979" {
                    return Err(invalid(format!("Invalid ISBN prefix {:?}", data.prefix)));
                }
                let lang_ok = (1..=5).contains(&data.lang_group.len())
                    && data.lang_group.bytes().all(|b| b.is_ascii_digit());
                if !lang_ok {
                    return Err(invalid(format!(
                        "Invalid language group {:?}",
                        data.lang_group
                    )));
                }
            }
            IdentifierType::Ismn => {
                if data.prefix != "979-0" {
                    return Err(invalid(format!("Invalid ISMN prefix {:?}", data.prefix)));
                }
                if !data.lang_group.is_empty() {
                    return Err(invalid("ISMN ranges have no language group".into()));
                }
            }
        }

        let scope_digits = digit_count(&data.prefix) + digit_count(&data.lang_group);
        let width = BODY_DIGITS - scope_digits;
        if data.category < 1 || data.category as usize >= width {
            return Err(invalid(format!(
                "Category {} leaves no room for publisher digits",
                data.category
            )));
        }
        let publisher_width = width - data.category as usize;

        for bound in [&data.range_begin, &data.range_end] {
            if bound.len() != publisher_width || !bound.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid(format!(
                    "Bound {bound:?} must be {publisher_width} digits"
                )));
            }
        }
        if data.range_begin > data.range_end {
            return Err(invalid(format!(
                "Range begin {} is after range end {}",
                data.range_begin, data.range_end
            )));
        }
        Ok(width)
    }

    pub async fn read(&self, id: i64) -> AppResult<Range> {
        let mut conn = self.pool.acquire().await.map_err(crate::db::repository::RepoError::from)?;
        load(&mut conn, self.profile, id).await
    }

    pub async fn read_all(&self) -> AppResult<Vec<Range>> {
        let mut conn = self.pool.acquire().await.map_err(crate::db::repository::RepoError::from)?;
        Ok(range::find_all(&mut conn, self.profile).await?)
    }

    /// Delete a range nothing was carved from, with its archived publisher parts
    pub async fn remove(&self, id: i64, user: &CurrentUser) -> AppResult<()> {
        let mut scope = TxScope::begin(&self.pool, None).await?;
        let result = self.remove_in(scope.conn(), id, user).await;
        scope.finish(result).await
    }

    async fn remove_in(&self, conn: &mut SqliteConnection, id: i64, user: &CurrentUser) -> AppResult<()> {
        let current = load(conn, self.profile, id).await?;
        let sub_ranges = sub_range::count_by_range(conn, self.profile, id).await?;
        if sub_ranges > 0 || current.taken > 0 {
            return Err(AppError::with_message(
                ErrorCode::RangeInUse,
                format!("Range {id} has {sub_ranges} sub-ranges and {} taken", current.taken),
            ));
        }
        let purged = canceled_sub_range::delete_by_range(conn, self.profile, id).await?;
        range::delete(conn, self.profile, id).await?;
        tracing::info!(
            identifier_type = %self.profile.identifier_type,
            range_id = id,
            purged,
            user = user.audit_name(),
            "Range removed"
        );
        Ok(())
    }

    /// Activate a range; every other range of the type is deactivated
    pub async fn activate(&self, id: i64, user: &CurrentUser) -> AppResult<Range> {
        self.transition(id, user, Transition::Activate).await
    }

    pub async fn deactivate(&self, id: i64, user: &CurrentUser) -> AppResult<Range> {
        self.transition(id, user, Transition::Deactivate).await
    }

    pub async fn open(&self, id: i64, user: &CurrentUser) -> AppResult<Range> {
        self.transition(id, user, Transition::Open).await
    }

    pub async fn close(&self, id: i64, user: &CurrentUser) -> AppResult<Range> {
        self.transition(id, user, Transition::Close).await
    }

    async fn transition(&self, id: i64, user: &CurrentUser, transition: Transition) -> AppResult<Range> {
        let mut scope = TxScope::begin(&self.pool, None).await?;
        let result = self.transition_in(scope.conn(), id, user, transition).await;
        scope.finish(result).await
    }

    async fn transition_in(
        &self,
        conn: &mut SqliteConnection,
        id: i64,
        user: &CurrentUser,
        transition: Transition,
    ) -> AppResult<Range> {
        let mut current = load(conn, self.profile, id).await?;
        let changed = match transition {
            Transition::Activate => state::activate(&mut current),
            Transition::Deactivate => state::deactivate(&mut current),
            Transition::Open => state::open(&mut current),
            Transition::Close => Ok(state::close(&mut current)),
        }
        .map_err(|e| transition_error(id, e))?;

        if transition == Transition::Activate {
            range::deactivate_others(conn, self.profile, id, user.audit_name()).await?;
        }
        if changed {
            range::save(conn, self.profile, &current, user.audit_name()).await?;
            tracing::info!(
                identifier_type = %self.profile.identifier_type,
                range_id = id,
                transition = ?transition,
                "Range state changed"
            );
        }
        Ok(current)
    }

    /// Fresh publisher identifier and archived ones available for a new sub-range
    pub async fn subrange_options(&self, range_id: i64) -> AppResult<SubRangeOptions> {
        let mut conn = self.pool.acquire().await.map_err(crate::db::repository::RepoError::from)?;
        let current = load(&mut conn, self.profile, range_id).await?;
        let canceled = canceled_sub_range::find_by_range(&mut conn, self.profile, range_id).await?;
        let next = (current.free > 0).then(|| format!("{}-{}", current.scope(), current.next));
        Ok(SubRangeOptions {
            range_id,
            next,
            canceled,
        })
    }

    /// Carve a sub-range for a publisher and make it the publisher's active one
    pub async fn generate_subrange(
        &self,
        range_id: i64,
        publisher_id: i64,
        selection: SubRangeSelection,
        user: &CurrentUser,
    ) -> AppResult<SubRange> {
        let mut scope = TxScope::begin(&self.pool, None).await?;
        let result = self
            .generate_subrange_in(scope.conn(), range_id, publisher_id, selection, user)
            .await;
        scope.finish(result).await
    }

    async fn generate_subrange_in(
        &self,
        conn: &mut SqliteConnection,
        range_id: i64,
        publisher_id: i64,
        selection: SubRangeSelection,
        user: &CurrentUser,
    ) -> AppResult<SubRange> {
        let mut current = load(conn, self.profile, range_id).await?;
        if current.is_closed {
            return Err(AppError::with_message(
                ErrorCode::RangeClosed,
                format!("Range {range_id} is closed"),
            ));
        }
        if !current.is_active {
            return Err(AppError::with_message(
                ErrorCode::RangeNotActive,
                format!("Range {range_id} is not active"),
            ));
        }
        if publisher::find_by_id(conn, publisher_id).await?.is_none() {
            return Err(AppError::with_message(
                ErrorCode::PublisherNotFound,
                format!("Publisher {publisher_id} not found"),
            ));
        }

        let width = current.range_begin.len();
        let publisher_part = match selection {
            SubRangeSelection::Next => {
                if current.free <= 0 {
                    return Err(AppError::with_message(
                        ErrorCode::RangeExhausted,
                        format!("Range {range_id} has no free publisher identifiers"),
                    ));
                }
                let part = current.next.clone();
                current.next = shift_digits(&part, 1, width)?;
                current.free -= 1;
                current.taken += 1;
                part
            }
            SubRangeSelection::Canceled(canceled_id) => {
                let archived = canceled_sub_range::find_by_id(conn, self.profile, canceled_id)
                    .await?
                    .filter(|c| c.range_id == range_id)
                    .ok_or_else(|| {
                        AppError::with_message(
                            ErrorCode::CanceledSubRangeNotFound,
                            format!("Cancelled sub-range {canceled_id} not found in range {range_id}"),
                        )
                    })?;
                canceled_sub_range::delete(conn, self.profile, archived.id).await?;
                current.canceled -= 1;
                current.taken += 1;
                archived.identifier
            }
        };
        if state::close_if_exhausted(&mut current) {
            tracing::info!(range_id, "Range exhausted, closed");
        }
        range::save(conn, self.profile, &current, user.audit_name()).await?;

        let category = current.category as usize;
        let publisher_identifier = format!("{}-{}", current.scope(), publisher_part);
        let begin = format_digits(0, category);
        let end = "9".repeat(category);
        let mut created = sub_range::create(
            conn,
            self.profile,
            &sub_range::NewSubRange {
                publisher_id,
                range_id,
                publisher_identifier: &publisher_identifier,
                category: current.category,
                range_begin: &begin,
                range_end: &end,
                free: 10_i64.pow(category as u32),
            },
            user.audit_name(),
        )
        .await?;
        super::sub_range::activate_in(conn, self.profile, &mut created, user).await?;

        tracing::info!(
            identifier_type = %self.profile.identifier_type,
            range_id,
            publisher_id,
            sub_range_id = created.id,
            publisher_identifier = %created.publisher_identifier,
            "Sub-range generated"
        );
        Ok(created)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transition {
    Activate,
    Deactivate,
    Open,
    Close,
}

fn transition_error(id: i64, err: TransitionError) -> AppError {
    match err {
        TransitionError::Closed => AppError::with_message(
            ErrorCode::RangeStateConflict,
            format!("Range {id} is closed"),
        ),
        TransitionError::NoCapacity => AppError::with_message(
            ErrorCode::RangeExhausted,
            format!("Range {id} has no free or cancelled publisher identifiers"),
        ),
    }
}

pub(crate) async fn load(conn: &mut SqliteConnection, profile: &TypeProfile, id: i64) -> AppResult<Range> {
    range::find_by_id(conn, profile, id).await?.ok_or_else(|| {
        AppError::with_message(ErrorCode::RangeNotFound, format!("Range {id} not found"))
    })
}

/// Apply the exhaustion / refill rules and persist
pub(crate) async fn settle(
    conn: &mut SqliteConnection,
    profile: &TypeProfile,
    current: &mut Range,
    had_capacity: bool,
    user: &CurrentUser,
) -> AppResult<()> {
    if state::close_if_exhausted(current) {
        tracing::info!(range_id = current.id, "Range exhausted, closed");
    } else if state::reopen_if_refilled(current, had_capacity) {
        tracing::info!(range_id = current.id, "Range re-opened");
    }
    debug_assert!(current.has_capacity() || current.is_closed);
    range::save(conn, profile, current, user.audit_name()).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbService;
    use shared::models::PublisherCreate;

    fn admin() -> CurrentUser {
        CurrentUser::new(1, "admin")
    }

    fn finnish(begin: &str, end: &str, category: i64) -> RangeCreate {
        RangeCreate {
            prefix: "978".into(),
            lang_group: "951".into(),
            category,
            range_begin: begin.into(),
            range_end: end.into(),
        }
    }

    async fn setup() -> (DbService, RangeLedger) {
        let db = DbService::open_in_memory().await.unwrap();
        let ledger = RangeLedger::new(db.pool.clone(), IdentifierType::Isbn);
        (db, ledger)
    }

    async fn add_publisher(db: &DbService) -> i64 {
        let mut conn = db.pool.acquire().await.unwrap();
        publisher::create(&mut conn, &PublisherCreate { name: "WSOY".into() })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_create_sets_counters() {
        let (_db, ledger) = setup().await;
        let r = ledger.create(finnish("000", "005", 3), &admin()).await.unwrap();
        assert_eq!(r.next, "000");
        assert_eq!(r.free, 6);
        assert_eq!(r.taken + r.canceled, 0);
        assert!(!r.is_active && !r.is_closed);
    }

    #[tokio::test]
    async fn test_create_rejects_bad_definitions() {
        let (_db, ledger) = setup().await;
        let err = ledger.create(finnish("00", "05", 3), &admin()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::RangeInvalidBounds);

        let err = ledger.create(finnish("005", "000", 3), &admin()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::RangeInvalidBounds);

        let mut bad_prefix = finnish("000", "005", 3);
        bad_prefix.prefix = "977".into();
        let err = ledger.create(bad_prefix, &admin()).await.unwrap_err();
        assert_eq!(err.http_status(), shared::http::StatusCode::UNPROCESSABLE_ENTITY);

        let err = ledger.create(finnish("000", "005", 6), &admin()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::RangeInvalidBounds);
    }

    #[tokio::test]
    async fn test_create_rejects_overlap_across_categories() {
        let (_db, ledger) = setup().await;
        ledger.create(finnish("000", "005", 3), &admin()).await.unwrap();

        let err = ledger.create(finnish("0050", "0059", 2), &admin()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::RangeOverlap);

        ledger.create(finnish("0060", "0099", 2), &admin()).await.unwrap();
        assert_eq!(ledger.read_all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_activate_is_exclusive_per_type() {
        let (_db, ledger) = setup().await;
        let a = ledger.create(finnish("000", "005", 3), &admin()).await.unwrap();
        let b = ledger.create(finnish("006", "009", 3), &admin()).await.unwrap();

        ledger.activate(a.id, &admin()).await.unwrap();
        ledger.activate(b.id, &admin()).await.unwrap();
        assert!(!ledger.read(a.id).await.unwrap().is_active);
        assert!(ledger.read(b.id).await.unwrap().is_active);

        let closed = ledger.close(b.id, &admin()).await.unwrap();
        assert!(closed.is_closed && !closed.is_active);
        let err = ledger.activate(b.id, &admin()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::RangeStateConflict);
        let reopened = ledger.open(b.id, &admin()).await.unwrap();
        assert!(!reopened.is_closed);
    }

    #[tokio::test]
    async fn test_generate_subrange_requires_active_range() {
        let (db, ledger) = setup().await;
        let publisher_id = add_publisher(&db).await;
        let r = ledger.create(finnish("000", "005", 3), &admin()).await.unwrap();

        let err = ledger
            .generate_subrange(r.id, publisher_id, SubRangeSelection::Next, &admin())
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::RangeNotActive);

        ledger.activate(r.id, &admin()).await.unwrap();
        let err = ledger
            .generate_subrange(r.id, 999, SubRangeSelection::Next, &admin())
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::PublisherNotFound);
    }

    #[tokio::test]
    async fn test_generate_subrange_next() {
        let (db, ledger) = setup().await;
        let publisher_id = add_publisher(&db).await;
        let r = ledger.create(finnish("000", "005", 3), &admin()).await.unwrap();
        ledger.activate(r.id, &admin()).await.unwrap();

        let sr = ledger
            .generate_subrange(r.id, publisher_id, SubRangeSelection::Next, &admin())
            .await
            .unwrap();
        assert_eq!(sr.publisher_identifier, "978-951-000");
        assert_eq!(sr.range_begin, "000");
        assert_eq!(sr.range_end, "999");
        assert_eq!(sr.free, 1000);
        assert!(sr.is_active && !sr.is_closed);

        let r = ledger.read(r.id).await.unwrap();
        assert_eq!(r.next, "001");
        assert_eq!((r.free, r.taken, r.canceled), (5, 1, 0));

        let mut conn = db.pool.acquire().await.unwrap();
        let p = publisher::find_by_id(&mut conn, publisher_id).await.unwrap().unwrap();
        assert_eq!(p.active_identifier_isbn.as_deref(), Some("978-951-000"));
    }

    #[tokio::test]
    async fn test_generate_until_exhausted_closes_range() {
        let (db, ledger) = setup().await;
        let publisher_id = add_publisher(&db).await;
        let r = ledger.create(finnish("000", "001", 3), &admin()).await.unwrap();
        ledger.activate(r.id, &admin()).await.unwrap();

        for _ in 0..2 {
            ledger
                .generate_subrange(r.id, publisher_id, SubRangeSelection::Next, &admin())
                .await
                .unwrap();
        }
        let r = ledger.read(r.id).await.unwrap();
        assert!(r.is_closed && !r.is_active);
        assert_eq!(r.free, 0);

        let options = ledger.subrange_options(r.id).await.unwrap();
        assert!(options.next.is_none());
        assert!(options.canceled.is_empty());

        let err = ledger
            .generate_subrange(r.id, publisher_id, SubRangeSelection::Next, &admin())
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::RangeClosed);
    }

    #[tokio::test]
    async fn test_remove_refused_while_sub_ranges_exist() {
        let (db, ledger) = setup().await;
        let publisher_id = add_publisher(&db).await;
        let r = ledger.create(finnish("000", "005", 3), &admin()).await.unwrap();
        ledger.activate(r.id, &admin()).await.unwrap();
        ledger
            .generate_subrange(r.id, publisher_id, SubRangeSelection::Next, &admin())
            .await
            .unwrap();

        let err = ledger.remove(r.id, &admin()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::RangeInUse);

        let unused = ledger.create(finnish("006", "009", 3), &admin()).await.unwrap();
        ledger.remove(unused.id, &admin()).await.unwrap();
        let err = ledger.read(unused.id).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::RangeNotFound);
    }

    #[tokio::test]
    async fn test_ismn_range() {
        let db = DbService::open_in_memory().await.unwrap();
        let ledger = RangeLedger::new(db.pool.clone(), IdentifierType::Ismn);
        let r = ledger
            .create(
                RangeCreate {
                    prefix: "979-0".into(),
                    lang_group: String::new(),
                    category: 4,
                    range_begin: "2600".into(),
                    range_end: "2699".into(),
                },
                &admin(),
            )
            .await
            .unwrap();
        assert_eq!(r.free, 100);
        assert_eq!(r.scope(), "979-0");
    }
}

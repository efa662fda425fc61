//! Publisher sub-range ledger
//!
//! A sub-range is a publisher identifier carved from a master range together
//! with the item space behind it. At most one sub-range per publisher and
//! identifier type is active; the active one is mirrored on the publisher row.

use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::{BatchRequest, IdentifierBatchDetail, IdentifierType, SubRange};
use sqlx::{SqliteConnection, SqlitePool};

use super::state::{self, TransitionError};
use super::{IdentifierAllocator, parse_digits, shift_digits};
use crate::auth::CurrentUser;
use crate::db::repository::{
    RepoError, canceled_identifier, canceled_sub_range, identifier, identifier_batch, publisher,
    sub_range,
};
use crate::db::{TxScope, TypeProfile};

#[derive(Clone)]
pub struct SubRangeLedger {
    pool: SqlitePool,
    profile: &'static TypeProfile,
}

impl SubRangeLedger {
    pub fn new(pool: SqlitePool, identifier_type: IdentifierType) -> Self {
        Self {
            pool,
            profile: TypeProfile::of(identifier_type),
        }
    }

    pub async fn read(&self, id: i64) -> AppResult<SubRange> {
        let mut conn = self.pool.acquire().await.map_err(RepoError::from)?;
        load(&mut conn, self.profile, id).await
    }

    pub async fn read_by_publisher(&self, publisher_id: i64) -> AppResult<Vec<SubRange>> {
        let mut conn = self.pool.acquire().await.map_err(RepoError::from)?;
        Ok(sub_range::find_by_publisher(&mut conn, self.profile, publisher_id).await?)
    }

    /// Make the sub-range the publisher's active one
    pub async fn activate(
        &self,
        id: i64,
        user: &CurrentUser,
        tx: Option<&mut SqliteConnection>,
    ) -> AppResult<SubRange> {
        self.transition(id, user, tx, Transition::Activate).await
    }

    pub async fn deactivate(
        &self,
        id: i64,
        user: &CurrentUser,
        tx: Option<&mut SqliteConnection>,
    ) -> AppResult<SubRange> {
        self.transition(id, user, tx, Transition::Deactivate).await
    }

    pub async fn open(
        &self,
        id: i64,
        user: &CurrentUser,
        tx: Option<&mut SqliteConnection>,
    ) -> AppResult<SubRange> {
        self.transition(id, user, tx, Transition::Open).await
    }

    pub async fn close(
        &self,
        id: i64,
        user: &CurrentUser,
        tx: Option<&mut SqliteConnection>,
    ) -> AppResult<SubRange> {
        self.transition(id, user, tx, Transition::Close).await
    }

    async fn transition(
        &self,
        id: i64,
        user: &CurrentUser,
        tx: Option<&mut SqliteConnection>,
        transition: Transition,
    ) -> AppResult<SubRange> {
        let mut scope = TxScope::begin(&self.pool, tx).await?;
        let result = self.transition_in(scope.conn(), id, user, transition).await;
        scope.finish(result).await
    }

    async fn transition_in(
        &self,
        conn: &mut SqliteConnection,
        id: i64,
        user: &CurrentUser,
        transition: Transition,
    ) -> AppResult<SubRange> {
        let mut current = load(conn, self.profile, id).await?;
        match transition {
            Transition::Activate => activate_in(conn, self.profile, &mut current, user).await?,
            Transition::Deactivate => deactivate_in(conn, self.profile, &mut current, user).await?,
            Transition::Open => {
                if state::open(&mut current).map_err(|e| transition_error(id, e))? {
                    sub_range::save(conn, self.profile, &current, user.audit_name()).await?;
                    tracing::info!(sub_range_id = id, "Sub-range opened");
                }
            }
            Transition::Close => {
                if state::close(&mut current) {
                    sub_range::save(conn, self.profile, &current, user.audit_name()).await?;
                    publisher::clear_active_identifier_if(
                        conn,
                        self.profile,
                        current.publisher_id,
                        &current.publisher_identifier,
                    )
                    .await?;
                    tracing::info!(sub_range_id = id, "Sub-range closed");
                }
            }
        }
        Ok(current)
    }

    /// Delete an unused sub-range and give its publisher identifier back to
    /// the parent range
    pub async fn remove(&self, id: i64, user: &CurrentUser) -> AppResult<()> {
        let mut scope = TxScope::begin(&self.pool, None).await?;
        let result = self.remove_in(scope.conn(), id, user).await;
        scope.finish(result).await
    }

    async fn remove_in(&self, conn: &mut SqliteConnection, id: i64, user: &CurrentUser) -> AppResult<()> {
        let profile = self.profile;
        let current = load(conn, profile, id).await?;

        let identifiers = identifier::count_by_sub_range(conn, profile.identifier_type, id).await?;
        let batches = identifier_batch::count_by_sub_range(conn, profile.identifier_type, id).await?;
        if identifiers > 0 || batches > 0 {
            return Err(AppError::with_message(
                ErrorCode::SubRangeInUse,
                format!("Sub-range {id} is referenced by {identifiers} identifiers and {batches} batches"),
            ));
        }

        let pooled = canceled_identifier::count_by_sub_range(conn, profile.identifier_type, id).await?;
        if pooled != current.canceled || current.taken != 0 {
            return Err(AppError::with_message(
                ErrorCode::SubRangeCounterMismatch,
                format!(
                    "Sub-range {id} counts {} cancelled / {} taken but has {pooled} pooled rows",
                    current.canceled, current.taken
                ),
            ));
        }
        if current.deleted > 0 {
            return Err(AppError::with_message(
                ErrorCode::SubRangeHasDeletedIdentifiers,
                format!("Sub-range {id} has {} removed identifiers", current.deleted),
            ));
        }

        let mut parent = super::range::load(conn, profile, current.range_id).await?;
        let had_capacity = parent.has_capacity();
        let part = current.publisher_part();
        let width = parent.range_begin.len();
        let rolled_back = match previous_issued(&parent.next, &parent.range_begin, width)? {
            Some(previous) if previous == part => {
                parent.next = previous;
                parent.free += 1;
                parent.taken -= 1;
                true
            }
            _ => {
                canceled_sub_range::create(
                    conn,
                    profile,
                    part,
                    parent.id,
                    current.category,
                    user.audit_name(),
                )
                .await?;
                parent.taken -= 1;
                parent.canceled += 1;
                false
            }
        };
        super::range::settle(conn, profile, &mut parent, had_capacity, user).await?;

        let purged = canceled_identifier::delete_by_sub_range(conn, profile.identifier_type, id).await?;
        sub_range::delete(conn, profile, id).await?;
        publisher::clear_active_identifier_if(
            conn,
            profile,
            current.publisher_id,
            &current.publisher_identifier,
        )
        .await?;

        tracing::info!(
            identifier_type = %profile.identifier_type,
            sub_range_id = id,
            publisher_identifier = %current.publisher_identifier,
            rolled_back,
            purged,
            "Sub-range removed"
        );
        Ok(())
    }

    /// Allocate a batch from the publisher's active sub-range
    pub async fn generate_identifier_batch(
        &self,
        publisher_id: i64,
        request: BatchRequest,
        user: &CurrentUser,
    ) -> AppResult<IdentifierBatchDetail> {
        IdentifierAllocator::new(self.pool.clone(), self.profile.identifier_type)
            .allocate(publisher_id, request, user, None)
            .await
    }
}

#[derive(Debug, Clone, Copy)]
enum Transition {
    Activate,
    Deactivate,
    Open,
    Close,
}

/// `next - 1` at `width`, or `None` when nothing was issued yet
fn previous_issued(next: &str, begin: &str, width: usize) -> AppResult<Option<String>> {
    if parse_digits(next)? <= parse_digits(begin)? {
        return Ok(None);
    }
    shift_digits(next, -1, width).map(Some)
}

fn transition_error(id: i64, err: TransitionError) -> AppError {
    let message = match err {
        TransitionError::Closed => format!("Sub-range {id} is closed"),
        TransitionError::NoCapacity => {
            format!("Sub-range {id} has no free or cancelled identifiers")
        }
    };
    AppError::with_message(ErrorCode::SubRangeStateConflict, message)
}

pub(crate) async fn load(conn: &mut SqliteConnection, profile: &TypeProfile, id: i64) -> AppResult<SubRange> {
    sub_range::find_by_id(conn, profile, id).await?.ok_or_else(|| {
        AppError::with_message(
            ErrorCode::SubRangeNotFound,
            format!("Sub-range {id} not found"),
        )
    })
}

/// Activate `current`, deactivating the publisher's other sub-ranges
pub(crate) async fn activate_in(
    conn: &mut SqliteConnection,
    profile: &TypeProfile,
    current: &mut SubRange,
    user: &CurrentUser,
) -> AppResult<()> {
    let changed = state::activate(current).map_err(|e| transition_error(current.id, e))?;
    let others = sub_range::deactivate_publisher_others(
        conn,
        profile,
        current.publisher_id,
        current.id,
        user.audit_name(),
    )
    .await?;
    if changed {
        sub_range::save(conn, profile, current, user.audit_name()).await?;
    }
    publisher::set_active_identifier(
        conn,
        profile,
        current.publisher_id,
        Some(&current.publisher_identifier),
    )
    .await?;
    tracing::info!(
        sub_range_id = current.id,
        publisher_id = current.publisher_id,
        deactivated = others,
        "Sub-range activated"
    );
    Ok(())
}

pub(crate) async fn deactivate_in(
    conn: &mut SqliteConnection,
    profile: &TypeProfile,
    current: &mut SubRange,
    user: &CurrentUser,
) -> AppResult<()> {
    if state::deactivate(current).map_err(|e| transition_error(current.id, e))? {
        sub_range::save(conn, profile, current, user.audit_name()).await?;
        publisher::clear_active_identifier_if(
            conn,
            profile,
            current.publisher_id,
            &current.publisher_identifier,
        )
        .await?;
        tracing::info!(sub_range_id = current.id, "Sub-range deactivated");
    }
    Ok(())
}

/// Apply the exhaustion / refill rules and persist. A refilled sub-range
/// becomes active again when the publisher has no other active one.
pub(crate) async fn settle(
    conn: &mut SqliteConnection,
    profile: &TypeProfile,
    current: &mut SubRange,
    had_capacity: bool,
    user: &CurrentUser,
) -> AppResult<()> {
    if state::close_if_exhausted(current) {
        publisher::clear_active_identifier_if(
            conn,
            profile,
            current.publisher_id,
            &current.publisher_identifier,
        )
        .await?;
        tracing::info!(
            sub_range_id = current.id,
            publisher_identifier = %current.publisher_identifier,
            "Sub-range exhausted, closed"
        );
    } else if state::reopen_if_refilled(current, had_capacity) {
        let siblings =
            sub_range::count_active_siblings(conn, profile, current.publisher_id, current.id).await?;
        if siblings == 0 {
            match state::activate(current) {
                Ok(true) => {
                    publisher::set_active_identifier(
                        conn,
                        profile,
                        current.publisher_id,
                        Some(&current.publisher_identifier),
                    )
                    .await?;
                }
                Ok(false) => {}
                Err(e) => tracing::warn!(
                    sub_range_id = current.id,
                    error = ?e,
                    "Re-opened sub-range could not be activated"
                ),
            }
        }
        tracing::info!(
            sub_range_id = current.id,
            is_active = current.is_active,
            "Sub-range re-opened"
        );
    }
    sub_range::save(conn, profile, current, user.audit_name()).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbService;
    use crate::ledger::RangeLedger;
    use shared::models::{PublisherCreate, RangeCreate, SubRangeSelection};

    fn admin() -> CurrentUser {
        CurrentUser::new(1, "admin")
    }

    struct Fixture {
        db: DbService,
        ranges: RangeLedger,
        ledger: SubRangeLedger,
        range_id: i64,
        publisher_id: i64,
    }

    async fn setup() -> Fixture {
        let db = DbService::open_in_memory().await.unwrap();
        let ranges = RangeLedger::new(db.pool.clone(), IdentifierType::Isbn);
        let ledger = SubRangeLedger::new(db.pool.clone(), IdentifierType::Isbn);
        let r = ranges
            .create(
                RangeCreate {
                    prefix: "978".into(),
                    lang_group: "951".into(),
                    category: 3,
                    range_begin: "000".into(),
                    range_end: "005".into(),
                },
                &admin(),
            )
            .await
            .unwrap();
        ranges.activate(r.id, &admin()).await.unwrap();
        let mut conn = db.pool.acquire().await.unwrap();
        let publisher_id = publisher::create(&mut conn, &PublisherCreate { name: "Otava".into() })
            .await
            .unwrap()
            .id;
        Fixture {
            db,
            ranges,
            ledger,
            range_id: r.id,
            publisher_id,
        }
    }

    async fn carve(f: &Fixture) -> SubRange {
        f.ranges
            .generate_subrange(f.range_id, f.publisher_id, SubRangeSelection::Next, &admin())
            .await
            .unwrap()
    }

    async fn active_column(f: &Fixture) -> Option<String> {
        let mut conn = f.db.pool.acquire().await.unwrap();
        publisher::find_by_id(&mut conn, f.publisher_id)
            .await
            .unwrap()
            .unwrap()
            .active_identifier_isbn
    }

    #[tokio::test]
    async fn test_only_one_active_per_publisher() {
        let f = setup().await;
        let first = carve(&f).await;
        let second = carve(&f).await;

        assert!(!f.ledger.read(first.id).await.unwrap().is_active);
        assert!(f.ledger.read(second.id).await.unwrap().is_active);
        assert_eq!(active_column(&f).await.as_deref(), Some("978-951-001"));

        f.ledger.activate(first.id, &admin(), None).await.unwrap();
        assert!(!f.ledger.read(second.id).await.unwrap().is_active);
        assert_eq!(active_column(&f).await.as_deref(), Some("978-951-000"));
    }

    #[tokio::test]
    async fn test_deactivate_and_close_clear_publisher_attribute() {
        let f = setup().await;
        let sr = carve(&f).await;

        let sr = f.ledger.deactivate(sr.id, &admin(), None).await.unwrap();
        assert!(!sr.is_active);
        assert_eq!(active_column(&f).await, None);

        f.ledger.activate(sr.id, &admin(), None).await.unwrap();
        let sr = f.ledger.close(sr.id, &admin(), None).await.unwrap();
        assert!(sr.is_closed && !sr.is_active);
        assert_eq!(active_column(&f).await, None);

        let err = f.ledger.activate(sr.id, &admin(), None).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::SubRangeStateConflict);

        let sr = f.ledger.open(sr.id, &admin(), None).await.unwrap();
        assert!(!sr.is_closed && !sr.is_active);
    }

    #[tokio::test]
    async fn test_borrowed_transaction_is_not_committed() {
        let f = setup().await;
        let sr = carve(&f).await;

        let mut tx = f.db.pool.begin().await.unwrap();
        f.ledger.close(sr.id, &admin(), Some(&mut *tx)).await.unwrap();
        tx.rollback().await.unwrap();

        assert!(!f.ledger.read(sr.id).await.unwrap().is_closed);
    }

    #[tokio::test]
    async fn test_remove_last_issued_rolls_parent_back() {
        let f = setup().await;
        let sr = carve(&f).await;

        f.ledger.remove(sr.id, &admin()).await.unwrap();

        let parent = f.ranges.read(f.range_id).await.unwrap();
        assert_eq!(parent.next, "000");
        assert_eq!((parent.free, parent.taken, parent.canceled), (6, 0, 0));
        assert_eq!(active_column(&f).await, None);
        let err = f.ledger.read(sr.id).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::SubRangeNotFound);
    }

    #[tokio::test]
    async fn test_remove_older_sub_range_is_archived() {
        let f = setup().await;
        let first = carve(&f).await;
        carve(&f).await;

        f.ledger.remove(first.id, &admin()).await.unwrap();

        let parent = f.ranges.read(f.range_id).await.unwrap();
        assert_eq!(parent.next, "002");
        assert_eq!((parent.free, parent.taken, parent.canceled), (4, 1, 1));

        let options = f.ranges.subrange_options(f.range_id).await.unwrap();
        assert_eq!(options.next.as_deref(), Some("978-951-002"));
        assert_eq!(options.canceled.len(), 1);
        assert_eq!(options.canceled[0].identifier, "000");

        let reused = f
            .ranges
            .generate_subrange(
                f.range_id,
                f.publisher_id,
                SubRangeSelection::Canceled(options.canceled[0].id),
                &admin(),
            )
            .await
            .unwrap();
        assert_eq!(reused.publisher_identifier, "978-951-000");
        let parent = f.ranges.read(f.range_id).await.unwrap();
        assert_eq!((parent.free, parent.taken, parent.canceled), (4, 2, 0));
    }

    #[tokio::test]
    async fn test_remove_refused_while_identifiers_exist() {
        let f = setup().await;
        let sr = carve(&f).await;
        f.ledger
            .generate_identifier_batch(f.publisher_id, BatchRequest::Count(2), &admin())
            .await
            .unwrap();

        let err = f.ledger.remove(sr.id, &admin()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::SubRangeInUse);
    }

    #[test]
    fn test_previous_issued() {
        assert_eq!(previous_issued("000", "000", 3).unwrap(), None);
        assert_eq!(previous_issued("001", "000", 3).unwrap().as_deref(), Some("000"));
        assert_eq!(previous_issued("1000", "000", 3).unwrap().as_deref(), Some("999"));
    }

    #[tokio::test]
    async fn test_refilled_sub_range_stays_inactive_beside_active_sibling() {
        let f = setup().await;
        let first = carve(&f).await;
        {
            let mut conn = f.db.pool.acquire().await.unwrap();
            let mut sr = sub_range::find_by_id(&mut conn, f.ledger.profile, first.id)
                .await
                .unwrap()
                .unwrap();
            sr.next = "999".into();
            sr.free = 1;
            sr.taken = 999;
            sub_range::save(&mut conn, f.ledger.profile, &sr, "test").await.unwrap();
        }
        let detail = f
            .ledger
            .generate_identifier_batch(f.publisher_id, BatchRequest::Count(1), &admin())
            .await
            .unwrap();
        assert!(f.ledger.read(first.id).await.unwrap().is_closed);

        let second = carve(&f).await;
        assert_eq!(active_column(&f).await.as_deref(), Some("978-951-001"));

        crate::ledger::IdentifierRetirement::new(f.db.pool.clone())
            .cancel(&detail.identifiers[0].identifier, &admin(), None)
            .await
            .unwrap();

        let first = f.ledger.read(first.id).await.unwrap();
        assert!(!first.is_closed && !first.is_active);
        assert_eq!(first.canceled, 1);
        assert!(f.ledger.read(second.id).await.unwrap().is_active);
        assert_eq!(active_column(&f).await.as_deref(), Some("978-951-001"));
    }
}


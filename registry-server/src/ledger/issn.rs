//! ISSN ledger
//!
//! ISSN ranges live inside a 4-digit block and are addressed by 3-digit
//! sequence numbers; bounds and `next` carry the check character. Serial
//! publications receive one ISSN each, preferring the global cancelled pool.

use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::{IssnForm, IssnFormStatus, IssnRange, IssnRangeCreate, IssnUsed};
use sqlx::{SqliteConnection, SqlitePool};

use super::checksum::issn_check_digit;
use super::state::{self, TransitionError};
use super::{RangeOverlapValidator, format_digits, parse_digits};
use crate::auth::CurrentUser;
use crate::db::TxScope;
use crate::db::repository::{
    RepoError, issn_canceled, issn_form, issn_publication, issn_range, issn_used,
};

const SEQUENCE_DIGITS: usize = 3;

#[derive(Clone)]
pub struct IssnLedger {
    pool: SqlitePool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transition {
    Activate,
    Deactivate,
    Open,
    Close,
}

impl IssnLedger {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // ========== Ranges ==========

    pub async fn create(&self, data: IssnRangeCreate, user: &CurrentUser) -> AppResult<IssnRange> {
        let (begin, end) = validate(&data)?;
        let mut scope = TxScope::begin(&self.pool, None).await?;
        let result = async {
            let conn = scope.conn();
            let existing = issn_range::find_by_block(conn, &data.block).await?;
            let validator = RangeOverlapValidator::new(SEQUENCE_DIGITS);
            let candidate = (sequence_part(&data.range_begin), sequence_part(&data.range_end));
            if let Some(other) = validator.first_overlap(
                candidate,
                existing.iter().map(|r| {
                    (r.id, sequence_part(&r.range_begin), sequence_part(&r.range_end))
                }),
            ) {
                return Err(AppError::with_message(
                    ErrorCode::RangeOverlap,
                    format!(
                        "ISSN range {}-{}..{} overlaps range {other}",
                        data.block, data.range_begin, data.range_end
                    ),
                )
                .with_detail("range_id", other));
            }
            let free = (end - begin + 1) as i64;
            let created = issn_range::create(conn, &data, free, user.audit_name()).await?;
            tracing::info!(
                issn_range_id = created.id,
                block = %created.block,
                begin = %created.range_begin,
                end = %created.range_end,
                "ISSN range created"
            );
            Ok::<_, AppError>(created)
        }
        .await;
        scope.finish(result).await
    }

    pub async fn read(&self, id: i64) -> AppResult<IssnRange> {
        let mut conn = self.pool.acquire().await.map_err(RepoError::from)?;
        load(&mut conn, id).await
    }

    pub async fn read_all(&self) -> AppResult<Vec<IssnRange>> {
        let mut conn = self.pool.acquire().await.map_err(RepoError::from)?;
        Ok(issn_range::find_all(&mut conn).await?)
    }

    pub async fn remove(&self, id: i64, user: &CurrentUser) -> AppResult<()> {
        let mut scope = TxScope::begin(&self.pool, None).await?;
        let result = remove_in(scope.conn(), id, user).await;
        scope.finish(result).await
    }

    pub async fn activate(&self, id: i64, user: &CurrentUser) -> AppResult<IssnRange> {
        self.transition(id, user, Transition::Activate).await
    }

    pub async fn deactivate(&self, id: i64, user: &CurrentUser) -> AppResult<IssnRange> {
        self.transition(id, user, Transition::Deactivate).await
    }

    pub async fn open(&self, id: i64, user: &CurrentUser) -> AppResult<IssnRange> {
        self.transition(id, user, Transition::Open).await
    }

    pub async fn close(&self, id: i64, user: &CurrentUser) -> AppResult<IssnRange> {
        self.transition(id, user, Transition::Close).await
    }

    async fn transition(&self, id: i64, user: &CurrentUser, transition: Transition) -> AppResult<IssnRange> {
        let mut scope = TxScope::begin(&self.pool, None).await?;
        let result = transition_in(scope.conn(), id, user, transition).await;
        scope.finish(result).await
    }

    // ========== Publications ==========

    /// Give the publication an ISSN
    pub async fn get_issn(&self, publication_id: i64, user: &CurrentUser) -> AppResult<IssnUsed> {
        let mut scope = TxScope::begin(&self.pool, None).await?;
        let result = get_issn_in(scope.conn(), publication_id, user).await;
        scope.finish(result).await
    }

    /// Take the publication's ISSN back
    pub async fn delete_issn(&self, publication_id: i64, user: &CurrentUser) -> AppResult<()> {
        let mut scope = TxScope::begin(&self.pool, None).await?;
        let result = delete_issn_in(scope.conn(), publication_id, user).await;
        scope.finish(result).await
    }
}

/// Block and bounds check; returns the begin/end sequence numbers
fn validate(data: &IssnRangeCreate) -> AppResult<(u64, u64)> {
    let invalid = |msg: String| AppError::with_message(ErrorCode::RangeInvalidBounds, msg);

    if data.block.len() != 4 || !data.block.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid(format!("ISSN block {:?} must be 4 digits", data.block)));
    }
    let mut bounds = [0u64; 2];
    for (slot, bound) in bounds.iter_mut().zip([&data.range_begin, &data.range_end]) {
        let well_formed = bound.len() == SEQUENCE_DIGITS + 1
            && bound
                .get(..SEQUENCE_DIGITS)
                .is_some_and(|d| d.bytes().all(|b| b.is_ascii_digit()));
        if !well_formed {
            return Err(invalid(format!(
                "ISSN bound {bound:?} must be 3 digits and a check character"
            )));
        }
        let n = parse_digits(sequence_part(bound))?;
        if sequence_with_check(&data.block, n)? != *bound {
            return Err(invalid(format!(
                "ISSN bound {bound:?} has a wrong check character for block {}",
                data.block
            )));
        }
        *slot = n;
    }
    let [begin, end] = bounds;
    if begin > end {
        return Err(invalid(format!(
            "ISSN range begin {} is after range end {}",
            data.range_begin, data.range_end
        )));
    }
    Ok((begin, end))
}

/// Sequence number `n` of `block` with its check character, e.g. "0014"
pub(crate) fn sequence_with_check(block: &str, n: u64) -> AppResult<String> {
    let digits = format_digits(n, SEQUENCE_DIGITS);
    let check = issn_check_digit(&format!("{block}{digits}"))?;
    Ok(format!("{digits}{check}"))
}

fn sequence_part(value: &str) -> &str {
    value.get(..SEQUENCE_DIGITS).unwrap_or(value)
}

async fn load(conn: &mut SqliteConnection, id: i64) -> AppResult<IssnRange> {
    issn_range::find_by_id(conn, id).await?.ok_or_else(|| {
        AppError::with_message(
            ErrorCode::IssnRangeNotFound,
            format!("ISSN range {id} not found"),
        )
    })
}

fn transition_error(id: i64, err: TransitionError) -> AppError {
    match err {
        TransitionError::Closed => AppError::with_message(
            ErrorCode::IssnRangeStateConflict,
            format!("ISSN range {id} is closed"),
        ),
        TransitionError::NoCapacity => AppError::with_message(
            ErrorCode::RangeExhausted,
            format!("ISSN range {id} has no free or cancelled ISSNs"),
        ),
    }
}

async fn transition_in(
    conn: &mut SqliteConnection,
    id: i64,
    user: &CurrentUser,
    transition: Transition,
) -> AppResult<IssnRange> {
    let mut current = load(conn, id).await?;
    let changed = match transition {
        Transition::Activate => state::activate(&mut current),
        Transition::Deactivate => state::deactivate(&mut current),
        Transition::Open => state::open(&mut current),
        Transition::Close => Ok(state::close(&mut current)),
    }
    .map_err(|e| transition_error(id, e))?;

    if transition == Transition::Activate {
        issn_range::deactivate_others(conn, id, user.audit_name()).await?;
    }
    if changed {
        issn_range::save(conn, &current, user.audit_name()).await?;
        tracing::info!(issn_range_id = id, transition = ?transition, "ISSN range state changed");
    }
    Ok(current)
}

async fn remove_in(conn: &mut SqliteConnection, id: i64, user: &CurrentUser) -> AppResult<()> {
    let current = load(conn, id).await?;
    let used = issn_used::count_by_range(conn, id).await?;
    if current.taken > 0 || used > 0 {
        return Err(AppError::with_message(
            ErrorCode::IssnRangeInUse,
            format!("ISSN range {id} has {used} ISSNs in use"),
        ));
    }
    let purged = issn_canceled::delete_by_range(conn, id).await?;
    issn_range::delete(conn, id).await?;
    tracing::info!(issn_range_id = id, purged, user = user.audit_name(), "ISSN range removed");
    Ok(())
}

async fn get_issn_in(
    conn: &mut SqliteConnection,
    publication_id: i64,
    user: &CurrentUser,
) -> AppResult<IssnUsed> {
    let target = issn_publication::find_by_id(conn, publication_id)
        .await?
        .ok_or_else(|| {
            AppError::with_message(
                ErrorCode::PublicationNotFound,
                format!("Publication {publication_id} not found"),
            )
        })?;
    if !target.issn.is_empty() || issn_used::find_by_publication(conn, publication_id).await?.is_some() {
        return Err(AppError::with_message(
            ErrorCode::IssnAlreadyAssigned,
            format!("Publication {publication_id} already has ISSN {}", target.issn),
        ));
    }
    let mut form = load_form(conn, target.form_id).await?;

    let (issn, range_id) = match issn_canceled::find_first(conn).await? {
        Some(pooled) => {
            let mut owner = load(conn, pooled.issn_range_id).await?;
            let had_capacity = owner.has_capacity();
            owner.canceled -= 1;
            owner.taken += 1;
            settle(conn, &mut owner, had_capacity, user).await?;
            issn_canceled::delete(conn, pooled.id).await?;
            (pooled.issn, owner.id)
        }
        None => {
            let mut active = issn_range::find_active(conn).await?.ok_or_else(|| {
                AppError::with_message(ErrorCode::NoActiveIssnRange, "No active ISSN range")
            })?;
            if active.free <= 0 || active.next.is_empty() {
                return Err(AppError::with_message(
                    ErrorCode::NoActiveIssnRange,
                    format!("ISSN range {} has no free ISSNs", active.id),
                ));
            }
            let issued = format!("{}-{}", active.block, active.next);
            let had_capacity = active.has_capacity();
            let current = parse_digits(sequence_part(&active.next))?;
            let end = parse_digits(sequence_part(&active.range_end))?;
            active.free -= 1;
            active.taken += 1;
            if current >= end {
                active.next.clear();
                state::close(&mut active);
            } else {
                active.next = sequence_with_check(&active.block, current + 1)?;
            }
            settle(conn, &mut active, had_capacity, user).await?;
            (issued, active.id)
        }
    };

    issn_used::create(conn, &issn, range_id, publication_id, user.audit_name()).await?;
    issn_publication::set_issn(conn, publication_id, &issn).await?;

    form.publication_count_issn += 1;
    if form.status == IssnFormStatus::NotHandled
        && form.publication_count_issn >= form.publication_count
    {
        form.status = IssnFormStatus::NotNotified;
    }
    issn_form::save(conn, &form).await?;

    tracing::info!(publication_id, issn = %issn, issn_range_id = range_id, "ISSN assigned");
    issn_used::find_by_publication(conn, publication_id)
        .await?
        .ok_or_else(|| AppError::internal(format!("ISSN {issn} was not recorded")))
}

async fn delete_issn_in(
    conn: &mut SqliteConnection,
    publication_id: i64,
    user: &CurrentUser,
) -> AppResult<()> {
    let target = issn_publication::find_by_id(conn, publication_id)
        .await?
        .ok_or_else(|| {
            AppError::with_message(
                ErrorCode::PublicationNotFound,
                format!("Publication {publication_id} not found"),
            )
        })?;
    let Some(used) = issn_used::find_by_publication(conn, publication_id).await? else {
        if target.issn.is_empty() {
            return Err(AppError::with_message(
                ErrorCode::PublicationHasNoIssn,
                format!("Publication {publication_id} has no ISSN"),
            ));
        }
        return Err(AppError::with_message(
            ErrorCode::IssnNotFound,
            format!("ISSN {} of publication {publication_id} not found", target.issn),
        ));
    };
    let mut form = load_form(conn, target.form_id).await?;
    let mut owner = load(conn, used.issn_range_id).await?;

    let tail = used
        .issn
        .rsplit('-')
        .next()
        .filter(|t| t.len() == SEQUENCE_DIGITS + 1)
        .ok_or_else(|| AppError::invalid_format(format!("Malformed ISSN {}", used.issn)))?;
    let issued = parse_digits(sequence_part(tail))?;
    let latest = latest_issued(&owner)?;

    let had_capacity = owner.has_capacity();
    let rolled_back = latest == Some(issued);
    if rolled_back {
        owner.next = tail.to_string();
        owner.free += 1;
        owner.taken -= 1;
    } else {
        issn_canceled::create(conn, &used.issn, owner.id, user.audit_name()).await?;
        owner.taken -= 1;
        owner.canceled += 1;
    }
    settle(conn, &mut owner, had_capacity, user).await?;

    issn_used::delete(conn, used.id).await?;
    issn_publication::set_issn(conn, publication_id, "").await?;
    form.publication_count_issn -= 1;
    if form.status == IssnFormStatus::NotNotified
        && form.publication_count_issn < form.publication_count
    {
        form.status = IssnFormStatus::NotHandled;
    }
    issn_form::save(conn, &form).await?;

    tracing::info!(
        publication_id,
        issn = %used.issn,
        issn_range_id = owner.id,
        rolled_back,
        "ISSN withdrawn"
    );
    Ok(())
}

/// Sequence number most recently minted from the range
fn latest_issued(range: &IssnRange) -> AppResult<Option<u64>> {
    if range.next.is_empty() {
        return parse_digits(sequence_part(&range.range_end)).map(Some);
    }
    let next = parse_digits(sequence_part(&range.next))?;
    let begin = parse_digits(sequence_part(&range.range_begin))?;
    Ok((next > begin).then(|| next - 1))
}

async fn load_form(conn: &mut SqliteConnection, id: i64) -> AppResult<IssnForm> {
    issn_form::find_by_id(conn, id).await?.ok_or_else(|| {
        AppError::with_message(ErrorCode::IssnFormNotFound, format!("ISSN form {id} not found"))
    })
}

/// Exhaustion / refill rules; a refilled range is re-activated when no other
/// ISSN range is active
async fn settle(
    conn: &mut SqliteConnection,
    current: &mut IssnRange,
    had_capacity: bool,
    user: &CurrentUser,
) -> AppResult<()> {
    if state::close_if_exhausted(current) {
        tracing::info!(issn_range_id = current.id, "ISSN range exhausted, closed");
    } else if state::reopen_if_refilled(current, had_capacity) {
        if issn_range::count_active_except(conn, current.id).await? == 0
            && let Err(e) = state::activate(current)
        {
            tracing::warn!(
                issn_range_id = current.id,
                error = ?e,
                "Re-opened ISSN range could not be activated"
            );
        }
        tracing::info!(
            issn_range_id = current.id,
            is_active = current.is_active,
            "ISSN range re-opened"
        );
    }
    issn_range::save(conn, current, user.audit_name()).await?;
    Ok(())
}

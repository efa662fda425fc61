//! Identifier batch allocation
//!
//! A batch takes identifiers from the reuse pool first and mints the rest
//! from the publisher's active sub-range. When a publication needs more than
//! a single-digit sub-range has left, the remainder of that sub-range is
//! cancelled into the pool and an alternate sub-range of the same category
//! takes over.

use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::{
    BatchRequest, CanceledIdentifier, IdentifierBatchDetail, IdentifierMap, IdentifierType,
    Publication, PublicationFormat, SubRange,
};
use sqlx::{SqliteConnection, SqlitePool};

use super::checksum::{isbn_check_digit, validate_isbn13};
use super::retirement::{self, RetirementKind};
use super::{corrupt_column, digit_count, shift_digits};
use crate::auth::CurrentUser;
use crate::db::repository::{
    RepoError, canceled_identifier, identifier, identifier_batch, publication, sub_range,
};
use crate::db::{TxScope, TypeProfile};

/// Upper bound on identifiers per request
pub const MAX_BATCH_SIZE: i64 = 10_000;

/// Which cancelled identifiers may be reused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PoolScope {
    /// Only the active sub-range's own pool
    Own,
    /// Every sub-range of the publisher with the same category
    Category,
}

#[derive(Debug)]
struct AllocationState {
    remaining: i64,
    active: SubRange,
    scope: PoolScope,
}

#[derive(Clone)]
pub struct IdentifierAllocator {
    pool: SqlitePool,
    profile: &'static TypeProfile,
}

impl IdentifierAllocator {
    pub fn new(pool: SqlitePool, identifier_type: IdentifierType) -> Self {
        Self {
            pool,
            profile: TypeProfile::of(identifier_type),
        }
    }

    /// Allocate one batch for the publisher
    pub async fn allocate(
        &self,
        publisher_id: i64,
        request: BatchRequest,
        user: &CurrentUser,
        tx: Option<&mut SqliteConnection>,
    ) -> AppResult<IdentifierBatchDetail> {
        if let BatchRequest::Count(n) = request {
            check_ceiling(n)?;
        }
        let mut scope = TxScope::begin(&self.pool, tx).await?;
        let result = self.allocate_in(scope.conn(), publisher_id, request, user).await;
        scope.finish(result).await
    }

    async fn allocate_in(
        &self,
        conn: &mut SqliteConnection,
        publisher_id: i64,
        request: BatchRequest,
        user: &CurrentUser,
    ) -> AppResult<IdentifierBatchDetail> {
        let identifier_type = self.profile.identifier_type;
        let active = sub_range::find_active_by_publisher(conn, self.profile, publisher_id)
            .await?
            .ok_or_else(|| {
                AppError::with_message(
                    ErrorCode::NoActiveSubRange,
                    format!("Publisher {publisher_id} has no active {identifier_type} sub-range"),
                )
            })?;

        let (requested, target) = match request {
            BatchRequest::Count(n) => (n, None),
            BatchRequest::Publication(publication_id) => {
                let target = self.check_publication(conn, publication_id, publisher_id).await?;
                let n = (target.print_types.len() + target.file_formats.len()) as i64;
                check_ceiling(n)?;
                (n, Some(target))
            }
        };

        let mut state = AllocationState {
            remaining: requested,
            active,
            scope: PoolScope::Own,
        };
        let (reuse, fresh) = loop {
            let pooled = self.pool_size(conn, &state).await?;
            let reuse = pooled.min(state.remaining);
            let fresh = state.remaining - reuse;
            if fresh <= state.active.free {
                break (reuse, fresh);
            }
            if target.is_some() && state.active.category == 1 && state.scope == PoolScope::Own {
                state = self.overflow(conn, state, user).await?;
                continue;
            }
            return Err(AppError::with_message(
                ErrorCode::InsufficientIdentifiers,
                format!(
                    "Sub-range {} cannot supply {requested} identifiers",
                    state.active.publisher_identifier
                ),
            )
            .with_detail("requested", requested)
            .with_detail("free", state.active.free)
            .with_detail("canceled", pooled));
        };

        let batch = identifier_batch::create(
            conn,
            &identifier_batch::NewBatch {
                identifier_type,
                publisher_id,
                publication_id: target.as_ref().map_or(0, |p| p.id),
                sub_range_id: state.active.id,
                identifier_count: fresh,
                identifier_canceled_used_count: reuse,
            },
            user.audit_name(),
        )
        .await?;

        let mut issued = Vec::with_capacity(requested as usize);
        if reuse > 0 {
            let candidates = self.pooled(conn, &state, reuse).await?;
            for candidate in candidates {
                let id = self.reuse_one(conn, candidate, batch.id, user).await?;
                issued.push(id);
            }
        }
        if fresh > 0 {
            let mut active = super::sub_range::load(conn, self.profile, state.active.id).await?;
            let minted = mint(conn, self.profile, &mut active, batch.id, fresh, user).await?;
            issued.extend(minted);
        }

        let written = identifier::count_by_batch(conn, batch.id).await?;
        if written != requested {
            return Err(AppError::internal(format!(
                "Batch {} holds {written} identifiers, expected {requested}",
                batch.id
            )));
        }

        if let Some(target) = &target {
            assign_to_publication(conn, target, &issued).await?;
        }

        tracing::info!(
            identifier_type = %identifier_type,
            publisher_id,
            batch_id = batch.id,
            sub_range_id = batch.sub_range_id,
            minted = fresh,
            reused = reuse,
            publication_id = batch.publication_id,
            "Identifier batch allocated"
        );

        let identifiers = identifier::find_by_batch(conn, batch.id).await?;
        Ok(IdentifierBatchDetail { batch, identifiers })
    }

    async fn pool_size(&self, conn: &mut SqliteConnection, state: &AllocationState) -> AppResult<i64> {
        let identifier_type = self.profile.identifier_type;
        let count = match state.scope {
            PoolScope::Own => {
                canceled_identifier::count_by_sub_range(conn, identifier_type, state.active.id).await?
            }
            PoolScope::Category => {
                canceled_identifier::count_by_publisher_category(
                    conn,
                    identifier_type,
                    state.active.publisher_id,
                    state.active.category,
                )
                .await?
            }
        };
        Ok(count)
    }

    async fn pooled(
        &self,
        conn: &mut SqliteConnection,
        state: &AllocationState,
        limit: i64,
    ) -> AppResult<Vec<CanceledIdentifier>> {
        let identifier_type = self.profile.identifier_type;
        let rows = match state.scope {
            PoolScope::Own => {
                canceled_identifier::find_by_sub_range(conn, identifier_type, state.active.id, limit)
                    .await?
            }
            PoolScope::Category => {
                canceled_identifier::find_by_publisher_category(
                    conn,
                    identifier_type,
                    state.active.publisher_id,
                    state.active.category,
                    limit,
                )
                .await?
            }
        };
        Ok(rows)
    }

    /// Move one pooled identifier back into circulation
    async fn reuse_one(
        &self,
        conn: &mut SqliteConnection,
        candidate: CanceledIdentifier,
        batch_id: i64,
        user: &CurrentUser,
    ) -> AppResult<String> {
        canceled_identifier::delete(conn, candidate.id).await?;
        let mut owner = super::sub_range::load(conn, self.profile, candidate.sub_range_id).await?;
        let had_capacity = owner.has_capacity();
        owner.canceled -= 1;
        owner.taken += 1;
        super::sub_range::settle(conn, self.profile, &mut owner, had_capacity, user).await?;

        identifier::insert(
            conn,
            &identifier::NewIdentifier {
                identifier: &candidate.identifier,
                identifier_type: self.profile.identifier_type,
                sub_range_id: owner.id,
                identifier_batch_id: batch_id,
                publication_type: "",
            },
            user.audit_name(),
        )
        .await?;
        Ok(candidate.identifier)
    }

    /// Cancel what is left of the active sub-range and switch to an open
    /// alternate of the same category
    async fn overflow(
        &self,
        conn: &mut SqliteConnection,
        state: AllocationState,
        user: &CurrentUser,
    ) -> AppResult<AllocationState> {
        let current = state.active;
        let alternate = sub_range::find_open_alternate(
            conn,
            self.profile,
            current.publisher_id,
            current.category,
            current.id,
        )
        .await?
        .ok_or_else(|| {
            AppError::with_message(
                ErrorCode::InsufficientIdentifiers,
                format!(
                    "Sub-range {} is short of identifiers and the publisher has no alternate sub-range",
                    current.publisher_identifier
                ),
            )
            .with_detail("requested", state.remaining)
            .with_detail("free", current.free)
        })?;

        let drained = current.free;
        if drained > 0 {
            let drain = identifier_batch::create(
                conn,
                &identifier_batch::NewBatch {
                    identifier_type: self.profile.identifier_type,
                    publisher_id: current.publisher_id,
                    publication_id: 0,
                    sub_range_id: current.id,
                    identifier_count: drained,
                    identifier_canceled_used_count: 0,
                },
                user.audit_name(),
            )
            .await?;
            let mut exhausted = super::sub_range::load(conn, self.profile, current.id).await?;
            let minted = mint(conn, self.profile, &mut exhausted, drain.id, drained, user).await?;
            for value in &minted {
                retirement::retire_in(conn, value, RetirementKind::Cancel, user).await?;
            }
        }

        let mut next = super::sub_range::load(conn, self.profile, alternate.id).await?;
        super::sub_range::activate_in(conn, self.profile, &mut next, user).await?;
        tracing::info!(
            from = %current.publisher_identifier,
            to = %next.publisher_identifier,
            drained,
            "Allocation overflowed to alternate sub-range"
        );

        Ok(AllocationState {
            remaining: state.remaining,
            active: next,
            scope: PoolScope::Category,
        })
    }

    async fn check_publication(
        &self,
        conn: &mut SqliteConnection,
        publication_id: i64,
        publisher_id: i64,
    ) -> AppResult<Publication> {
        let target = publication::find_by_id(conn, publication_id)
            .await?
            .ok_or_else(|| {
                AppError::with_message(
                    ErrorCode::PublicationNotFound,
                    format!("Publication {publication_id} not found"),
                )
            })?;

        if target.publisher_id != Some(publisher_id) {
            return Err(AppError::invalid_request(format!(
                "Publication {publication_id} does not belong to publisher {publisher_id}"
            )));
        }
        if target.has_identifiers()
            || identifier_batch::exists_for_publication(conn, publication_id).await?
        {
            return Err(AppError::with_message(
                ErrorCode::PublicationAlreadyIdentified,
                format!("Publication {publication_id} already has identifiers"),
            ));
        }
        if !target.is_public {
            return Err(AppError::with_message(
                ErrorCode::PublicationNotPublic,
                format!("Publication {publication_id} is not public"),
            ));
        }
        let wanted = target.publication_type.identifier_type();
        if wanted != self.profile.identifier_type {
            return Err(AppError::with_message(
                ErrorCode::UnsupportedIdentifierType,
                format!(
                    "Publication {publication_id} takes {wanted}, not {}",
                    self.profile.identifier_type
                ),
            ));
        }

        let has_print = !target.print_types.is_empty();
        let has_electronical = !target.file_formats.is_empty();
        let consistent = match target.publication_format {
            PublicationFormat::Print => has_print && !has_electronical,
            PublicationFormat::Electronical => !has_print && has_electronical,
            PublicationFormat::PrintElectronical => has_print && has_electronical,
        };
        if !consistent {
            return Err(AppError::with_message(
                ErrorCode::PublicationUnsupportedFormat,
                format!(
                    "Publication {publication_id} format {:?} does not match its print types and file formats",
                    target.publication_format
                ),
            ));
        }
        Ok(target)
    }
}

fn check_ceiling(n: i64) -> AppResult<()> {
    if !(1..=MAX_BATCH_SIZE).contains(&n) {
        return Err(AppError::with_message(
            ErrorCode::BatchTooLarge,
            format!("Batch size {n} outside 1..={MAX_BATCH_SIZE}"),
        )
        .with_detail("max", MAX_BATCH_SIZE));
    }
    Ok(())
}

/// Hyphenated ISBN/ISMN with its check digit
pub(crate) fn format_identifier(publisher_identifier: &str, item: &str) -> AppResult<String> {
    let body: String = publisher_identifier
        .chars()
        .chain(item.chars())
        .filter(char::is_ascii_digit)
        .collect();
    let check = isbn_check_digit(&body)?;
    let formatted = format!("{publisher_identifier}-{item}-{check}");
    if !validate_isbn13(&formatted) {
        return Err(AppError::with_message(
            ErrorCode::ChecksumInvalid,
            format!("Generated identifier {formatted} failed validation"),
        ));
    }
    Ok(formatted)
}

/// Issue `count` sequential identifiers from `active` into the batch
async fn mint(
    conn: &mut SqliteConnection,
    profile: &TypeProfile,
    active: &mut SubRange,
    batch_id: i64,
    count: i64,
    user: &CurrentUser,
) -> AppResult<Vec<String>> {
    if count > active.free {
        return Err(AppError::internal(format!(
            "Sub-range {} has {} free, cannot mint {count}",
            active.id, active.free
        )));
    }
    let had_capacity = active.has_capacity();
    let width = active.range_begin.len();
    debug_assert_eq!(
        digit_count(&active.publisher_identifier) + width,
        super::range::BODY_DIGITS
    );

    let mut minted = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let value = format_identifier(&active.publisher_identifier, &active.next)?;
        identifier::insert(
            conn,
            &identifier::NewIdentifier {
                identifier: &value,
                identifier_type: profile.identifier_type,
                sub_range_id: active.id,
                identifier_batch_id: batch_id,
                publication_type: "",
            },
            user.audit_name(),
        )
        .await?;
        minted.push(value);
        active.next = shift_digits(&active.next, 1, width)?;
        active.free -= 1;
        active.taken += 1;
    }
    super::sub_range::settle(conn, profile, active, had_capacity, user).await?;
    Ok(minted)
}

/// Print types take the first identifiers, file formats the rest
async fn assign_to_publication(
    conn: &mut SqliteConnection,
    target: &Publication,
    issued: &[String],
) -> AppResult<()> {
    let mut print = IdentifierMap::new();
    let mut electronical = IdentifierMap::new();
    let labels = target.print_types.iter().chain(target.file_formats.iter());
    for (index, (value, label)) in issued.iter().zip(labels).enumerate() {
        if index < target.print_types.len() {
            print.insert(value.as_str(), label.as_str());
        } else {
            electronical.insert(value.as_str(), label.as_str());
        }
        let row = identifier::find_by_identifier(conn, value)
            .await?
            .ok_or_else(|| RepoError::NotFound(format!("Identifier {value} not found")))?;
        identifier::set_publication_type(conn, row.id, label).await?;
    }

    publication::set_identifiers(
        conn,
        target.id,
        Some(target.publication_type.identifier_type()),
        &print.to_column().map_err(corrupt_column)?,
        &electronical.to_column().map_err(corrupt_column)?,
        false,
    )
    .await?;
    Ok(())
}

//! Identifier batch ledger

use sha2::{Digest, Sha256};
use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::{
    BatchDownload, BatchQuery, Identifier, IdentifierBatch, IdentifierBatchDetail,
};
use sqlx::{SqliteConnection, SqlitePool};

use super::{format_digits, item_part, parse_digits};
use crate::auth::CurrentUser;
use crate::db::repository::{
    RepoError, batch_download, canceled_identifier, identifier, identifier_batch, message,
    publication,
};
use crate::db::{TxScope, TypeProfile};

#[derive(Clone)]
pub struct BatchLedger {
    pool: SqlitePool,
}

impl BatchLedger {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn read(&self, id: i64) -> AppResult<IdentifierBatchDetail> {
        let mut conn = self.pool.acquire().await.map_err(RepoError::from)?;
        let batch = load(&mut conn, id).await?;
        let identifiers = identifier::find_by_batch(&mut conn, id).await?;
        Ok(IdentifierBatchDetail { batch, identifiers })
    }

    pub async fn query(&self, filter: &BatchQuery) -> AppResult<Vec<IdentifierBatch>> {
        let mut conn = self.pool.acquire().await.map_err(RepoError::from)?;
        Ok(identifier_batch::query(&mut conn, filter).await?)
    }

    /// Plain-text listing of the batch, one identifier per line. Every
    /// download is recorded with the content hash.
    pub async fn download(&self, id: i64, user: &CurrentUser) -> AppResult<BatchDownload> {
        let mut scope = TxScope::begin(&self.pool, None).await?;
        let result = async {
            let conn = scope.conn();
            load(conn, id).await?;
            let identifiers = identifier::find_by_batch(conn, id).await?;
            let content: String = identifiers
                .iter()
                .map(|i| format!("{}\n", i.identifier))
                .collect();
            let content_hash = hex::encode(Sha256::digest(content.as_bytes()));
            let identifier_count = identifiers.len() as i64;
            batch_download::create(conn, id, identifier_count, &content_hash, user.audit_name())
                .await?;
            tracing::info!(batch_id = id, identifier_count, user = user.audit_name(), "Batch downloaded");
            Ok::<_, AppError>(BatchDownload {
                batch_id: id,
                content,
                content_hash,
                identifier_count,
            })
        }
        .await;
        scope.finish(result).await
    }

    /// Undo the latest batch of its sub-range
    ///
    /// Minted identifiers go back to the sub-range's free space; reused ones
    /// return to the cancelled pool of the sub-range that owns them.
    pub async fn safe_remove(
        &self,
        id: i64,
        user: &CurrentUser,
        tx: Option<&mut SqliteConnection>,
    ) -> AppResult<()> {
        let mut scope = TxScope::begin(&self.pool, tx).await?;
        let result = safe_remove_in(scope.conn(), id, user).await;
        scope.finish(result).await
    }
}

async fn load(conn: &mut SqliteConnection, id: i64) -> AppResult<IdentifierBatch> {
    identifier_batch::find_by_id(conn, id).await?.ok_or_else(|| {
        AppError::with_message(
            ErrorCode::BatchNotFound,
            format!("Identifier batch {id} not found"),
        )
    })
}

async fn safe_remove_in(conn: &mut SqliteConnection, id: i64, user: &CurrentUser) -> AppResult<()> {
    let batch = load(conn, id).await?;
    if batch.identifier_canceled_count > 0 || batch.identifier_deleted_count > 0 {
        return Err(AppError::with_message(
            ErrorCode::BatchHasRetiredIdentifiers,
            format!(
                "Batch {id} has {} cancelled and {} removed identifiers",
                batch.identifier_canceled_count, batch.identifier_deleted_count
            ),
        ));
    }
    if message::count_by_batch(conn, id).await? > 0 {
        return Err(AppError::with_message(
            ErrorCode::BatchMessageSent,
            format!("A message was sent for batch {id}"),
        ));
    }

    let rows = identifier::find_by_batch(conn, id).await?;
    let expected = batch.identifier_count + batch.identifier_canceled_used_count;
    if rows.len() as i64 != expected {
        return Err(count_mismatch(id, rows.len() as i64, expected));
    }

    let profile = TypeProfile::of(batch.identifier_type);
    let mut primary = super::sub_range::load(conn, profile, batch.sub_range_id).await?;
    let width = primary.range_begin.len();

    let (minted, reused): (Vec<&Identifier>, Vec<&Identifier>) = if batch.identifier_count > 0 {
        let next = parse_digits(&primary.next)?;
        let pre_next = next
            .checked_sub(batch.identifier_count as u64)
            .filter(|n| *n >= parse_digits(&primary.range_begin).unwrap_or(0))
            .ok_or_else(|| not_last(id))?;

        let mut minted = Vec::new();
        let mut reused = Vec::new();
        let last = next - 1;
        let (mut starts_here, mut ends_here) = (false, false);
        for row in &rows {
            let item = match item_part(&row.identifier) {
                Some(item) if row.sub_range_id == primary.id => parse_digits(item)?,
                _ => {
                    reused.push(row);
                    continue;
                }
            };
            if item >= pre_next {
                starts_here |= item == pre_next;
                ends_here |= item == last;
                minted.push(row);
            } else {
                reused.push(row);
            }
        }
        if !(starts_here && ends_here) {
            return Err(not_last(id));
        }
        if minted.len() as i64 != batch.identifier_count {
            return Err(count_mismatch(id, minted.len() as i64, batch.identifier_count));
        }

        let had_capacity = primary.has_capacity();
        primary.next = format_digits(pre_next, width);
        primary.free += batch.identifier_count;
        primary.taken -= batch.identifier_count;
        super::sub_range::settle(conn, profile, &mut primary, had_capacity, user).await?;
        (minted, reused)
    } else {
        (Vec::new(), rows.iter().collect())
    };

    for row in &reused {
        let mut owner = super::sub_range::load(conn, profile, row.sub_range_id).await?;
        let had_capacity = owner.has_capacity();
        canceled_identifier::create(
            conn,
            &canceled_identifier::NewCanceledIdentifier {
                identifier: &row.identifier,
                identifier_type: row.identifier_type,
                category: owner.category,
                publisher_id: owner.publisher_id,
                sub_range_id: owner.id,
            },
            user.audit_name(),
        )
        .await?;
        owner.taken -= 1;
        owner.canceled += 1;
        super::sub_range::settle(conn, profile, &mut owner, had_capacity, user).await?;
    }

    identifier::delete_by_batch(conn, id).await?;
    identifier_batch::delete(conn, id).await?;
    if !batch.is_list() {
        publication::reset_identifiers(conn, batch.publication_id).await?;
    }

    tracing::info!(
        batch_id = id,
        sub_range_id = primary.id,
        rolled_back = minted.len(),
        recancelled = reused.len(),
        "Identifier batch removed"
    );
    Ok(())
}

fn not_last(id: i64) -> AppError {
    AppError::with_message(
        ErrorCode::BatchNotLast,
        format!("Batch {id} is not the latest batch of its sub-range"),
    )
}

fn count_mismatch(id: i64, actual: i64, expected: i64) -> AppError {
    AppError::with_message(
        ErrorCode::BatchCountMismatch,
        format!("Batch {id} has {actual} identifiers, counters say {expected}"),
    )
    .with_detail("actual", actual)
    .with_detail("expected", expected)
}

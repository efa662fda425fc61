//! Identifier retirement
//!
//! Cancelling returns an identifier to its sub-range's reuse pool; removal
//! retires it permanently. Either way the identifier leaves its batch and,
//! for publication batches, the publication's identifier maps.

use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::{Identifier, IdentifierBatch, IdentifierMap};
use sqlx::{SqliteConnection, SqlitePool};

use super::corrupt_column;
use crate::auth::CurrentUser;
use crate::db::repository::{
    canceled_identifier, identifier, identifier_batch, message, publication,
};
use crate::db::{TxScope, TypeProfile};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetirementKind {
    /// Back into the reuse pool
    Cancel,
    /// Never issued again
    Remove,
}

#[derive(Clone)]
pub struct IdentifierRetirement {
    pool: SqlitePool,
}

impl IdentifierRetirement {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn cancel(
        &self,
        identifier: &str,
        user: &CurrentUser,
        tx: Option<&mut SqliteConnection>,
    ) -> AppResult<()> {
        let mut scope = TxScope::begin(&self.pool, tx).await?;
        let result = retire_in(scope.conn(), identifier, RetirementKind::Cancel, user).await;
        scope.finish(result).await
    }

    pub async fn remove(
        &self,
        identifier: &str,
        user: &CurrentUser,
        tx: Option<&mut SqliteConnection>,
    ) -> AppResult<()> {
        let mut scope = TxScope::begin(&self.pool, tx).await?;
        let result = retire_in(scope.conn(), identifier, RetirementKind::Remove, user).await;
        scope.finish(result).await
    }
}

pub(crate) async fn retire_in(
    conn: &mut SqliteConnection,
    value: &str,
    kind: RetirementKind,
    user: &CurrentUser,
) -> AppResult<()> {
    let issued = match identifier::find_by_identifier(conn, value).await? {
        Some(row) => row,
        None => {
            if canceled_identifier::find_by_identifier(conn, value).await?.is_some() {
                return Err(AppError::with_message(
                    ErrorCode::IdentifierAlreadyCanceled,
                    format!("Identifier {value} is already cancelled"),
                ));
            }
            return Err(AppError::with_message(
                ErrorCode::IdentifierNotFound,
                format!("Identifier {value} not found"),
            ));
        }
    };
    let profile = TypeProfile::of(issued.identifier_type);

    let mut batch = identifier_batch::find_by_id(conn, issued.identifier_batch_id)
        .await?
        .ok_or_else(|| {
            AppError::with_message(
                ErrorCode::BatchNotFound,
                format!("Identifier batch {} not found", issued.identifier_batch_id),
            )
        })?;
    let mut owner = super::sub_range::load(conn, profile, issued.sub_range_id).await?;

    if kind == RetirementKind::Cancel && message::count_by_batch(conn, batch.id).await? > 0 {
        return Err(AppError::with_message(
            ErrorCode::BatchMessageSent,
            format!(
                "A message was sent for batch {}, identifier {value} cannot be cancelled",
                batch.id
            ),
        ));
    }

    if batch.outstanding() <= 1 {
        destroy_batch(conn, &batch).await?;
    } else {
        match kind {
            RetirementKind::Cancel => batch.identifier_canceled_count += 1,
            RetirementKind::Remove => batch.identifier_deleted_count += 1,
        }
        identifier_batch::save_counts(conn, &batch).await?;
        if !batch.is_list() {
            detach_from_publication(conn, batch.publication_id, &issued).await?;
        }
    }
    identifier::delete(conn, issued.id).await?;

    let had_capacity = owner.has_capacity();
    owner.taken -= 1;
    match kind {
        RetirementKind::Remove => owner.deleted += 1,
        RetirementKind::Cancel => {
            canceled_identifier::create(
                conn,
                &canceled_identifier::NewCanceledIdentifier {
                    identifier: &issued.identifier,
                    identifier_type: issued.identifier_type,
                    category: owner.category,
                    publisher_id: owner.publisher_id,
                    sub_range_id: owner.id,
                },
                user.audit_name(),
            )
            .await?;
            owner.canceled += 1;
        }
    }
    super::sub_range::settle(conn, profile, &mut owner, had_capacity, user).await?;

    tracing::info!(
        identifier = %issued.identifier,
        kind = ?kind,
        batch_id = batch.id,
        sub_range_id = owner.id,
        "Identifier retired"
    );
    Ok(())
}

/// Drop a batch whose last identifier is leaving
async fn destroy_batch(conn: &mut SqliteConnection, batch: &IdentifierBatch) -> AppResult<()> {
    let messages = message::clear_batch_reference(conn, batch.id).await?;
    if !batch.is_list() {
        publication::reset_identifiers(conn, batch.publication_id).await?;
    }
    identifier_batch::delete(conn, batch.id).await?;
    tracing::info!(batch_id = batch.id, messages, "Identifier batch emptied, deleted");
    Ok(())
}

async fn detach_from_publication(
    conn: &mut SqliteConnection,
    publication_id: i64,
    issued: &Identifier,
) -> AppResult<()> {
    let Some(current) = publication::find_by_id(conn, publication_id).await? else {
        tracing::warn!(publication_id, "Batch publication is missing");
        return Ok(());
    };
    let mut print = IdentifierMap::parse(&current.publication_identifier_print).map_err(corrupt_column)?;
    let mut electronical =
        IdentifierMap::parse(&current.publication_identifier_electronical).map_err(corrupt_column)?;

    let label = print
        .remove(&issued.identifier)
        .or_else(|| electronical.remove(&issued.identifier));
    tracing::info!(
        publication_id,
        identifier = %issued.identifier,
        label = label.as_deref().unwrap_or(&issued.publication_type),
        "Type label dropped from publication"
    );

    publication::set_identifiers(
        conn,
        publication_id,
        current.publication_identifier_type,
        &print.to_column().map_err(corrupt_column)?,
        &electronical.to_column().map_err(corrupt_column)?,
        current.on_process,
    )
    .await?;
    Ok(())
}

//! Identifier Batch Repository

use super::{RepoError, RepoResult};
use shared::models::{BatchQuery, IdentifierBatch, IdentifierType};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

const COLUMNS: &str = "id, identifier_type, publisher_id, publication_id, sub_range_id, identifier_count, identifier_canceled_used_count, identifier_canceled_count, identifier_deleted_count, created_at, created_by";

const DEFAULT_LIMIT: i64 = 100;

/// Insert payload for a new batch
#[derive(Debug, Clone)]
pub struct NewBatch {
    pub identifier_type: IdentifierType,
    pub publisher_id: i64,
    pub publication_id: i64,
    pub sub_range_id: i64,
    pub identifier_count: i64,
    pub identifier_canceled_used_count: i64,
}

pub async fn find_by_id(
    conn: &mut SqliteConnection,
    id: i64,
) -> RepoResult<Option<IdentifierBatch>> {
    let sql = format!("SELECT {COLUMNS} FROM identifier_batch WHERE id = ?");
    let row = sqlx::query_as::<_, IdentifierBatch>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row)
}

pub async fn exists_for_publication(
    conn: &mut SqliteConnection,
    publication_id: i64,
) -> RepoResult<bool> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM identifier_batch WHERE publication_id = ?")
            .bind(publication_id)
            .fetch_one(&mut *conn)
            .await?;
    Ok(count > 0)
}

pub async fn count_by_sub_range(
    conn: &mut SqliteConnection,
    identifier_type: IdentifierType,
    sub_range_id: i64,
) -> RepoResult<i64> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM identifier_batch WHERE identifier_type = ? AND sub_range_id = ?",
    )
    .bind(identifier_type)
    .bind(sub_range_id)
    .fetch_one(&mut *conn)
    .await?;
    Ok(count)
}

pub async fn create(
    conn: &mut SqliteConnection,
    data: &NewBatch,
    created_by: &str,
) -> RepoResult<IdentifierBatch> {
    let now = shared::util::now_millis();
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO identifier_batch (identifier_type, publisher_id, publication_id, sub_range_id, identifier_count, identifier_canceled_used_count, identifier_canceled_count, identifier_deleted_count, created_at, created_by) VALUES (?, ?, ?, ?, ?, ?, 0, 0, ?, ?) RETURNING id",
    )
    .bind(data.identifier_type)
    .bind(data.publisher_id)
    .bind(data.publication_id)
    .bind(data.sub_range_id)
    .bind(data.identifier_count)
    .bind(data.identifier_canceled_used_count)
    .bind(now)
    .bind(created_by)
    .fetch_one(&mut *conn)
    .await?;
    find_by_id(conn, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create identifier batch".into()))
}

/// Persist the retirement counters
pub async fn save_counts(conn: &mut SqliteConnection, batch: &IdentifierBatch) -> RepoResult<()> {
    let rows = sqlx::query(
        "UPDATE identifier_batch SET identifier_canceled_count = ?, identifier_deleted_count = ? WHERE id = ?",
    )
    .bind(batch.identifier_canceled_count)
    .bind(batch.identifier_deleted_count)
    .bind(batch.id)
    .execute(&mut *conn)
    .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!(
            "Identifier batch {} not found",
            batch.id
        )));
    }
    Ok(())
}

pub async fn delete(conn: &mut SqliteConnection, id: i64) -> RepoResult<bool> {
    let rows = sqlx::query("DELETE FROM identifier_batch WHERE id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(rows.rows_affected() > 0)
}

/// Filtered listing, newest first
pub async fn query(
    conn: &mut SqliteConnection,
    filter: &BatchQuery,
) -> RepoResult<Vec<IdentifierBatch>> {
    let mut qb: QueryBuilder<Sqlite> =
        QueryBuilder::new(format!("SELECT {COLUMNS} FROM identifier_batch WHERE 1 = 1"));

    if let Some(identifier_type) = filter.identifier_type {
        qb.push(" AND identifier_type = ").push_bind(identifier_type);
    }
    if let Some(publisher_id) = filter.publisher_id {
        qb.push(" AND publisher_id = ").push_bind(publisher_id);
    }
    if let Some(publication_id) = filter.publication_id {
        qb.push(" AND publication_id = ").push_bind(publication_id);
    }
    match filter.list_only {
        Some(true) => {
            qb.push(" AND publication_id = 0");
        }
        Some(false) => {
            qb.push(" AND publication_id <> 0");
        }
        None => {}
    }
    if let Some(from) = filter.created_from {
        qb.push(" AND created_at >= ").push_bind(from);
    }
    if let Some(to) = filter.created_to {
        qb.push(" AND created_at <= ").push_bind(to);
    }

    qb.push(" ORDER BY created_at DESC, id DESC LIMIT ")
        .push_bind(filter.limit.unwrap_or(DEFAULT_LIMIT).max(0))
        .push(" OFFSET ")
        .push_bind(filter.offset.unwrap_or(0).max(0));

    let rows = qb
        .build_query_as::<IdentifierBatch>()
        .fetch_all(&mut *conn)
        .await?;
    Ok(rows)
}

//! Canceled Identifier Repository
//!
//! The reuse pool. Rows are consumed oldest first.

use super::RepoResult;
use shared::models::{CanceledIdentifier, IdentifierType};
use sqlx::SqliteConnection;

const COLUMNS: &str =
    "id, identifier, identifier_type, category, publisher_id, sub_range_id, created_at, created_by";

/// Insert payload for the reuse pool
#[derive(Debug, Clone)]
pub struct NewCanceledIdentifier<'a> {
    pub identifier: &'a str,
    pub identifier_type: IdentifierType,
    pub category: i64,
    pub publisher_id: i64,
    pub sub_range_id: i64,
}

pub async fn find_by_identifier(
    conn: &mut SqliteConnection,
    identifier: &str,
) -> RepoResult<Option<CanceledIdentifier>> {
    let sql = format!("SELECT {COLUMNS} FROM canceled_identifier WHERE identifier = ?");
    let row = sqlx::query_as::<_, CanceledIdentifier>(&sql)
        .bind(identifier)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row)
}

pub async fn find_by_sub_range(
    conn: &mut SqliteConnection,
    identifier_type: IdentifierType,
    sub_range_id: i64,
    limit: i64,
) -> RepoResult<Vec<CanceledIdentifier>> {
    let sql = format!(
        "SELECT {COLUMNS} FROM canceled_identifier WHERE identifier_type = ? AND sub_range_id = ? ORDER BY id LIMIT ?"
    );
    let rows = sqlx::query_as::<_, CanceledIdentifier>(&sql)
        .bind(identifier_type)
        .bind(sub_range_id)
        .bind(limit)
        .fetch_all(&mut *conn)
        .await?;
    Ok(rows)
}

/// Pool across every sub-range of a publisher sharing `category`
pub async fn find_by_publisher_category(
    conn: &mut SqliteConnection,
    identifier_type: IdentifierType,
    publisher_id: i64,
    category: i64,
    limit: i64,
) -> RepoResult<Vec<CanceledIdentifier>> {
    let sql = format!(
        "SELECT {COLUMNS} FROM canceled_identifier WHERE identifier_type = ? AND publisher_id = ? AND category = ? ORDER BY id LIMIT ?"
    );
    let rows = sqlx::query_as::<_, CanceledIdentifier>(&sql)
        .bind(identifier_type)
        .bind(publisher_id)
        .bind(category)
        .bind(limit)
        .fetch_all(&mut *conn)
        .await?;
    Ok(rows)
}

pub async fn count_by_sub_range(
    conn: &mut SqliteConnection,
    identifier_type: IdentifierType,
    sub_range_id: i64,
) -> RepoResult<i64> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM canceled_identifier WHERE identifier_type = ? AND sub_range_id = ?",
    )
    .bind(identifier_type)
    .bind(sub_range_id)
    .fetch_one(&mut *conn)
    .await?;
    Ok(count)
}

pub async fn count_by_publisher_category(
    conn: &mut SqliteConnection,
    identifier_type: IdentifierType,
    publisher_id: i64,
    category: i64,
) -> RepoResult<i64> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM canceled_identifier WHERE identifier_type = ? AND publisher_id = ? AND category = ?",
    )
    .bind(identifier_type)
    .bind(publisher_id)
    .bind(category)
    .fetch_one(&mut *conn)
    .await?;
    Ok(count)
}

pub async fn create(
    conn: &mut SqliteConnection,
    data: &NewCanceledIdentifier<'_>,
    created_by: &str,
) -> RepoResult<i64> {
    let now = shared::util::now_millis();
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO canceled_identifier (identifier, identifier_type, category, publisher_id, sub_range_id, created_at, created_by) VALUES (?, ?, ?, ?, ?, ?, ?) RETURNING id",
    )
    .bind(data.identifier)
    .bind(data.identifier_type)
    .bind(data.category)
    .bind(data.publisher_id)
    .bind(data.sub_range_id)
    .bind(now)
    .bind(created_by)
    .fetch_one(&mut *conn)
    .await?;
    Ok(id)
}

pub async fn delete(conn: &mut SqliteConnection, id: i64) -> RepoResult<bool> {
    let rows = sqlx::query("DELETE FROM canceled_identifier WHERE id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(rows.rows_affected() > 0)
}

pub async fn delete_by_sub_range(
    conn: &mut SqliteConnection,
    identifier_type: IdentifierType,
    sub_range_id: i64,
) -> RepoResult<u64> {
    let rows =
        sqlx::query("DELETE FROM canceled_identifier WHERE identifier_type = ? AND sub_range_id = ?")
            .bind(identifier_type)
            .bind(sub_range_id)
            .execute(&mut *conn)
            .await?;
    Ok(rows.rows_affected())
}

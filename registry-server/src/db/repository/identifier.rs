//! Identifier Repository

use super::RepoResult;
use shared::models::{Identifier, IdentifierType};
use sqlx::SqliteConnection;

const COLUMNS: &str = "id, identifier, identifier_type, sub_range_id, identifier_batch_id, publication_type, created_at, created_by";

/// Insert payload for an issued identifier
#[derive(Debug, Clone)]
pub struct NewIdentifier<'a> {
    pub identifier: &'a str,
    pub identifier_type: IdentifierType,
    pub sub_range_id: i64,
    pub identifier_batch_id: i64,
    pub publication_type: &'a str,
}

pub async fn find_by_identifier(
    conn: &mut SqliteConnection,
    identifier: &str,
) -> RepoResult<Option<Identifier>> {
    let sql = format!("SELECT {COLUMNS} FROM identifier WHERE identifier = ?");
    let row = sqlx::query_as::<_, Identifier>(&sql)
        .bind(identifier)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row)
}

pub async fn find_by_batch(
    conn: &mut SqliteConnection,
    batch_id: i64,
) -> RepoResult<Vec<Identifier>> {
    let sql = format!("SELECT {COLUMNS} FROM identifier WHERE identifier_batch_id = ? ORDER BY id");
    let rows = sqlx::query_as::<_, Identifier>(&sql)
        .bind(batch_id)
        .fetch_all(&mut *conn)
        .await?;
    Ok(rows)
}

pub async fn count_by_batch(conn: &mut SqliteConnection, batch_id: i64) -> RepoResult<i64> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM identifier WHERE identifier_batch_id = ?")
            .bind(batch_id)
            .fetch_one(&mut *conn)
            .await?;
    Ok(count)
}

pub async fn count_by_sub_range(
    conn: &mut SqliteConnection,
    identifier_type: IdentifierType,
    sub_range_id: i64,
) -> RepoResult<i64> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM identifier WHERE identifier_type = ? AND sub_range_id = ?",
    )
    .bind(identifier_type)
    .bind(sub_range_id)
    .fetch_one(&mut *conn)
    .await?;
    Ok(count)
}

pub async fn insert(
    conn: &mut SqliteConnection,
    data: &NewIdentifier<'_>,
    created_by: &str,
) -> RepoResult<i64> {
    let now = shared::util::now_millis();
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO identifier (identifier, identifier_type, sub_range_id, identifier_batch_id, publication_type, created_at, created_by) VALUES (?, ?, ?, ?, ?, ?, ?) RETURNING id",
    )
    .bind(data.identifier)
    .bind(data.identifier_type)
    .bind(data.sub_range_id)
    .bind(data.identifier_batch_id)
    .bind(data.publication_type)
    .bind(now)
    .bind(created_by)
    .fetch_one(&mut *conn)
    .await?;
    Ok(id)
}

pub async fn set_publication_type(
    conn: &mut SqliteConnection,
    id: i64,
    publication_type: &str,
) -> RepoResult<()> {
    sqlx::query("UPDATE identifier SET publication_type = ? WHERE id = ?")
        .bind(publication_type)
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub async fn delete(conn: &mut SqliteConnection, id: i64) -> RepoResult<bool> {
    let rows = sqlx::query("DELETE FROM identifier WHERE id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(rows.rows_affected() > 0)
}

pub async fn delete_by_batch(conn: &mut SqliteConnection, batch_id: i64) -> RepoResult<u64> {
    let rows = sqlx::query("DELETE FROM identifier WHERE identifier_batch_id = ?")
        .bind(batch_id)
        .execute(&mut *conn)
        .await?;
    Ok(rows.rows_affected())
}

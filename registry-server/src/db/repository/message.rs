//! Message Repository

use super::{RepoError, RepoResult};
use shared::models::Message;
use sqlx::SqliteConnection;

pub async fn find_by_id(conn: &mut SqliteConnection, id: i64) -> RepoResult<Option<Message>> {
    let row = sqlx::query_as::<_, Message>(
        "SELECT id, publisher_id, identifier_batch_id, subject, created_at FROM message WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(row)
}

pub async fn create(
    conn: &mut SqliteConnection,
    publisher_id: Option<i64>,
    identifier_batch_id: Option<i64>,
    subject: &str,
) -> RepoResult<Message> {
    let now = shared::util::now_millis();
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO message (publisher_id, identifier_batch_id, subject, created_at) VALUES (?, ?, ?, ?) RETURNING id",
    )
    .bind(publisher_id)
    .bind(identifier_batch_id)
    .bind(subject)
    .bind(now)
    .fetch_one(&mut *conn)
    .await?;
    find_by_id(conn, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create message".into()))
}

pub async fn count_by_batch(conn: &mut SqliteConnection, batch_id: i64) -> RepoResult<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM message WHERE identifier_batch_id = ?")
        .bind(batch_id)
        .fetch_one(&mut *conn)
        .await?;
    Ok(count)
}

/// Detach messages from a batch about to be destroyed
pub async fn clear_batch_reference(conn: &mut SqliteConnection, batch_id: i64) -> RepoResult<u64> {
    let rows =
        sqlx::query("UPDATE message SET identifier_batch_id = NULL WHERE identifier_batch_id = ?")
            .bind(batch_id)
            .execute(&mut *conn)
            .await?;
    Ok(rows.rows_affected())
}

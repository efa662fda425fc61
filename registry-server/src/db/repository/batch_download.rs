//! Batch Download Audit Repository

use super::RepoResult;
use shared::models::BatchDownloadRecord;
use sqlx::SqliteConnection;

pub async fn create(
    conn: &mut SqliteConnection,
    batch_id: i64,
    identifier_count: i64,
    content_hash: &str,
    created_by: &str,
) -> RepoResult<i64> {
    let now = shared::util::now_millis();
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO identifier_batch_download (identifier_batch_id, identifier_count, content_hash, created_at, created_by) VALUES (?, ?, ?, ?, ?) RETURNING id",
    )
    .bind(batch_id)
    .bind(identifier_count)
    .bind(content_hash)
    .bind(now)
    .bind(created_by)
    .fetch_one(&mut *conn)
    .await?;
    Ok(id)
}

pub async fn find_by_batch(
    conn: &mut SqliteConnection,
    batch_id: i64,
) -> RepoResult<Vec<BatchDownloadRecord>> {
    let rows = sqlx::query_as::<_, BatchDownloadRecord>(
        "SELECT id, identifier_batch_id, identifier_count, content_hash, created_at, created_by FROM identifier_batch_download WHERE identifier_batch_id = ? ORDER BY id",
    )
    .bind(batch_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows)
}

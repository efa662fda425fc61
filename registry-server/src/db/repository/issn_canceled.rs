//! ISSN Canceled Repository (global reuse pool)

use super::RepoResult;
use shared::models::IssnCanceled;
use sqlx::SqliteConnection;

/// Oldest canceled ISSN across all ranges
pub async fn find_first(conn: &mut SqliteConnection) -> RepoResult<Option<IssnCanceled>> {
    let row = sqlx::query_as::<_, IssnCanceled>(
        "SELECT id, issn, issn_range_id, created_at, created_by FROM issn_canceled ORDER BY id LIMIT 1",
    )
    .fetch_optional(&mut *conn)
    .await?;
    Ok(row)
}

pub async fn count_by_range(conn: &mut SqliteConnection, range_id: i64) -> RepoResult<i64> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM issn_canceled WHERE issn_range_id = ?")
            .bind(range_id)
            .fetch_one(&mut *conn)
            .await?;
    Ok(count)
}

pub async fn create(
    conn: &mut SqliteConnection,
    issn: &str,
    range_id: i64,
    created_by: &str,
) -> RepoResult<i64> {
    let now = shared::util::now_millis();
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO issn_canceled (issn, issn_range_id, created_at, created_by) VALUES (?, ?, ?, ?) RETURNING id",
    )
    .bind(issn)
    .bind(range_id)
    .bind(now)
    .bind(created_by)
    .fetch_one(&mut *conn)
    .await?;
    Ok(id)
}

pub async fn delete(conn: &mut SqliteConnection, id: i64) -> RepoResult<bool> {
    let rows = sqlx::query("DELETE FROM issn_canceled WHERE id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(rows.rows_affected() > 0)
}

pub async fn delete_by_range(conn: &mut SqliteConnection, range_id: i64) -> RepoResult<u64> {
    let rows = sqlx::query("DELETE FROM issn_canceled WHERE issn_range_id = ?")
        .bind(range_id)
        .execute(&mut *conn)
        .await?;
    Ok(rows.rows_affected())
}

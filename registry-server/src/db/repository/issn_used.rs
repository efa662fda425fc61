//! ISSN Used Repository

use super::RepoResult;
use shared::models::IssnUsed;
use sqlx::SqliteConnection;

pub async fn find_by_publication(
    conn: &mut SqliteConnection,
    publication_id: i64,
) -> RepoResult<Option<IssnUsed>> {
    let row = sqlx::query_as::<_, IssnUsed>(
        "SELECT id, issn, issn_range_id, publication_id, created_at, created_by FROM issn_used WHERE publication_id = ?",
    )
    .bind(publication_id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(row)
}

pub async fn count_by_range(conn: &mut SqliteConnection, range_id: i64) -> RepoResult<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM issn_used WHERE issn_range_id = ?")
        .bind(range_id)
        .fetch_one(&mut *conn)
        .await?;
    Ok(count)
}

pub async fn create(
    conn: &mut SqliteConnection,
    issn: &str,
    range_id: i64,
    publication_id: i64,
    created_by: &str,
) -> RepoResult<i64> {
    let now = shared::util::now_millis();
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO issn_used (issn, issn_range_id, publication_id, created_at, created_by) VALUES (?, ?, ?, ?, ?) RETURNING id",
    )
    .bind(issn)
    .bind(range_id)
    .bind(publication_id)
    .bind(now)
    .bind(created_by)
    .fetch_one(&mut *conn)
    .await?;
    Ok(id)
}

pub async fn delete(conn: &mut SqliteConnection, id: i64) -> RepoResult<bool> {
    let rows = sqlx::query("DELETE FROM issn_used WHERE id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(rows.rows_affected() > 0)
}

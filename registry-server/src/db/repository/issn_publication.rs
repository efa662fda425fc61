//! ISSN Publication Repository

use super::{RepoError, RepoResult};
use shared::models::IssnPublication;
use sqlx::SqliteConnection;

pub async fn find_by_id(
    conn: &mut SqliteConnection,
    id: i64,
) -> RepoResult<Option<IssnPublication>> {
    let row = sqlx::query_as::<_, IssnPublication>(
        "SELECT id, form_id, title, issn, created_at, updated_at FROM issn_publication WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(row)
}

pub async fn create(
    conn: &mut SqliteConnection,
    form_id: i64,
    title: &str,
) -> RepoResult<IssnPublication> {
    let now = shared::util::now_millis();
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO issn_publication (form_id, title, issn, created_at, updated_at) VALUES (?1, ?2, '', ?3, ?3) RETURNING id",
    )
    .bind(form_id)
    .bind(title)
    .bind(now)
    .fetch_one(&mut *conn)
    .await?;
    find_by_id(conn, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create ISSN publication".into()))
}

pub async fn set_issn(conn: &mut SqliteConnection, id: i64, issn: &str) -> RepoResult<()> {
    let now = shared::util::now_millis();
    let rows = sqlx::query("UPDATE issn_publication SET issn = ?, updated_at = ? WHERE id = ?")
        .bind(issn)
        .bind(now)
        .bind(id)
        .execute(&mut *conn)
        .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("ISSN publication {id} not found")));
    }
    Ok(())
}

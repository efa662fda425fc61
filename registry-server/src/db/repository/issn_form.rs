//! ISSN Form Repository

use super::{RepoError, RepoResult};
use shared::models::{IssnForm, IssnFormStatus};
use sqlx::SqliteConnection;

pub async fn find_by_id(conn: &mut SqliteConnection, id: i64) -> RepoResult<Option<IssnForm>> {
    let row = sqlx::query_as::<_, IssnForm>(
        "SELECT id, publisher_name, status, publication_count, publication_count_issn, created_at, updated_at FROM issn_form WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(row)
}

pub async fn create(
    conn: &mut SqliteConnection,
    publisher_name: &str,
    publication_count: i64,
) -> RepoResult<IssnForm> {
    let now = shared::util::now_millis();
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO issn_form (publisher_name, status, publication_count, publication_count_issn, created_at, updated_at) VALUES (?1, ?2, ?3, 0, ?4, ?4) RETURNING id",
    )
    .bind(publisher_name)
    .bind(IssnFormStatus::NotHandled)
    .bind(publication_count)
    .bind(now)
    .fetch_one(&mut *conn)
    .await?;
    find_by_id(conn, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create ISSN form".into()))
}

/// Persist status and ISSN counter
pub async fn save(conn: &mut SqliteConnection, form: &IssnForm) -> RepoResult<()> {
    let now = shared::util::now_millis();
    let rows = sqlx::query(
        "UPDATE issn_form SET status = ?, publication_count_issn = ?, updated_at = ? WHERE id = ?",
    )
    .bind(form.status)
    .bind(form.publication_count_issn)
    .bind(now)
    .bind(form.id)
    .execute(&mut *conn)
    .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("ISSN form {} not found", form.id)));
    }
    Ok(())
}

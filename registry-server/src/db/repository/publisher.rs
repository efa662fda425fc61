//! Publisher Repository

use super::{RepoError, RepoResult};
use crate::db::TypeProfile;
use shared::models::{Publisher, PublisherCreate};
use sqlx::SqliteConnection;

const COLUMNS: &str =
    "id, name, active_identifier_isbn, active_identifier_ismn, created_at, updated_at";

pub async fn find_by_id(conn: &mut SqliteConnection, id: i64) -> RepoResult<Option<Publisher>> {
    let sql = format!("SELECT {COLUMNS} FROM publisher WHERE id = ?");
    let row = sqlx::query_as::<_, Publisher>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row)
}

pub async fn create(conn: &mut SqliteConnection, data: &PublisherCreate) -> RepoResult<Publisher> {
    let now = shared::util::now_millis();
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO publisher (name, created_at, updated_at) VALUES (?1, ?2, ?2) RETURNING id",
    )
    .bind(&data.name)
    .bind(now)
    .fetch_one(&mut *conn)
    .await?;
    find_by_id(conn, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create publisher".into()))
}

/// Record (or clear) the publisher identifier of the active sub-range
pub async fn set_active_identifier(
    conn: &mut SqliteConnection,
    profile: &TypeProfile,
    publisher_id: i64,
    publisher_identifier: Option<&str>,
) -> RepoResult<()> {
    let now = shared::util::now_millis();
    let sql = format!(
        "UPDATE publisher SET {} = ?, updated_at = ? WHERE id = ?",
        profile.publisher_active_column
    );
    let rows = sqlx::query(&sql)
        .bind(publisher_identifier)
        .bind(now)
        .bind(publisher_id)
        .execute(&mut *conn)
        .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!(
            "Publisher {publisher_id} not found"
        )));
    }
    Ok(())
}

/// Clear the active attribute only when it still points at `publisher_identifier`
pub async fn clear_active_identifier_if(
    conn: &mut SqliteConnection,
    profile: &TypeProfile,
    publisher_id: i64,
    publisher_identifier: &str,
) -> RepoResult<bool> {
    let now = shared::util::now_millis();
    let column = profile.publisher_active_column;
    let sql = format!(
        "UPDATE publisher SET {column} = NULL, updated_at = ? WHERE id = ? AND {column} = ?"
    );
    let rows = sqlx::query(&sql)
        .bind(now)
        .bind(publisher_id)
        .bind(publisher_identifier)
        .execute(&mut *conn)
        .await?;
    Ok(rows.rows_affected() > 0)
}

//! Canceled Sub-range Repository

use super::{RepoError, RepoResult};
use crate::db::TypeProfile;
use shared::models::CanceledSubRange;
use sqlx::SqliteConnection;

const COLUMNS: &str = "id, identifier, range_id, category, created_at, created_by";

pub async fn find_by_id(
    conn: &mut SqliteConnection,
    profile: &TypeProfile,
    id: i64,
) -> RepoResult<Option<CanceledSubRange>> {
    let sql = format!(
        "SELECT {COLUMNS} FROM {} WHERE id = ?",
        profile.canceled_sub_range_table
    );
    let row = sqlx::query_as::<_, CanceledSubRange>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row)
}

pub async fn find_by_range(
    conn: &mut SqliteConnection,
    profile: &TypeProfile,
    range_id: i64,
) -> RepoResult<Vec<CanceledSubRange>> {
    let sql = format!(
        "SELECT {COLUMNS} FROM {} WHERE range_id = ? ORDER BY identifier",
        profile.canceled_sub_range_table
    );
    let rows = sqlx::query_as::<_, CanceledSubRange>(&sql)
        .bind(range_id)
        .fetch_all(&mut *conn)
        .await?;
    Ok(rows)
}

pub async fn create(
    conn: &mut SqliteConnection,
    profile: &TypeProfile,
    identifier: &str,
    range_id: i64,
    category: i64,
    created_by: &str,
) -> RepoResult<CanceledSubRange> {
    let now = shared::util::now_millis();
    let sql = format!(
        "INSERT INTO {} (identifier, range_id, category, created_at, created_by) VALUES (?, ?, ?, ?, ?) RETURNING id",
        profile.canceled_sub_range_table
    );
    let id: i64 = sqlx::query_scalar(&sql)
        .bind(identifier)
        .bind(range_id)
        .bind(category)
        .bind(now)
        .bind(created_by)
        .fetch_one(&mut *conn)
        .await?;
    find_by_id(conn, profile, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to archive sub-range".into()))
}

pub async fn delete(conn: &mut SqliteConnection, profile: &TypeProfile, id: i64) -> RepoResult<bool> {
    let sql = format!("DELETE FROM {} WHERE id = ?", profile.canceled_sub_range_table);
    let rows = sqlx::query(&sql).bind(id).execute(&mut *conn).await?;
    Ok(rows.rows_affected() > 0)
}

pub async fn delete_by_range(
    conn: &mut SqliteConnection,
    profile: &TypeProfile,
    range_id: i64,
) -> RepoResult<u64> {
    let sql = format!(
        "DELETE FROM {} WHERE range_id = ?",
        profile.canceled_sub_range_table
    );
    let rows = sqlx::query(&sql).bind(range_id).execute(&mut *conn).await?;
    Ok(rows.rows_affected())
}

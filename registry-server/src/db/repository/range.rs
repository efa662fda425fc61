//! Range Repository (isbn_range / ismn_range)

use super::{RepoError, RepoResult};
use crate::db::TypeProfile;
use shared::models::{Range, RangeCreate};
use sqlx::SqliteConnection;

const COLUMNS: &str = "id, prefix, lang_group, category, range_begin, range_end, next, free, taken, canceled, is_active, is_closed, created_at, created_by, updated_at, updated_by";

pub async fn find_all(conn: &mut SqliteConnection, profile: &TypeProfile) -> RepoResult<Vec<Range>> {
    let sql = format!("SELECT {COLUMNS} FROM {} ORDER BY id", profile.range_table);
    let rows = sqlx::query_as::<_, Range>(&sql).fetch_all(&mut *conn).await?;
    Ok(rows)
}

pub async fn find_by_id(
    conn: &mut SqliteConnection,
    profile: &TypeProfile,
    id: i64,
) -> RepoResult<Option<Range>> {
    let sql = format!("SELECT {COLUMNS} FROM {} WHERE id = ?", profile.range_table);
    let row = sqlx::query_as::<_, Range>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row)
}

/// Ranges sharing a prefix and language group
pub async fn find_by_scope(
    conn: &mut SqliteConnection,
    profile: &TypeProfile,
    prefix: &str,
    lang_group: &str,
) -> RepoResult<Vec<Range>> {
    let sql = format!(
        "SELECT {COLUMNS} FROM {} WHERE prefix = ? AND lang_group = ? ORDER BY range_begin",
        profile.range_table
    );
    let rows = sqlx::query_as::<_, Range>(&sql)
        .bind(prefix)
        .bind(lang_group)
        .fetch_all(&mut *conn)
        .await?;
    Ok(rows)
}

pub async fn create(
    conn: &mut SqliteConnection,
    profile: &TypeProfile,
    data: &RangeCreate,
    free: i64,
    created_by: &str,
) -> RepoResult<Range> {
    let now = shared::util::now_millis();
    let sql = format!(
        "INSERT INTO {} (prefix, lang_group, category, range_begin, range_end, next, free, taken, canceled, is_active, is_closed, created_at, created_by, updated_at, updated_by) VALUES (?1, ?2, ?3, ?4, ?5, ?4, ?6, 0, 0, 0, 0, ?7, ?8, ?7, ?8) RETURNING id",
        profile.range_table
    );
    let id: i64 = sqlx::query_scalar(&sql)
        .bind(&data.prefix)
        .bind(&data.lang_group)
        .bind(data.category)
        .bind(&data.range_begin)
        .bind(&data.range_end)
        .bind(free)
        .bind(now)
        .bind(created_by)
        .fetch_one(&mut *conn)
        .await?;
    find_by_id(conn, profile, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create range".into()))
}

/// Persist counters and state flags
pub async fn save(
    conn: &mut SqliteConnection,
    profile: &TypeProfile,
    range: &Range,
    updated_by: &str,
) -> RepoResult<()> {
    let now = shared::util::now_millis();
    let sql = format!(
        "UPDATE {} SET next = ?1, free = ?2, taken = ?3, canceled = ?4, is_active = ?5, is_closed = ?6, updated_at = ?7, updated_by = ?8 WHERE id = ?9",
        profile.range_table
    );
    let rows = sqlx::query(&sql)
        .bind(&range.next)
        .bind(range.free)
        .bind(range.taken)
        .bind(range.canceled)
        .bind(range.is_active)
        .bind(range.is_closed)
        .bind(now)
        .bind(updated_by)
        .bind(range.id)
        .execute(&mut *conn)
        .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("Range {} not found", range.id)));
    }
    Ok(())
}

/// Deactivate every active range of the type except `except_id`
pub async fn deactivate_others(
    conn: &mut SqliteConnection,
    profile: &TypeProfile,
    except_id: i64,
    updated_by: &str,
) -> RepoResult<u64> {
    let now = shared::util::now_millis();
    let sql = format!(
        "UPDATE {} SET is_active = 0, updated_at = ?, updated_by = ? WHERE is_active = 1 AND id <> ?",
        profile.range_table
    );
    let rows = sqlx::query(&sql)
        .bind(now)
        .bind(updated_by)
        .bind(except_id)
        .execute(&mut *conn)
        .await?;
    Ok(rows.rows_affected())
}

pub async fn delete(conn: &mut SqliteConnection, profile: &TypeProfile, id: i64) -> RepoResult<bool> {
    let sql = format!("DELETE FROM {} WHERE id = ?", profile.range_table);
    let rows = sqlx::query(&sql).bind(id).execute(&mut *conn).await?;
    Ok(rows.rows_affected() > 0)
}

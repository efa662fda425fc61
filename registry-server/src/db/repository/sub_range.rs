//! Sub-range Repository (isbn_sub_range / ismn_sub_range)

use super::{RepoError, RepoResult};
use crate::db::TypeProfile;
use shared::models::SubRange;
use sqlx::SqliteConnection;

const COLUMNS: &str = "id, publisher_id, range_id, publisher_identifier, category, range_begin, range_end, next, free, taken, canceled, deleted, is_active, is_closed, created_at, created_by, updated_at, updated_by";

/// Insert payload for a fresh sub-range
#[derive(Debug, Clone)]
pub struct NewSubRange<'a> {
    pub publisher_id: i64,
    pub range_id: i64,
    pub publisher_identifier: &'a str,
    pub category: i64,
    pub range_begin: &'a str,
    pub range_end: &'a str,
    pub free: i64,
}

pub async fn find_by_id(
    conn: &mut SqliteConnection,
    profile: &TypeProfile,
    id: i64,
) -> RepoResult<Option<SubRange>> {
    let sql = format!("SELECT {COLUMNS} FROM {} WHERE id = ?", profile.sub_range_table);
    let row = sqlx::query_as::<_, SubRange>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row)
}

pub async fn find_by_publisher(
    conn: &mut SqliteConnection,
    profile: &TypeProfile,
    publisher_id: i64,
) -> RepoResult<Vec<SubRange>> {
    let sql = format!(
        "SELECT {COLUMNS} FROM {} WHERE publisher_id = ? ORDER BY id",
        profile.sub_range_table
    );
    let rows = sqlx::query_as::<_, SubRange>(&sql)
        .bind(publisher_id)
        .fetch_all(&mut *conn)
        .await?;
    Ok(rows)
}

/// The publisher's active, open sub-range
pub async fn find_active_by_publisher(
    conn: &mut SqliteConnection,
    profile: &TypeProfile,
    publisher_id: i64,
) -> RepoResult<Option<SubRange>> {
    let sql = format!(
        "SELECT {COLUMNS} FROM {} WHERE publisher_id = ? AND is_active = 1 AND is_closed = 0 ORDER BY id LIMIT 1",
        profile.sub_range_table
    );
    let row = sqlx::query_as::<_, SubRange>(&sql)
        .bind(publisher_id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row)
}

/// An open sub-range of the same publisher and category with capacity left
pub async fn find_open_alternate(
    conn: &mut SqliteConnection,
    profile: &TypeProfile,
    publisher_id: i64,
    category: i64,
    exclude_id: i64,
) -> RepoResult<Option<SubRange>> {
    let sql = format!(
        "SELECT {COLUMNS} FROM {} WHERE publisher_id = ? AND category = ? AND id <> ? AND is_closed = 0 AND (free > 0 OR canceled > 0) ORDER BY id LIMIT 1",
        profile.sub_range_table
    );
    let row = sqlx::query_as::<_, SubRange>(&sql)
        .bind(publisher_id)
        .bind(category)
        .bind(exclude_id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row)
}

pub async fn count_by_range(
    conn: &mut SqliteConnection,
    profile: &TypeProfile,
    range_id: i64,
) -> RepoResult<i64> {
    let sql = format!("SELECT COUNT(*) FROM {} WHERE range_id = ?", profile.sub_range_table);
    let count: i64 = sqlx::query_scalar(&sql)
        .bind(range_id)
        .fetch_one(&mut *conn)
        .await?;
    Ok(count)
}

/// Active sub-ranges of the publisher other than `exclude_id`
pub async fn count_active_siblings(
    conn: &mut SqliteConnection,
    profile: &TypeProfile,
    publisher_id: i64,
    exclude_id: i64,
) -> RepoResult<i64> {
    let sql = format!(
        "SELECT COUNT(*) FROM {} WHERE publisher_id = ? AND id <> ? AND is_active = 1",
        profile.sub_range_table
    );
    let count: i64 = sqlx::query_scalar(&sql)
        .bind(publisher_id)
        .bind(exclude_id)
        .fetch_one(&mut *conn)
        .await?;
    Ok(count)
}

pub async fn create(
    conn: &mut SqliteConnection,
    profile: &TypeProfile,
    data: &NewSubRange<'_>,
    created_by: &str,
) -> RepoResult<SubRange> {
    let now = shared::util::now_millis();
    let sql = format!(
        "INSERT INTO {} (publisher_id, range_id, publisher_identifier, category, range_begin, range_end, next, free, taken, canceled, deleted, is_active, is_closed, created_at, created_by, updated_at, updated_by) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?5, ?7, 0, 0, 0, 0, 0, ?8, ?9, ?8, ?9) RETURNING id",
        profile.sub_range_table
    );
    let id: i64 = sqlx::query_scalar(&sql)
        .bind(data.publisher_id)
        .bind(data.range_id)
        .bind(data.publisher_identifier)
        .bind(data.category)
        .bind(data.range_begin)
        .bind(data.range_end)
        .bind(data.free)
        .bind(now)
        .bind(created_by)
        .fetch_one(&mut *conn)
        .await?;
    find_by_id(conn, profile, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create sub-range".into()))
}

/// Persist counters and state flags
pub async fn save(
    conn: &mut SqliteConnection,
    profile: &TypeProfile,
    sub_range: &SubRange,
    updated_by: &str,
) -> RepoResult<()> {
    let now = shared::util::now_millis();
    let sql = format!(
        "UPDATE {} SET next = ?1, free = ?2, taken = ?3, canceled = ?4, deleted = ?5, is_active = ?6, is_closed = ?7, updated_at = ?8, updated_by = ?9 WHERE id = ?10",
        profile.sub_range_table
    );
    let rows = sqlx::query(&sql)
        .bind(&sub_range.next)
        .bind(sub_range.free)
        .bind(sub_range.taken)
        .bind(sub_range.canceled)
        .bind(sub_range.deleted)
        .bind(sub_range.is_active)
        .bind(sub_range.is_closed)
        .bind(now)
        .bind(updated_by)
        .bind(sub_range.id)
        .execute(&mut *conn)
        .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!(
            "Sub-range {} not found",
            sub_range.id
        )));
    }
    Ok(())
}

/// Deactivate the publisher's other sub-ranges of this type
pub async fn deactivate_publisher_others(
    conn: &mut SqliteConnection,
    profile: &TypeProfile,
    publisher_id: i64,
    except_id: i64,
    updated_by: &str,
) -> RepoResult<u64> {
    let now = shared::util::now_millis();
    let sql = format!(
        "UPDATE {} SET is_active = 0, updated_at = ?, updated_by = ? WHERE publisher_id = ? AND id <> ? AND is_active = 1",
        profile.sub_range_table
    );
    let rows = sqlx::query(&sql)
        .bind(now)
        .bind(updated_by)
        .bind(publisher_id)
        .bind(except_id)
        .execute(&mut *conn)
        .await?;
    Ok(rows.rows_affected())
}

pub async fn delete(conn: &mut SqliteConnection, profile: &TypeProfile, id: i64) -> RepoResult<bool> {
    let sql = format!("DELETE FROM {} WHERE id = ?", profile.sub_range_table);
    let rows = sqlx::query(&sql).bind(id).execute(&mut *conn).await?;
    Ok(rows.rows_affected() > 0)
}

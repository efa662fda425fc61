//! ISSN Range Repository

use super::{RepoError, RepoResult};
use shared::models::{IssnRange, IssnRangeCreate};
use sqlx::SqliteConnection;

const COLUMNS: &str = "id, block, range_begin, range_end, next, free, taken, canceled, is_active, is_closed, created_at, created_by, updated_at, updated_by";

pub async fn find_all(conn: &mut SqliteConnection) -> RepoResult<Vec<IssnRange>> {
    let sql = format!("SELECT {COLUMNS} FROM issn_range ORDER BY id");
    let rows = sqlx::query_as::<_, IssnRange>(&sql).fetch_all(&mut *conn).await?;
    Ok(rows)
}

pub async fn find_by_id(conn: &mut SqliteConnection, id: i64) -> RepoResult<Option<IssnRange>> {
    let sql = format!("SELECT {COLUMNS} FROM issn_range WHERE id = ?");
    let row = sqlx::query_as::<_, IssnRange>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row)
}

pub async fn find_by_block(conn: &mut SqliteConnection, block: &str) -> RepoResult<Vec<IssnRange>> {
    let sql = format!("SELECT {COLUMNS} FROM issn_range WHERE block = ? ORDER BY range_begin");
    let rows = sqlx::query_as::<_, IssnRange>(&sql)
        .bind(block)
        .fetch_all(&mut *conn)
        .await?;
    Ok(rows)
}

/// The active, open range
pub async fn find_active(conn: &mut SqliteConnection) -> RepoResult<Option<IssnRange>> {
    let sql = format!(
        "SELECT {COLUMNS} FROM issn_range WHERE is_active = 1 AND is_closed = 0 ORDER BY id LIMIT 1"
    );
    let row = sqlx::query_as::<_, IssnRange>(&sql)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row)
}

pub async fn count_active_except(conn: &mut SqliteConnection, exclude_id: i64) -> RepoResult<i64> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM issn_range WHERE is_active = 1 AND id <> ?")
            .bind(exclude_id)
            .fetch_one(&mut *conn)
            .await?;
    Ok(count)
}

pub async fn create(
    conn: &mut SqliteConnection,
    data: &IssnRangeCreate,
    free: i64,
    created_by: &str,
) -> RepoResult<IssnRange> {
    let now = shared::util::now_millis();
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO issn_range (block, range_begin, range_end, next, free, taken, canceled, is_active, is_closed, created_at, created_by, updated_at, updated_by) VALUES (?1, ?2, ?3, ?2, ?4, 0, 0, 0, 0, ?5, ?6, ?5, ?6) RETURNING id",
    )
    .bind(&data.block)
    .bind(&data.range_begin)
    .bind(&data.range_end)
    .bind(free)
    .bind(now)
    .bind(created_by)
    .fetch_one(&mut *conn)
    .await?;
    find_by_id(conn, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create ISSN range".into()))
}

/// Persist counters and state flags
pub async fn save(conn: &mut SqliteConnection, range: &IssnRange, updated_by: &str) -> RepoResult<()> {
    let now = shared::util::now_millis();
    let rows = sqlx::query(
        "UPDATE issn_range SET next = ?1, free = ?2, taken = ?3, canceled = ?4, is_active = ?5, is_closed = ?6, updated_at = ?7, updated_by = ?8 WHERE id = ?9",
    )
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
        return Err(RepoError::NotFound(format!("ISSN range {} not found", range.id)));
    }
    Ok(())
}

pub async fn deactivate_others(
    conn: &mut SqliteConnection,
    except_id: i64,
    updated_by: &str,
) -> RepoResult<u64> {
    let now = shared::util::now_millis();
    let rows = sqlx::query(
        "UPDATE issn_range SET is_active = 0, updated_at = ?, updated_by = ? WHERE is_active = 1 AND id <> ?",
    )
    .bind(now)
    .bind(updated_by)
    .bind(except_id)
    .execute(&mut *conn)
    .await?;
    Ok(rows.rows_affected())
}

pub async fn delete(conn: &mut SqliteConnection, id: i64) -> RepoResult<bool> {
    let rows = sqlx::query("DELETE FROM issn_range WHERE id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(rows.rows_affected() > 0)
}

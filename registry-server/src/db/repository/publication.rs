//! Publication Repository

use super::{RepoError, RepoResult};
use shared::models::{IdentifierType, Publication, PublicationCreate};
use sqlx::SqliteConnection;
use sqlx::types::Json;

const COLUMNS: &str = "id, publisher_id, title, publication_type, publication_format, print_types, file_formats, is_public, on_process, publication_identifier_type, publication_identifier_print, publication_identifier_electronical, created_at, updated_at";

pub async fn find_by_id(conn: &mut SqliteConnection, id: i64) -> RepoResult<Option<Publication>> {
    let sql = format!("SELECT {COLUMNS} FROM publication WHERE id = ?");
    let row = sqlx::query_as::<_, Publication>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row)
}

pub async fn create(
    conn: &mut SqliteConnection,
    data: &PublicationCreate,
) -> RepoResult<Publication> {
    let now = shared::util::now_millis();
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO publication (publisher_id, title, publication_type, publication_format, print_types, file_formats, is_public, on_process, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 1, ?8, ?8) RETURNING id",
    )
    .bind(data.publisher_id)
    .bind(&data.title)
    .bind(data.publication_type)
    .bind(data.publication_format)
    .bind(Json(&data.print_types))
    .bind(Json(&data.file_formats))
    .bind(data.is_public)
    .bind(now)
    .fetch_one(&mut *conn)
    .await?;
    find_by_id(conn, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create publication".into()))
}

/// Write the identifier columns (maps already rendered to column text)
pub async fn set_identifiers(
    conn: &mut SqliteConnection,
    id: i64,
    identifier_type: Option<IdentifierType>,
    print: &str,
    electronical: &str,
    on_process: bool,
) -> RepoResult<()> {
    let now = shared::util::now_millis();
    let rows = sqlx::query(
        "UPDATE publication SET publication_identifier_type = ?, publication_identifier_print = ?, publication_identifier_electronical = ?, on_process = ?, updated_at = ? WHERE id = ?",
    )
    .bind(identifier_type)
    .bind(print)
    .bind(electronical)
    .bind(on_process)
    .bind(now)
    .bind(id)
    .execute(&mut *conn)
    .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("Publication {id} not found")));
    }
    Ok(())
}

/// Clear every identifier and put the publication back in process
pub async fn reset_identifiers(conn: &mut SqliteConnection, id: i64) -> RepoResult<()> {
    set_identifiers(conn, id, None, "", "", true).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbService;
    use shared::models::{PublicationFormat, PublicationType};

    #[tokio::test]
    async fn test_json_lists_and_identifier_columns() {
        let db = DbService::open_in_memory().await.unwrap();
        let mut conn = db.pool.acquire().await.unwrap();

        let p = create(
            &mut conn,
            &PublicationCreate {
                publisher_id: None,
                title: "Kalevala".into(),
                publication_type: PublicationType::Book,
                publication_format: PublicationFormat::PrintElectronical,
                print_types: vec!["PAPERBACK".into()],
                file_formats: vec!["PDF".into(), "EPUB".into()],
                is_public: true,
            },
        )
        .await
        .unwrap();
        assert_eq!(p.print_types, vec!["PAPERBACK".to_string()]);
        assert_eq!(p.file_formats.len(), 2);
        assert!(p.on_process);
        assert!(!p.has_identifiers());

        set_identifiers(
            &mut conn,
            p.id,
            Some(IdentifierType::Isbn),
            r#"{"978-951-000-000-7":"PAPERBACK"}"#,
            "",
            false,
        )
        .await
        .unwrap();
        let p = find_by_id(&mut conn, p.id).await.unwrap().unwrap();
        assert!(p.has_identifiers());
        assert_eq!(p.publication_identifier_type, Some(IdentifierType::Isbn));
        assert!(!p.on_process);

        reset_identifiers(&mut conn, p.id).await.unwrap();
        let p = find_by_id(&mut conn, p.id).await.unwrap().unwrap();
        assert!(!p.has_identifiers());
        assert!(p.publication_identifier_type.is_none());
        assert!(p.on_process);
    }
}

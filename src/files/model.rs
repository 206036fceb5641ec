use serde::Serialize;
use sqlx::{FromRow, SqlitePool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{AppError, AppResult, mods::StorageDriver};

pub const PER_PAGE: i64 = 20;

const DOCUMENT_TYPES: [&str; 4] = [
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "text/plain",
];

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct FileRecord {
    pub id: Uuid,
    pub mod_id: Uuid,
    pub page_id: Option<Uuid>,
    pub original_name: String,
    pub filename: String,
    pub path: String,
    pub mime_type: String,
    pub size: i64,
    pub storage_driver: StorageDriver,
    pub url: Option<String>,
    pub uploaded_by: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(skip)]
    pub deleted_at: Option<OffsetDateTime>,
}

impl FileRecord {
    /// `1.5 KB`, `10 MB`: divides by 1024 while above it, rounded to two places.
    pub fn human_size(&self) -> String {
        const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
        let mut size = self.size as f64;
        let mut unit = 0;
        while size > 1024.0 && unit < UNITS.len() - 1 {
            size /= 1024.0;
            unit += 1;
        }
        let rounded = (size * 100.0).round() / 100.0;
        format!("{rounded} {}", UNITS[unit])
    }

    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }

    pub fn is_document(&self) -> bool {
        DOCUMENT_TYPES.contains(&self.mime_type.as_str())
    }
}

pub async fn insert(db_pool: &SqlitePool, file: &FileRecord) -> AppResult<()> {
    sqlx::query("INSERT INTO files (id,mod_id,page_id,original_name,filename,path,mime_type,size,storage_driver,url,uploaded_by,created_at) VALUES (?,?,?,?,?,?,?,?,?,?,?,?)")
        .bind(file.id)
        .bind(file.mod_id)
        .bind(file.page_id)
        .bind(&file.original_name)
        .bind(&file.filename)
        .bind(&file.path)
        .bind(&file.mime_type)
        .bind(file.size)
        .bind(file.storage_driver)
        .bind(&file.url)
        .bind(file.uploaded_by)
        .bind(file.created_at)
        .execute(db_pool)
        .await?;
    Ok(())
}

/// A live file of `mod_id`. Files of other workspaces are as good as missing.
pub async fn get_in(db_pool: &SqlitePool, mod_id: Uuid, id: Uuid) -> AppResult<FileRecord> {
    sqlx::query_as::<_, FileRecord>("SELECT * FROM files WHERE id=? AND mod_id=? AND deleted_at IS NULL")
        .bind(id)
        .bind(mod_id)
        .fetch_optional(db_pool)
        .await?
        .ok_or(AppError::NotFound("file"))
}

/// One page of a workspace's files, newest first, plus the total count.
pub async fn paginate(db_pool: &SqlitePool, mod_id: Uuid, page: i64) -> AppResult<(Vec<FileRecord>, i64)> {
    let offset = (page.max(1) - 1).saturating_mul(PER_PAGE);
    let files = sqlx::query_as::<_, FileRecord>(
        "SELECT * FROM files WHERE mod_id=? AND deleted_at IS NULL ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
    )
    .bind(mod_id)
    .bind(PER_PAGE)
    .bind(offset)
    .fetch_all(db_pool)
    .await?;

    let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM files WHERE mod_id=? AND deleted_at IS NULL")
        .bind(mod_id)
        .fetch_one(db_pool)
        .await?;

    Ok((files, total))
}

pub async fn attached_to(db_pool: &SqlitePool, page_id: Uuid) -> AppResult<Vec<FileRecord>> {
    Ok(sqlx::query_as::<_, FileRecord>(
        "SELECT * FROM files WHERE page_id=? AND deleted_at IS NULL ORDER BY created_at DESC, id DESC",
    )
    .bind(page_id)
    .fetch_all(db_pool)
    .await?)
}

pub async fn soft_delete(db_pool: &SqlitePool, id: Uuid) -> AppResult<()> {
    sqlx::query("UPDATE files SET deleted_at=? WHERE id=?")
        .bind(OffsetDateTime::now_utc())
        .bind(id)
        .execute(db_pool)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(size: i64, mime_type: &str) -> FileRecord {
        FileRecord {
            id: Uuid::now_v7(),
            mod_id: Uuid::now_v7(),
            page_id: None,
            original_name: "a".into(),
            filename: "a".into(),
            path: "a".into(),
            mime_type: mime_type.into(),
            size,
            storage_driver: StorageDriver::Local,
            url: None,
            uploaded_by: Uuid::now_v7(),
            created_at: OffsetDateTime::now_utc(),
            deleted_at: None,
        }
    }

    #[test]
    fn human_sizes() {
        assert_eq!(record(512, "text/plain").human_size(), "512 B");
        assert_eq!(record(1024, "text/plain").human_size(), "1024 B");
        assert_eq!(record(1536, "text/plain").human_size(), "1.5 KB");
        assert_eq!(record(10 * 1024 * 1024 + 1, "text/plain").human_size(), "10 MB");
    }

    #[test]
    fn kinds() {
        assert!(record(1, "image/png").is_image());
        assert!(!record(1, "image/png").is_document());
        assert!(record(1, "application/pdf").is_document());
        assert!(!record(1, "text/markdown").is_document());
    }
}

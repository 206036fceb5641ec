mod delete;
mod disk;
mod model;
mod show;
mod upload;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{AppState, mods::StorageDriver};

pub use disk::{Disk, Disks, LocalDisk, S3Disk};
pub use model::*;
pub use upload::QUICK_UPLOAD_TYPES;

pub fn router() -> Router<AppState> {
    // uploads enforce MAX_UPLOAD_KB themselves, per file
    Router::new()
        .route(
            "/{slug}/files",
            get(show::files).post(upload::upload_file).layer(DefaultBodyLimit::disable()),
        )
        .route(
            "/{slug}/files/quick-upload",
            post(upload::quick_upload).layer(DefaultBodyLimit::disable()),
        )
        .route("/{slug}/files/{id}", get(show::show_file).delete(delete::delete_file))
        .route("/{slug}/files/{id}/download", get(show::download))
        .route("/{slug}/pages/{page_slug}/files", get(show::page_files))
}

/// A file record as the API hands it out.
#[derive(Debug, Serialize)]
pub struct FileView {
    pub id: Uuid,
    pub page_id: Option<Uuid>,
    pub original_name: String,
    pub mime_type: String,
    pub size: i64,
    pub human_size: String,
    pub is_image: bool,
    pub is_document: bool,
    pub storage_driver: StorageDriver,
    pub url: Option<String>,
    pub uploaded_by: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<&FileRecord> for FileView {
    fn from(file: &FileRecord) -> Self {
        Self {
            id: file.id,
            page_id: file.page_id,
            original_name: file.original_name.clone(),
            mime_type: file.mime_type.clone(),
            size: file.size,
            human_size: file.human_size(),
            is_image: file.is_image(),
            is_document: file.is_document(),
            storage_driver: file.storage_driver,
            url: file.url.clone(),
            uploaded_by: file.uploaded_by,
            created_at: file.created_at,
        }
    }
}

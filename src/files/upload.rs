use std::{path::Path as FsPath, sync::Arc};

use axum::{
    Json, debug_handler,
    extract::{Multipart, Path, State},
    http::StatusCode,
};
use serde_json::{Value, json};
use sqlx::SqlitePool;
use time::OffsetDateTime;
use tower_sessions::Session;
use uuid::Uuid;

use crate::{
    AppError, AppResult, Config,
    access::{Access, Permission},
    mods::{self, Workspace},
    pages, session,
    users::User,
};

use super::{Disks, FileRecord};

/// What the editor's drag-and-drop may upload.
pub const QUICK_UPLOAD_TYPES: [&str; 9] = [
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/webp",
    "application/pdf",
    "text/plain",
    "text/markdown",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
];

struct Upload {
    original_name: String,
    mime_type: String,
    bytes: Vec<u8>,
    page_id: Option<Uuid>,
}

/// Prefers the type implied by the file name over what the client declared.
pub(crate) fn detect_mime(original_name: &str, declared: Option<&str>) -> String {
    mime_guess::from_path(original_name)
        .first()
        .map(|mime| mime.essence_str().to_owned())
        .or_else(|| declared.filter(|declared| !declared.is_empty()).map(str::to_owned))
        .unwrap_or_else(|| "application/octet-stream".to_owned())
}

/// `{uuid}.{ext}`, keeping only an alphanumeric extension of the original name.
pub(crate) fn stored_name(id: Uuid, original_name: &str) -> String {
    let ext = FsPath::new(original_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(str::to_ascii_lowercase);
    match ext {
        Some(ext) => format!("{id}.{ext}"),
        None => id.to_string(),
    }
}

async fn receive(mut multipart: Multipart, max_bytes: u64) -> AppResult<Upload> {
    let mut file = None;
    let mut page_id = None;

    while let Some(mut field) = multipart.next_field().await? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("file") => {
                let original_name = field.file_name().unwrap_or("upload").to_owned();
                let mime_type = detect_mime(&original_name, field.content_type());
                let mut bytes = Vec::new();
                while let Some(chunk) = field.chunk().await? {
                    bytes.extend_from_slice(&chunk);
                    if bytes.len() as u64 > max_bytes {
                        return Err(AppError::field(
                            "file",
                            format!("The file may not be greater than {} kilobytes.", max_bytes / 1024),
                        ));
                    }
                }
                file = Some((original_name, mime_type, bytes));
            }
            Some("page_id") => {
                let raw = field.text().await?;
                let raw = raw.trim();
                if !raw.is_empty() {
                    let id = raw
                        .parse::<Uuid>()
                        .map_err(|_| AppError::field("page_id", "The page id must be a valid UUID."))?;
                    page_id = Some(id);
                }
            }
            _ => {}
        }
    }

    let Some((original_name, mime_type, bytes)) = file else {
        return Err(AppError::field("file", "The file field is required."));
    };
    Ok(Upload { original_name, mime_type, bytes, page_id })
}

async fn store(
    db_pool: &SqlitePool,
    disks: &Disks,
    config: &Config,
    workspace: &Workspace,
    user: &User,
    upload: Upload,
) -> AppResult<FileRecord> {
    if let Some(page_id) = upload.page_id {
        match pages::find(db_pool, page_id).await? {
            Some(page) if page.mod_id == workspace.id => {}
            _ => return Err(AppError::field("page_id", "Page must belong to the same mod.")),
        }
    }

    let id = Uuid::now_v7();
    let filename = stored_name(id, &upload.original_name);
    let path = format!("mods/{}/files/{filename}", workspace.id);
    let disk = disks.disk(workspace.storage_driver)?;
    let size = upload.bytes.len() as i64;
    disk.put(&path, upload.bytes, &upload.mime_type).await?;

    let url = disk
        .public_url(&path)
        .unwrap_or_else(|| config.url(&format!("/mods/{}/files/{id}/download", workspace.slug)));
    let record = FileRecord {
        id,
        mod_id: workspace.id,
        page_id: upload.page_id,
        original_name: upload.original_name,
        filename,
        path,
        mime_type: upload.mime_type,
        size,
        storage_driver: workspace.storage_driver,
        url: Some(url),
        uploaded_by: user.id,
        created_at: OffsetDateTime::now_utc(),
        deleted_at: None,
    };
    super::insert(db_pool, &record).await?;

    tracing::info!("@{} uploaded {} ({}) to {}", user.username, record.original_name, record.human_size(), workspace.slug);
    Ok(record)
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn upload_file(
    Path(slug): Path<String>,
    State(db_pool): State<SqlitePool>,
    State(disks): State<Disks>,
    State(config): State<Arc<Config>>,
    session: Session,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<Value>)> {
    let user = session::require_user(&session, &db_pool, &format!("/mods/{slug}/files")).await?;
    let workspace = mods::get_by_slug(&db_pool, &slug).await?;
    Access::resolve(&db_pool, &workspace, Some(&user)).await?.ensure(Permission::Edit)?;

    let upload = receive(multipart, config.max_upload_bytes).await?;
    let record = store(&db_pool, &disks, &config, &workspace, &user, upload).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "file": super::FileView::from(&record),
            "message": "File uploaded successfully!",
        })),
    ))
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn quick_upload(
    Path(slug): Path<String>,
    State(db_pool): State<SqlitePool>,
    State(disks): State<Disks>,
    State(config): State<Arc<Config>>,
    session: Session,
    multipart: Multipart,
) -> AppResult<Json<Value>> {
    let user = session::require_user(&session, &db_pool, &format!("/mods/{slug}/files")).await?;
    let workspace = mods::get_by_slug(&db_pool, &slug).await?;
    Access::resolve(&db_pool, &workspace, Some(&user)).await?.ensure(Permission::Edit)?;

    let upload = receive(multipart, config.max_upload_bytes).await?;
    if !QUICK_UPLOAD_TYPES.contains(&upload.mime_type.as_str()) {
        return Err(AppError::field("file", "File type not allowed."));
    }
    let record = store(&db_pool, &disks, &config, &workspace, &user, upload).await?;

    Ok(Json(json!({
        "success": true,
        "file": {
            "id": record.id,
            "url": record.url,
            "original_name": record.original_name,
            "mime_type": record.mime_type,
            "size": record.human_size(),
            "is_image": record.is_image(),
        },
        "message": "File uploaded successfully!",
    })))
}

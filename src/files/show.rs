use axum::{
    Json, debug_handler,
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::{Value, json};
use sqlx::SqlitePool;
use time::format_description;
use tower_sessions::Session;
use uuid::Uuid;

use crate::{
    AppError, AppResult,
    access::{Access, Permission},
    mods, pages, session,
};

use super::{Disks, FileView, PER_PAGE};

#[derive(Debug, Deserialize)]
pub(crate) struct ListQuery {
    page: Option<i64>,
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn files(
    Path(slug): Path<String>,
    Query(ListQuery { page }): Query<ListQuery>,
    State(db_pool): State<SqlitePool>,
    session: Session,
) -> AppResult<Json<Value>> {
    let user = session::current_user(&session, &db_pool).await?;
    let workspace = mods::get_by_slug(&db_pool, &slug).await?;
    let access = Access::resolve(&db_pool, &workspace, user.as_ref()).await?;
    access.ensure_view()?;

    let current_page = page.unwrap_or(1).max(1);
    let (records, total) = super::paginate(&db_pool, workspace.id, current_page).await?;
    let files: Vec<FileView> = records.iter().map(FileView::from).collect();

    Ok(Json(json!({
        "mod": workspace,
        "files": {
            "data": files,
            "current_page": current_page,
            "per_page": PER_PAGE,
            "total": total,
            "last_page": ((total + PER_PAGE - 1) / PER_PAGE).max(1),
        },
        "can_edit": access.can(Permission::Edit),
    })))
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn show_file(
    Path((slug, id)): Path<(String, Uuid)>,
    State(db_pool): State<SqlitePool>,
    session: Session,
) -> AppResult<Json<Value>> {
    let user = session::current_user(&session, &db_pool).await?;
    let workspace = mods::get_by_slug(&db_pool, &slug).await?;
    let file = super::get_in(&db_pool, workspace.id, id).await?;
    let access = Access::resolve(&db_pool, &workspace, user.as_ref()).await?;
    access.ensure_view()?;

    // Unpublished pages stay hidden from callers who cannot edit them.
    let page = match file.page_id {
        Some(page_id) => pages::find(&db_pool, page_id)
            .await?
            .filter(|page| page.published || access.can(Permission::Edit)),
        None => None,
    };

    Ok(Json(json!({
        "mod": workspace,
        "file": FileView::from(&file),
        "page": page.map(|page| json!({ "id": page.id, "title": page.title, "slug": page.slug })),
        "user_role": access.role,
    })))
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn download(
    Path((slug, id)): Path<(String, Uuid)>,
    State(db_pool): State<SqlitePool>,
    State(disks): State<Disks>,
    session: Session,
) -> AppResult<Response> {
    let user = session::current_user(&session, &db_pool).await?;
    let workspace = mods::get_by_slug(&db_pool, &slug).await?;
    let file = super::get_in(&db_pool, workspace.id, id).await?;
    Access::resolve(&db_pool, &workspace, user.as_ref()).await?.ensure_view()?;

    let Some(bytes) = disks.disk(file.storage_driver)?.get(&file.path).await? else {
        tracing::warn!("{} is missing from {:?} storage", file.path, file.storage_driver);
        return Err(AppError::NotFound("stored file"));
    };

    let disposition = format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        ascii_name(&file.original_name),
        urlencoding::encode(&file.original_name),
    );
    Ok((
        [
            (header::CONTENT_TYPE, file.mime_type.clone()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}

/// Fallback `filename=` for clients that ignore `filename*`.
fn ascii_name(name: &str) -> String {
    name.chars()
        .map(|c| if (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ' { c } else { '_' })
        .collect()
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn page_files(
    Path((slug, page_slug)): Path<(String, String)>,
    State(db_pool): State<SqlitePool>,
    session: Session,
) -> AppResult<Json<Value>> {
    let user = session::current_user(&session, &db_pool).await?;
    let (_, access, page) = pages::locate(&db_pool, &slug, &page_slug, user.as_ref()).await?;
    pages::ensure_readable(&access, &page)?;

    let short_date = format_description::parse("[month repr:short] [day padding:none], [year]")
        .map_err(anyhow::Error::from)?;
    let mut files = Vec::new();
    for file in super::attached_to(&db_pool, page.id).await? {
        files.push(json!({
            "id": file.id,
            "original_name": file.original_name,
            "url": file.url,
            "mime_type": file.mime_type,
            "size": file.human_size(),
            "is_image": file.is_image(),
            "uploaded_at": file.created_at.format(&short_date).map_err(anyhow::Error::from)?,
        }));
    }

    Ok(Json(json!({ "files": files })))
}

#[cfg(test)]
mod tests {
    use super::ascii_name;

    #[test]
    fn disposition_fallback_is_plain_ascii() {
        assert_eq!(ascii_name("report final.pdf"), "report final.pdf");
        assert_eq!(ascii_name("naïve \"x\".txt"), "na_ve _x_.txt");
    }
}

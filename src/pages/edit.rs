use axum::{Json, debug_handler, extract::{Path, State}};
use serde_json::{Value, json};
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{AppResult, access::Permission, session};

use super::{PageChanges, PageForm};

/// `title` is always required; the other fields keep their current value when left out.
#[debug_handler(state = crate::AppState)]
pub(crate) async fn update_page(
    Path((slug, page_slug)): Path<(String, String)>,
    State(db_pool): State<SqlitePool>,
    session: Session,
    Json(form): Json<PageForm>,
) -> AppResult<Json<Value>> {
    let user = session::require_user(&session, &db_pool, &format!("/mods/{slug}/pages/{page_slug}")).await?;
    let (workspace, access, page) = super::locate(&db_pool, &slug, &page_slug, Some(&user)).await?;
    access.ensure(Permission::Edit)?;

    let title = form.validated_title()?;
    let changes = PageChanges {
        parent_id: form.parent_id.unwrap_or(page.parent_id),
        title,
        content: form.content.unwrap_or_else(|| page.content.clone()),
        is_index: form.is_index.unwrap_or(page.is_index),
        published: form.published.unwrap_or(page.published),
        editor: user.id,
    };
    let page = super::update(&db_pool, page, changes).await?;

    tracing::info!("@{} updated page {}/{}", user.username, workspace.slug, page.slug);
    Ok(Json(json!({ "message": "Page updated successfully!", "page": page })))
}

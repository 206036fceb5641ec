use axum::{Json, debug_handler, extract::{Path, State}};
use serde_json::{Value, json};
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{AppResult, access::Permission, session};

#[debug_handler(state = crate::AppState)]
pub(crate) async fn delete_page(
    Path((slug, page_slug)): Path<(String, String)>,
    State(db_pool): State<SqlitePool>,
    session: Session,
) -> AppResult<Json<Value>> {
    let user = session::require_user(&session, &db_pool, &format!("/mods/{slug}/pages/{page_slug}")).await?;
    let (workspace, access, page) = super::locate(&db_pool, &slug, &page_slug, Some(&user)).await?;
    access.ensure(Permission::Edit)?;

    let deleted = super::delete_subtree(&db_pool, &page).await?;

    tracing::info!("@{} deleted {deleted} page(s) under {}/{}", user.username, workspace.slug, page.slug);
    Ok(Json(json!({ "message": "Page deleted successfully!", "deleted": deleted })))
}

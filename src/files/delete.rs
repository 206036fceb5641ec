use axum::{Json, debug_handler, extract::{Path, State}};
use serde_json::{Value, json};
use sqlx::SqlitePool;
use tower_sessions::Session;
use uuid::Uuid;

use crate::{
    AppResult,
    access::{Access, Permission},
    mods, session,
};

use super::Disks;

/// Removes the stored object first; the record is only marked deleted once that worked.
#[debug_handler(state = crate::AppState)]
pub(crate) async fn delete_file(
    Path((slug, id)): Path<(String, Uuid)>,
    State(db_pool): State<SqlitePool>,
    State(disks): State<Disks>,
    session: Session,
) -> AppResult<Json<Value>> {
    let user = session::require_user(&session, &db_pool, &format!("/mods/{slug}/files")).await?;
    let workspace = mods::get_by_slug(&db_pool, &slug).await?;
    let file = super::get_in(&db_pool, workspace.id, id).await?;
    Access::resolve(&db_pool, &workspace, Some(&user)).await?.ensure(Permission::Edit)?;

    disks.disk(file.storage_driver)?.delete(&file.path).await?;
    super::soft_delete(&db_pool, file.id).await?;

    tracing::info!("@{} deleted {} from {}", user.username, file.original_name, workspace.slug);
    Ok(Json(json!({ "success": true, "message": "File deleted successfully!" })))
}

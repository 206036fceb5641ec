use axum::{Json, debug_handler, extract::{Path, State}};
use serde_json::{Value, json};
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{
    AppResult,
    access::{Access, Permission},
    session,
};

/// Owner only. The row stays behind with `deleted_at` set, keeping its slug reserved.
#[debug_handler(state = crate::AppState)]
pub(crate) async fn delete_mod(
    Path(slug): Path<String>,
    State(db_pool): State<SqlitePool>,
    session: Session,
) -> AppResult<Json<Value>> {
    let user = session::require_user(&session, &db_pool, &format!("/mods/{slug}")).await?;
    let workspace = super::get_by_slug(&db_pool, &slug).await?;
    Access::resolve(&db_pool, &workspace, Some(&user)).await?.ensure(Permission::Delete)?;

    super::soft_delete(&db_pool, workspace.id).await?;

    tracing::info!("@{} deleted mod {}", user.username, workspace.slug);
    Ok(Json(json!({ "message": "Mod deleted successfully!" })))
}

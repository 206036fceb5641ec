use axum::{Json, debug_handler, extract::{Path, State}};
use serde_json::{Value, json};
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{
    AppResult,
    access::{Access, Permission},
    files::Disks,
    session,
};

use super::new::WorkspaceForm;

#[debug_handler(state = crate::AppState)]
pub(crate) async fn update_mod(
    Path(slug): Path<String>,
    State(db_pool): State<SqlitePool>,
    State(disks): State<Disks>,
    session: Session,
    Json(form): Json<WorkspaceForm>,
) -> AppResult<Json<Value>> {
    let user = session::require_user(&session, &db_pool, &format!("/mods/{slug}")).await?;
    let workspace = super::get_by_slug(&db_pool, &slug).await?;
    Access::resolve(&db_pool, &workspace, Some(&user)).await?.ensure(Permission::ManageSettings)?;

    let changes = form.validate(&disks)?;
    let workspace = super::update(&db_pool, workspace, changes).await?;

    tracing::info!("@{} updated settings of {}", user.username, workspace.slug);
    Ok(Json(json!({ "message": "Mod updated successfully!", "mod": workspace })))
}

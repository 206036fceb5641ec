use axum::{Json, debug_handler, extract::{Path, State}};
use serde_json::{Value, json};
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{
    AppError, AppResult,
    access::{Access, Permission},
    mods, session, users::{self, UserSummary},
};

#[debug_handler(state = crate::AppState)]
pub(crate) async fn collaborators(
    Path(slug): Path<String>,
    State(db_pool): State<SqlitePool>,
    session: Session,
) -> AppResult<Json<Value>> {
    let user = session::require_user(&session, &db_pool, &format!("/mods/{slug}/collaborators")).await?;
    let workspace = mods::get_by_slug(&db_pool, &slug).await?;
    Access::resolve(&db_pool, &workspace, Some(&user)).await?.ensure(Permission::ManageCollaborators)?;

    let owner = users::find(&db_pool, workspace.owner_id).await?.ok_or(AppError::NotFound("owner"))?;
    let members = super::members(&db_pool, workspace.id).await?;

    Ok(Json(json!({
        "mod": workspace,
        "owner": UserSummary::from(&owner),
        "collaborators": members,
        "can_manage": true,
    })))
}

use axum::{Json, debug_handler, extract::{Path, State}};
use serde::Deserialize;
use serde_json::{Value, json};
use sqlx::SqlitePool;
use time::OffsetDateTime;
use tower_sessions::Session;
use uuid::Uuid;

use crate::{
    AppError, AppResult,
    access::{self, Party, Permission},
    mods, session,
};

#[derive(Debug, Deserialize)]
pub(crate) struct RoleForm {
    #[serde(default)]
    role: String,
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn update_role(
    Path((slug, collaborator_id)): Path<(String, Uuid)>,
    State(db_pool): State<SqlitePool>,
    session: Session,
    Json(RoleForm { role }): Json<RoleForm>,
) -> AppResult<Json<Value>> {
    let user = session::require_user(&session, &db_pool, &format!("/mods/{slug}/collaborators")).await?;
    let workspace = mods::get_by_slug(&db_pool, &slug).await?;

    let actor = Party { user_id: user.id, role: access::role_of(&db_pool, &workspace, user.id).await? };
    if !actor.role.is_some_and(|role| role.can(Permission::ManageCollaborators)) {
        return Err(AppError::Forbidden);
    }
    let target = Party { user_id: collaborator_id, role: access::role_of(&db_pool, &workspace, collaborator_id).await? };

    let Some(new_role) = access::parse_member_role(&role) else {
        return Err(AppError::field("role", "The selected role is invalid."));
    };
    access::check_role_change(actor, target, new_role)?;
    if target.role.is_none() {
        return Err(AppError::NotFound("collaborator"));
    }

    sqlx::query("UPDATE mod_users SET role=?, updated_at=? WHERE mod_id=? AND user_id=?")
        .bind(new_role)
        .bind(OffsetDateTime::now_utc())
        .bind(workspace.id)
        .bind(collaborator_id)
        .execute(&db_pool)
        .await?;

    tracing::info!("@{} made {collaborator_id} {new_role} of {}", user.username, workspace.slug);
    Ok(Json(json!({ "message": "Collaborator role updated successfully!", "role": new_role })))
}

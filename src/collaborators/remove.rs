use axum::{Json, debug_handler, extract::{Path, State}};
use serde_json::{Value, json};
use sqlx::SqlitePool;
use tower_sessions::Session;
use uuid::Uuid;

use crate::{
    AppError, AppResult,
    access::{self, Party},
    invitations, mods, session,
};

#[debug_handler(state = crate::AppState)]
pub(crate) async fn remove_collaborator(
    Path((slug, collaborator_id)): Path<(String, Uuid)>,
    State(db_pool): State<SqlitePool>,
    session: Session,
) -> AppResult<Json<Value>> {
    let user = session::require_user(&session, &db_pool, &format!("/mods/{slug}/collaborators")).await?;
    let workspace = mods::get_by_slug(&db_pool, &slug).await?;

    let actor = Party { user_id: user.id, role: access::role_of(&db_pool, &workspace, user.id).await? };
    let target = Party { user_id: collaborator_id, role: access::role_of(&db_pool, &workspace, collaborator_id).await? };
    access::check_removal(actor, target)?;

    if target.role.is_none() {
        return Err(AppError::NotFound("collaborator"));
    }

    let mut tx = db_pool.begin().await?;
    sqlx::query("DELETE FROM mod_users WHERE mod_id=? AND user_id=?")
        .bind(workspace.id)
        .bind(collaborator_id)
        .execute(&mut *tx)
        .await?;
    invitations::delete_for(&mut *tx, workspace.id, collaborator_id).await?;
    tx.commit().await?;

    let message = if user.id == collaborator_id {
        tracing::info!("@{} left {}", user.username, workspace.slug);
        "You have left the mod successfully!"
    } else {
        tracing::info!("@{} removed {collaborator_id} from {}", user.username, workspace.slug);
        "Collaborator removed successfully!"
    };

    Ok(Json(json!({ "message": message })))
}

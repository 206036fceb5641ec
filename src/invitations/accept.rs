use axum::{Json, debug_handler, extract::{Path, State}};
use serde_json::{Value, json};
use sqlx::SqlitePool;
use time::OffsetDateTime;
use tower_sessions::Session;

use crate::{AppError, AppResult, mods, session};

use super::Acceptance;

#[debug_handler(state = crate::AppState)]
pub(crate) async fn accept_invitation(
    Path(token): Path<String>,
    State(db_pool): State<SqlitePool>,
    session: Session,
) -> AppResult<Json<Value>> {
    let user = session::require_user(&session, &db_pool, &format!("/invitations/{token}")).await?;
    let invitation = super::find_by_token(&db_pool, &token).await?.ok_or(AppError::NotFound("invitation"))?;
    if invitation.user_id != user.id {
        return Err(AppError::Forbidden);
    }
    let workspace = mods::find(&db_pool, invitation.mod_id).await?.ok_or(AppError::NotFound("mod"))?;

    let (acceptance, invitation) = super::accept(&db_pool, invitation, OffsetDateTime::now_utc()).await?;
    let message = match acceptance {
        Acceptance::AlreadyAccepted => "You are already a collaborator on this mod!".to_owned(),
        Acceptance::Grant => {
            tracing::info!("@{} accepted {} invitation to {}", user.username, invitation.role, workspace.slug);
            format!("Welcome to {}! You are now a {}.", workspace.name, invitation.role)
        }
    };

    Ok(Json(json!({
        "message": message,
        "mod": { "name": workspace.name, "slug": workspace.slug },
        "invitation": invitation,
    })))
}

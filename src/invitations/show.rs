use axum::{Json, debug_handler, extract::{Path, State}};
use serde_json::{Value, json};
use sqlx::SqlitePool;
use time::OffsetDateTime;
use tower_sessions::Session;

use crate::{AppError, AppResult, mods, session, users::{self, UserSummary}};

#[debug_handler(state = crate::AppState)]
pub(crate) async fn invitation(
    Path(token): Path<String>,
    State(db_pool): State<SqlitePool>,
    session: Session,
) -> AppResult<Json<Value>> {
    let invitation = super::find_by_token(&db_pool, &token).await?.ok_or(AppError::NotFound("invitation"))?;
    let workspace = mods::find(&db_pool, invitation.mod_id).await?.ok_or(AppError::NotFound("mod"))?;
    let inviter = users::find(&db_pool, invitation.invited_by).await?;
    let user = session::current_user(&session, &db_pool).await?;

    let status = invitation.status(OffsetDateTime::now_utc());
    let is_invitee = user.as_ref().is_some_and(|user| user.id == invitation.user_id);

    Ok(Json(json!({
        "invitation": invitation,
        "status": status,
        "mod": { "name": workspace.name, "slug": workspace.slug },
        "inviter": inviter.as_ref().map(UserSummary::from),
        "needs_login": user.is_none(),
        "wrong_user": user.is_some() && !is_invitee,
    })))
}

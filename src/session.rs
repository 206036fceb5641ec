use sqlx::SqlitePool;
use tower_sessions::Session;
use uuid::Uuid;

use crate::{AppError, AppResult, users::{self, User}};

pub const USER_ID: &str = "user_id";
pub const CSRF_STATE: &str = "csrf_state";
pub const PKCE_VERIFIER: &str = "pkce_verifier";
pub const RETURN_URL: &str = "return_url";

/// The signed-in user, if any. A session pointing at a vanished user counts as signed out.
pub async fn current_user(session: &Session, db_pool: &SqlitePool) -> AppResult<Option<User>> {
    let Some(user_id) = session.get::<Uuid>(USER_ID).await? else {
        return Ok(None);
    };
    users::find(db_pool, user_id).await
}

/// Like [`current_user`], but bounces anonymous callers to the login page.
pub async fn require_user(session: &Session, db_pool: &SqlitePool, return_url: &str) -> AppResult<User> {
    current_user(session, db_pool)
        .await?
        .ok_or_else(|| AppError::Unauthenticated { return_url: Some(return_url.to_owned()) })
}

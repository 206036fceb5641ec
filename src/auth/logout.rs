use axum::{debug_handler, extract::Query, response::Redirect};
use serde::Deserialize;
use tower_sessions::Session;

use crate::AppResult;

use super::safe_return_url;

#[derive(Deserialize)]
pub(crate) struct LogoutQuery {
    pub(crate) return_url: Option<String>,
}

#[debug_handler]
pub(crate) async fn logout(
    Query(LogoutQuery { return_url }): Query<LogoutQuery>,
    session: Session
) -> AppResult<Redirect> {
    session.flush().await?;
    Ok(Redirect::to(return_url.as_deref().and_then(safe_return_url).unwrap_or("/login")))
}

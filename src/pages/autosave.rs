use axum::{Json, debug_handler, extract::{Path, State}};
use serde::Deserialize;
use serde_json::{Value, json};
use sqlx::SqlitePool;
use time::format_description::well_known::Rfc3339;
use tower_sessions::Session;

use crate::{AppError, AppResult, access::Permission, session};

#[derive(Debug, Deserialize)]
pub(crate) struct AutosaveForm {
    content: Option<String>,
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn autosave(
    Path((slug, page_slug)): Path<(String, String)>,
    State(db_pool): State<SqlitePool>,
    session: Session,
    Json(AutosaveForm { content }): Json<AutosaveForm>,
) -> AppResult<Json<Value>> {
    let user = session::require_user(&session, &db_pool, &format!("/mods/{slug}/pages/{page_slug}")).await?;
    let (_, access, page) = super::locate(&db_pool, &slug, &page_slug, Some(&user)).await?;
    access.ensure(Permission::Edit)?;

    let Some(content) = content else {
        return Err(AppError::field("content", "The content field is required."));
    };
    let updated_at = super::save_content(&db_pool, page.id, &content, user.id).await?;

    Ok(Json(json!({
        "success": true,
        "updated_at": updated_at.format(&Rfc3339).map_err(anyhow::Error::from)?,
    })))
}

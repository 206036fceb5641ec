use axum::{Json, debug_handler, extract::State};
use serde_json::{Value, json};
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{AppResult, pages, session};

const LATEST: usize = 5;

#[debug_handler(state = crate::AppState)]
pub async fn dashboard(
    State(db_pool): State<SqlitePool>,
    session: Session,
) -> AppResult<Json<Value>> {
    let user = session::require_user(&session, &db_pool, "/dashboard").await?;

    let owned = super::owned_by(&db_pool, user.id).await?;
    let collaborative = super::collaborating(&db_pool, user.id).await?;

    let mut latest_pages = Vec::new();
    for workspace in owned.iter().chain(&collaborative) {
        latest_pages.extend(pages::all_in(&db_pool, workspace.id).await?);
    }
    let total_pages = latest_pages.len();
    latest_pages.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    latest_pages.truncate(LATEST);

    let owned_count = owned.len();
    let collaborative_count = collaborative.len();
    let mut latest_mods: Vec<_> = owned.into_iter().chain(collaborative).collect();
    latest_mods.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    latest_mods.truncate(LATEST);

    Ok(Json(json!({
        "stats": {
            "owned_mods_count": owned_count,
            "collaborative_mods_count": collaborative_count,
            "total_pages_count": total_pages,
            "latest_pages": latest_pages,
            "latest_mods": latest_mods,
        }
    })))
}

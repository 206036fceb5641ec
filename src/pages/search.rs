use axum::{Json, debug_handler, extract::{Path, Query, State}};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use sqlx::SqlitePool;
use time::OffsetDateTime;
use tower_sessions::Session;
use uuid::Uuid;

use crate::{AppError, AppResult, access::Access, mods, session};

#[derive(Debug, Deserialize)]
pub(crate) struct SearchQuery {
    #[serde(default)]
    query: String,
}

#[derive(Serialize)]
struct Hit {
    id: Uuid,
    title: String,
    slug: String,
    #[serde(with = "time::serde::rfc3339")]
    updated_at: OffsetDateTime,
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn search_pages(
    Path(slug): Path<String>,
    Query(SearchQuery { query }): Query<SearchQuery>,
    State(db_pool): State<SqlitePool>,
    session: Session,
) -> AppResult<Json<Value>> {
    let user = session::current_user(&session, &db_pool).await?;
    let workspace = mods::get_by_slug(&db_pool, &slug).await?;
    Access::resolve(&db_pool, &workspace, user.as_ref()).await?.ensure_view()?;

    let query = query.trim();
    if query.chars().count() < 2 {
        return Err(AppError::field("query", "The query must be at least 2 characters."));
    }

    let hits: Vec<Hit> = super::search(&db_pool, workspace.id, query)
        .await?
        .into_iter()
        .map(|page| Hit { id: page.id, title: page.title, slug: page.slug, updated_at: page.updated_at })
        .collect();

    Ok(Json(json!({ "pages": hits })))
}

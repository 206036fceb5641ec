use axum::{Json, debug_handler, extract::{Path, State}, http::StatusCode};
use serde_json::{Value, json};
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{
    AppResult,
    access::{Access, Permission},
    mods, session,
};

use super::{NewPage, PageForm};

#[debug_handler(state = crate::AppState)]
pub(crate) async fn new_page(
    Path(slug): Path<String>,
    State(db_pool): State<SqlitePool>,
    session: Session,
    Json(form): Json<PageForm>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let user = session::require_user(&session, &db_pool, &format!("/mods/{slug}/pages")).await?;
    let workspace = mods::get_by_slug(&db_pool, &slug).await?;
    Access::resolve(&db_pool, &workspace, Some(&user)).await?.ensure(Permission::Edit)?;

    let title = form.validated_title()?;
    let page = super::create(&db_pool, NewPage {
        mod_id: workspace.id,
        parent_id: form.parent_id.flatten(),
        title,
        content: form.content.unwrap_or_default(),
        is_index: form.is_index.unwrap_or(false),
        published: form.published.unwrap_or(true),
        author: user.id,
    })
    .await?;

    tracing::info!("@{} created page {}/{}", user.username, workspace.slug, page.slug);
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Page created successfully!", "page": page })),
    ))
}

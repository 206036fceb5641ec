use axum::{Json, debug_handler, extract::{Path, State}, response::IntoResponse};
use serde::Serialize;
use serde_json::{Value, json};
use sqlx::SqlitePool;
use tower_sessions::Session;
use uuid::Uuid;

use crate::{AppResult, Markdown, access::Permission, session};

use super::tree::{self, PageIndex};

#[derive(Serialize)]
struct ChildPreview {
    id: Uuid,
    title: String,
    slug: String,
    content: String,
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn show_page(
    Path((slug, page_slug)): Path<(String, String)>,
    State(db_pool): State<SqlitePool>,
    session: Session,
) -> AppResult<Json<Value>> {
    let user = session::current_user(&session, &db_pool).await?;
    let (workspace, access, page) = super::locate(&db_pool, &slug, &page_slug, user.as_ref()).await?;
    super::ensure_readable(&access, &page)?;

    let all_pages = super::all_in(&db_pool, workspace.id).await?;
    let index = PageIndex::new(&all_pages);
    let children: Vec<ChildPreview> = tree::published_children(&all_pages, page.id)
        .into_iter()
        .map(|child| ChildPreview {
            id: child.id,
            title: child.title.clone(),
            slug: child.slug.clone(),
            content: child.excerpt(),
        })
        .collect();

    Ok(Json(json!({
        "mod": workspace,
        "path": index.path(&page),
        "depth": index.depth(&page),
        "children": children,
        "navigation": tree::navigation(&all_pages),
        "user_role": access.role,
        "can_edit": access.can(Permission::Edit),
        "page": page,
    })))
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn render_page(
    Path((slug, page_slug)): Path<(String, String)>,
    State(db_pool): State<SqlitePool>,
    session: Session,
) -> AppResult<impl IntoResponse> {
    let user = session::current_user(&session, &db_pool).await?;
    let (_, access, page) = super::locate(&db_pool, &slug, &page_slug, user.as_ref()).await?;
    super::ensure_readable(&access, &page)?;

    Ok(Markdown(page.content))
}

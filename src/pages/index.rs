use axum::{Json, debug_handler, extract::{Path, State}};
use serde_json::{Value, json};
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{
    AppResult,
    access::{Access, Permission},
    mods, session,
};

#[debug_handler(state = crate::AppState)]
pub(crate) async fn pages(
    Path(slug): Path<String>,
    State(db_pool): State<SqlitePool>,
    session: Session,
) -> AppResult<Json<Value>> {
    let user = session::current_user(&session, &db_pool).await?;
    let workspace = mods::get_by_slug(&db_pool, &slug).await?;
    let access = Access::resolve(&db_pool, &workspace, user.as_ref()).await?;
    access.ensure_view()?;

    let can_edit = access.can(Permission::Edit);
    let pages: Vec<_> = super::all_in(&db_pool, workspace.id)
        .await?
        .into_iter()
        .filter(|page| can_edit || page.published)
        .collect();

    Ok(Json(json!({
        "mod": workspace,
        "pages": pages,
        "user_role": access.role,
        "can_edit": can_edit,
    })))
}

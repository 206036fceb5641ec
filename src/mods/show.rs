use axum::{Json, debug_handler, extract::{Path, State}};
use serde_json::{Value, json};
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{
    AppError, AppResult,
    access::{Access, Permission},
    collaborators, pages, session,
    users::{self, UserSummary},
};

#[debug_handler(state = crate::AppState)]
pub(crate) async fn show_mod(
    Path(slug): Path<String>,
    State(db_pool): State<SqlitePool>,
    session: Session,
) -> AppResult<Json<Value>> {
    let user = session::current_user(&session, &db_pool).await?;
    let workspace = super::get_by_slug(&db_pool, &slug).await?;
    let access = Access::resolve(&db_pool, &workspace, user.as_ref()).await?;
    access.ensure_view()?;

    let owner = users::find(&db_pool, workspace.owner_id).await?.ok_or(AppError::NotFound("owner"))?;
    let members = collaborators::members(&db_pool, workspace.id).await?;
    let all_pages = pages::all_in(&db_pool, workspace.id).await?;
    let index_page = all_pages.iter().find(|page| page.is_index && page.published);

    Ok(Json(json!({
        "mod": workspace,
        "owner": UserSummary::from(&owner),
        "collaborators": members,
        "navigation": pages::tree::navigation(&all_pages),
        "index_page": index_page,
        "user_role": access.role,
        "can_edit": access.can(Permission::Edit),
        "can_manage": access.can(Permission::ManageCollaborators),
    })))
}

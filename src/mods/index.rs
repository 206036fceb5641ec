use axum::{Json, debug_handler, extract::State};
use serde::Serialize;
use serde_json::{Value, json};
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{AppResult, session, users};

use super::Workspace;

#[derive(Serialize)]
struct OwnedMod {
    #[serde(flatten)]
    workspace: Workspace,
    pages_count: i64,
    collaborators_count: i64,
}

#[derive(Serialize)]
struct CollaborativeMod {
    #[serde(flatten)]
    workspace: Workspace,
    owner_name: Option<String>,
    pages_count: i64,
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn mods(
    State(db_pool): State<SqlitePool>,
    session: Session,
) -> AppResult<Json<Value>> {
    let user = session::require_user(&session, &db_pool, "/mods").await?;

    let mut owned = Vec::new();
    for workspace in super::owned_by(&db_pool, user.id).await? {
        owned.push(OwnedMod {
            pages_count: super::page_count(&db_pool, workspace.id).await?,
            collaborators_count: super::collaborator_count(&db_pool, workspace.id).await?,
            workspace,
        });
    }

    let mut collaborative = Vec::new();
    for workspace in super::collaborating(&db_pool, user.id).await? {
        collaborative.push(CollaborativeMod {
            owner_name: users::find(&db_pool, workspace.owner_id).await?.map(|owner| owner.name),
            pages_count: super::page_count(&db_pool, workspace.id).await?,
            workspace,
        });
    }

    Ok(Json(json!({
        "owned_mods": owned,
        "collaborative_mods": collaborative,
    })))
}

use axum::{Json, debug_handler, extract::{Path, State}};
use serde::Deserialize;
use serde_json::{Value, json};
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{
    AppResult,
    access::{Access, Permission},
    error::FieldErrors,
    mods, session,
};

use super::OrderEntry;

#[derive(Debug, Deserialize)]
pub(crate) struct ReorderForm {
    #[serde(default)]
    pages: Vec<OrderEntry>,
}

fn validate(entries: &[OrderEntry]) -> AppResult<()> {
    let mut errors = FieldErrors::default();
    if entries.is_empty() {
        errors.add("pages", "The pages field is required.");
    }
    for (i, entry) in entries.iter().enumerate() {
        if entry.order_index < 0 {
            errors.add(&format!("pages.{i}.order_index"), "The order index must be at least 0.");
        }
    }
    errors.into_result()
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn reorder_pages(
    Path(slug): Path<String>,
    State(db_pool): State<SqlitePool>,
    session: Session,
    Json(ReorderForm { pages }): Json<ReorderForm>,
) -> AppResult<Json<Value>> {
    let user = session::require_user(&session, &db_pool, &format!("/mods/{slug}/pages")).await?;
    let workspace = mods::get_by_slug(&db_pool, &slug).await?;
    Access::resolve(&db_pool, &workspace, Some(&user)).await?.ensure(Permission::Edit)?;

    validate(&pages)?;
    let updated = super::reorder(&db_pool, workspace.id, &pages, user.id).await?;

    tracing::debug!("@{} reordered {updated} page(s) in {}", user.username, workspace.slug);
    Ok(Json(json!({ "message": "Page order updated successfully!", "updated": updated })))
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    fn entry(order_index: i64) -> OrderEntry {
        OrderEntry { id: Uuid::now_v7(), parent_id: None, order_index }
    }

    #[test]
    fn rejects_empty_and_negative() {
        assert!(validate(&[]).is_err());
        assert!(validate(&[entry(0), entry(-1)]).is_err());
        assert!(validate(&[entry(0), entry(3)]).is_ok());
    }
}

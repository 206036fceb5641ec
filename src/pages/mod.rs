mod autosave;
mod delete;
mod edit;
mod index;
mod model;
mod new;
mod reorder;
mod search;
mod show;
pub mod tree;

use axum::{Router, routing::{get, post}};
use serde::{Deserialize, Deserializer};
use sqlx::SqlitePool;

use crate::{
    AppError, AppResult, AppState,
    access::Access,
    error::FieldErrors,
    mods::{self, Workspace},
    users::User,
};

pub use model::*;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{slug}/pages", get(index::pages).post(new::new_page))
        .route("/{slug}/pages/search", get(search::search_pages))
        .route("/{slug}/pages/reorder", post(reorder::reorder_pages))
        .route(
            "/{slug}/pages/{page_slug}",
            get(show::show_page).patch(edit::update_page).delete(delete::delete_page),
        )
        .route("/{slug}/pages/{page_slug}/render", get(show::render_page))
        .route("/{slug}/pages/{page_slug}/autosave", post(autosave::autosave))
}

/// Looks up a page through its workspace, answering 404 for either.
pub async fn locate(
    db_pool: &SqlitePool,
    slug: &str,
    page_slug: &str,
    user: Option<&User>,
) -> AppResult<(Workspace, Access, Page)> {
    let workspace = mods::get_by_slug(db_pool, slug).await?;
    let page = get_by_slug(db_pool, workspace.id, page_slug).await?;
    let access = Access::resolve(db_pool, &workspace, user).await?;
    Ok((workspace, access, page))
}

/// Distinguishes an absent `parent_id` (keep) from an explicit `null` (move to root).
fn present<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Option<uuid::Uuid>>, D::Error> {
    Option::deserialize(deserializer).map(Some)
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct PageForm {
    #[serde(default)]
    title: String,
    content: Option<String>,
    #[serde(default, deserialize_with = "present")]
    parent_id: Option<Option<uuid::Uuid>>,
    is_index: Option<bool>,
    published: Option<bool>,
}

impl PageForm {
    fn validated_title(&self) -> AppResult<String> {
        let mut errors = FieldErrors::default();
        let title = self.title.trim();
        if title.is_empty() {
            errors.add("title", "The title field is required.");
        } else if title.chars().count() > 255 {
            errors.add("title", "The title may not be greater than 255 characters.");
        }
        errors.into_result()?;
        Ok(title.to_owned())
    }
}

/// Unpublished pages only exist for callers who may edit them.
pub(crate) fn ensure_readable(access: &Access, page: &Page) -> AppResult<()> {
    access.ensure_view()?;
    if !page.published && !access.can(crate::access::Permission::Edit) {
        return Err(AppError::NotFound("page"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parent_id_absent_vs_null() {
        let absent: PageForm = serde_json::from_str(r#"{"title":"A"}"#).unwrap();
        assert_eq!(absent.parent_id, None);

        let null: PageForm = serde_json::from_str(r#"{"title":"A","parent_id":null}"#).unwrap();
        assert_eq!(null.parent_id, Some(None));
    }

    #[test]
    fn title_rules() {
        let blank = PageForm { title: "   ".into(), ..Default::default() };
        assert!(matches!(blank.validated_title(), Err(AppError::Validation(_))));

        let long = PageForm { title: "x".repeat(256), ..Default::default() };
        assert!(long.validated_title().is_err());

        let ok = PageForm { title: "  Getting Started ".into(), ..Default::default() };
        assert_eq!(ok.validated_title().unwrap(), "Getting Started");
    }
}

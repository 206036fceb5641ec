use axum::{debug_handler, extract::{Path, State}, response::{Html, IntoResponse, Response}};
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{
    AppResult, include_res, mods, render_markdown,
    access::Access,
    pages::{self, Page},
    res::{self, escape_html, fill},
    session, users,
};

#[debug_handler(state = crate::AppState)]
pub(crate) async fn docs_mod(
    Path(slug): Path<String>,
    State(db_pool): State<SqlitePool>,
    session: Session,
) -> AppResult<Response> {
    let sorry = res::sorry("documentation");

    let Some(workspace) = mods::find_by_slug(&db_pool, &slug).await? else {
        return sorry;
    };
    let user = session::current_user(&session, &db_pool).await?;
    if !Access::resolve(&db_pool, &workspace, user.as_ref()).await?.can_view() {
        return sorry;
    }

    let all_pages = pages::all_in(&db_pool, workspace.id).await?;
    let mut roots: Vec<&Page> = all_pages
        .iter()
        .filter(|page| page.published && page.parent_id.is_none())
        .collect();
    roots.sort_by_key(|page| page.order_index);

    let index_page = all_pages
        .iter()
        .find(|page| page.is_index && page.published)
        .map(|page| render_markdown(&page.content))
        .unwrap_or_default();
    let owner = users::find(&db_pool, workspace.owner_id)
        .await?
        .map(|owner| owner.name)
        .unwrap_or_default();

    let body = fill(
        include_res!(str, "/pages/docs/mod.html"),
        &[
            ("mod_name", escape_html(&workspace.name).as_str()),
            ("description", escape_html(workspace.description.as_deref().unwrap_or_default()).as_str()),
            ("owner", escape_html(&owner).as_str()),
            ("index_page", index_page.as_str()),
            ("contents", super::children_html(&workspace.slug, &roots).as_str()),
        ],
    );
    let nav = super::nav_html(&workspace.slug, &pages::tree::navigation(&all_pages));

    Ok(Html(super::layout(&workspace.name, &workspace.slug, &workspace.name, &nav, &body)).into_response())
}

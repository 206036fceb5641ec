use axum::{debug_handler, extract::{Path, State}, response::{Html, IntoResponse, Response}};
use sqlx::SqlitePool;
use time::format_description::well_known::Rfc2822;
use tower_sessions::Session;

use crate::{
    AppResult, include_res, mods, render_markdown,
    access::Access,
    pages::{self, tree::{self, PageIndex}},
    res::{self, escape_html, fill},
    session,
};

#[debug_handler(state = crate::AppState)]
pub(crate) async fn docs_page(
    Path((slug, page_slug)): Path<(String, String)>,
    State(db_pool): State<SqlitePool>,
    session: Session,
) -> AppResult<Response> {
    let sorry = res::sorry("page");

    let Some(workspace) = mods::find_by_slug(&db_pool, &slug).await? else {
        return sorry;
    };
    let Some(page) = pages::find_by_slug(&db_pool, workspace.id, &page_slug).await? else {
        return sorry;
    };
    let user = session::current_user(&session, &db_pool).await?;
    if !page.published || !Access::resolve(&db_pool, &workspace, user.as_ref()).await?.can_view() {
        return sorry;
    }

    let all_pages = pages::all_in(&db_pool, workspace.id).await?;
    let index = PageIndex::new(&all_pages);

    let crumbs = index
        .path(&page)
        .iter()
        .map(|crumb| {
            format!(
                r#"<a href="/docs/{}/{}">{}</a>"#,
                workspace.slug,
                crumb.slug,
                escape_html(&crumb.title)
            )
        })
        .collect::<Vec<_>>()
        .join(" / ");

    let children = tree::published_children(&all_pages, page.id);
    let children = if children.is_empty() {
        String::new()
    } else {
        format!("<h2>In this section</h2><ul>{}</ul>", super::children_html(&workspace.slug, &children))
    };
    let updated_at = page.updated_at.format(&Rfc2822).map_err(anyhow::Error::from)?;

    let body = fill(
        include_res!(str, "/pages/docs/page.html"),
        &[
            ("crumbs", crumbs.as_str()),
            ("title", escape_html(&page.title).as_str()),
            ("updated_at", updated_at.as_str()),
            ("content", render_markdown(&page.content).as_str()),
            ("children", children.as_str()),
        ],
    );
    let nav = super::nav_html(&workspace.slug, &tree::navigation(&all_pages));

    Ok(Html(super::layout(
        &format!("{} · {}", page.title, workspace.name),
        &workspace.slug,
        &workspace.name,
        &nav,
        &body,
    ))
    .into_response())
}

//! The public, read-only documentation site.
//!
//! Server-rendered HTML. Anything the caller may not see answers with the same 404 page a
//! missing workspace would, so private workspaces do not leak their existence.

mod page;
mod space;

use axum::{Router, routing::get};

use crate::{
    AppState, include_res,
    pages::{Page, tree::NavItem},
    res::{escape_html, fill},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{slug}", get(space::docs_mod))
        .route("/{slug}/{page_slug}", get(page::docs_page))
}

fn nav_link(mod_slug: &str, slug: &str, title: &str, children: &str) -> String {
    fill(
        include_res!(str, "/pages/docs/nav_item.html"),
        &[
            ("mod_slug", mod_slug),
            ("slug", slug),
            ("title", escape_html(title).as_str()),
            ("children", children),
        ],
    )
}

fn nav_html(mod_slug: &str, navigation: &[NavItem]) -> String {
    let mut html = String::new();
    for item in navigation {
        let children: String = item
            .children
            .iter()
            .map(|child| nav_link(mod_slug, &child.slug, &child.title, ""))
            .collect();
        html += &nav_link(mod_slug, &item.slug, &item.title, &children);
    }
    html
}

fn children_html(mod_slug: &str, children: &[&Page]) -> String {
    let mut html = String::new();
    for child in children {
        html += &fill(
            include_res!(str, "/pages/docs/child.html"),
            &[
                ("mod_slug", mod_slug),
                ("slug", child.slug.as_str()),
                ("title", escape_html(&child.title).as_str()),
                ("excerpt", escape_html(&child.excerpt()).as_str()),
            ],
        );
    }
    html
}

fn layout(title: &str, mod_slug: &str, mod_name: &str, nav: &str, body: &str) -> String {
    fill(
        include_res!(str, "/pages/docs/layout.html"),
        &[
            ("title", escape_html(title).as_str()),
            ("mod_slug", mod_slug),
            ("mod_name", escape_html(mod_name).as_str()),
            ("nav", nav),
            ("body", body),
        ],
    )
}

pub mod access;
pub mod auth;
pub mod collaborators;
pub mod config;
pub mod db;
pub mod docs;
pub mod error;
pub mod files;
pub mod invitations;
pub mod mail;
pub mod mods;
pub mod pages;
pub mod res;
pub mod session;
pub mod slug;
pub mod users;

use std::{ops::Deref, sync::Arc};

use axum::{
    Router, debug_handler,
    extract::{FromRef, State},
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
};
use serde_json::Value;
use sqlx::SqlitePool;
use tower_http::trace::TraceLayer;
use tower_sessions::{Expiry, MemoryStore, Session, SessionManagerLayer, cookie::SameSite};

pub use config::Config;
pub use error::{AppError, AppResult};

#[derive(Clone, FromRef)]
pub struct AppState {
    pub db_pool: SqlitePool,
    pub clients: auth::Clients,
    pub config: Arc<Config>,
    pub mailer: Arc<dyn mail::Mailer>,
    pub disks: files::Disks,
}

pub trait GetField {
    fn get_str_field(&self, field: &str) -> AppResult<String>;
    fn get_obj_field(&self, field: &str) -> AppResult<&Value>;
}

impl GetField for serde_json::Value {
    fn get_str_field(&self, field: &str) -> AppResult<String> {
        Ok(
            self.get(field)
            .ok_or(format!("expected {field} in {self}"))?
            .as_str()
            .ok_or(format!("expected {field} in {self} to be string"))?
            .to_owned()
        )
    }

    fn get_obj_field(&self, field: &str) -> AppResult<&Value> {
        self.get(field)
        .ok_or(format!("expected {field} in {self}").into())
    }
}

/// Page content is author-supplied, so raw HTML in it is shown as text.
pub fn render_markdown(markdown: &str) -> String {
    use pulldown_cmark::{Event, Options, Parser};

    let options = Options::ENABLE_TABLES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_MATH;
    let parser = Parser::new_ext(markdown, options).map(|event| match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        _ => event,
    });

    let mut html_output = String::new();
    pulldown_cmark::html::push_html(&mut html_output, parser);
    html_output
}

pub struct Markdown<T>(pub T);

impl<T> IntoResponse for Markdown<T>
where
    T: Deref<Target = str>
{
    fn into_response(self) -> Response {
        Html(render_markdown(&self.0)).into_response()
    }
}

#[debug_handler(state = AppState)]
async fn home(
    State(db_pool): State<SqlitePool>,
    session: Session,
) -> AppResult<Redirect> {
    match session::current_user(&session, &db_pool).await? {
        Some(_) => Ok(Redirect::to("/mods")),
        None => Ok(Redirect::to("/login")),
    }
}

/// Every route, without state or session layer.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(home))
        .route("/dashboard", get(mods::dashboard))
        .nest("/mods", mods::router())
        .nest("/invitations", invitations::router())
        .nest("/docs", docs::router())
        .merge(auth::router())
}

pub fn session_layer(ttl_minutes: i64) -> SessionManagerLayer<MemoryStore> {
    SessionManagerLayer::new(MemoryStore::default())
        .with_secure(false)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::minutes(ttl_minutes)))
}

pub fn app(app_state: AppState) -> Router {
    let ttl_minutes = app_state.config.session_ttl_minutes;
    router()
        .with_state(app_state)
        .layer(session_layer(ttl_minutes))
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markdown_escapes_raw_html() {
        let html = render_markdown("# Hi\n\n<script>alert(1)</script>\n\n| a | b |\n|---|---|\n| 1 | 2 |\n\n~~old~~");
        assert!(html.contains("<h1>Hi</h1>"));
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("<table>"));
        assert!(html.contains("<del>old</del>"));
    }

    #[test]
    fn get_field() {
        let json = serde_json::json!({ "name": "Ada", "id": 3 });
        assert_eq!(json.get_str_field("name").unwrap(), "Ada");
        assert!(json.get_str_field("id").is_err());
        assert!(json.get_obj_field("missing").is_err());
    }
}

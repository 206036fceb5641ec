mod clients;
mod login;
mod lockin;
mod logout;

use axum::{Router, routing::get};

use crate::AppState;

pub use clients::{ClientProvider, Clients};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", get(login::login_page))
        .route("/login/{provider}", get(login::login))
        .route("/lockin/{provider}", get(lockin::lockin))
        .route("/logout", get(logout::logout))
}

/// Only same-site paths are followed after sign-in or sign-out.
pub(crate) fn safe_return_url(url: &str) -> Option<&str> {
    let local = url.starts_with('/') && !url.starts_with("//") && !url.starts_with("/\\");
    local.then_some(url)
}

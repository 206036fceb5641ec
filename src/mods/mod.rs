mod dashboard;
mod delete;
mod edit;
mod index;
mod model;
mod new;
mod show;

use axum::{Router, routing::get};

use crate::AppState;

pub use dashboard::dashboard;
pub use model::*;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index::mods).post(new::new_mod))
        .route("/{slug}", get(show::show_mod).patch(edit::update_mod).delete(delete::delete_mod))
        .merge(crate::pages::router())
        .merge(crate::files::router())
        .merge(crate::collaborators::router())
}

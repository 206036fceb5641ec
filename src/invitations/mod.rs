mod accept;
mod model;
mod show;

use axum::{Router, routing::{get, post}};

use crate::AppState;

pub use model::*;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{token}", get(show::invitation))
        .route("/{token}/accept", post(accept::accept_invitation))
}

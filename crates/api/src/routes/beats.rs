//! Storefront routes mounted at `/beats`.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::beats;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(beats::list_beats))
        .route("/{id}", get(beats::get_beat))
        .route("/{id}/play", post(beats::record_play))
}

//! Download routes for account grants and guest links.

use axum::routing::get;
use axum::Router;

use crate::handlers::downloads;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/downloads", get(downloads::list_my_downloads))
        .route("/downloads/{id}/{kind}", get(downloads::sign_download))
        .route(
            "/guest-downloads/{token}",
            get(downloads::get_guest_order).post(downloads::consume_guest_download),
        )
}

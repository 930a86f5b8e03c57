//! Admin routes mounted at `/admin`. Every handler requires [`RequireAdmin`].
//!
//! [`RequireAdmin`]: crate::middleware::rbac::RequireAdmin

use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use axum::Router;

use crate::handlers::{admin_beats, orders};
use crate::state::AppState;

/// Largest accepted beat upload (all five files together).
pub const MAX_BEAT_UPLOAD_BYTES: usize = 1024 * 1024 * 1024;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/beats",
            get(admin_beats::list_beats)
                .post(admin_beats::create_beat)
                .layer(DefaultBodyLimit::max(MAX_BEAT_UPLOAD_BYTES)),
        )
        .route(
            "/beats/{id}",
            get(admin_beats::get_beat)
                .put(admin_beats::update_beat)
                .delete(admin_beats::delete_beat),
        )
        .route("/orders", get(orders::admin_list_orders))
        .route("/orders/{id}", get(orders::admin_get_order))
}

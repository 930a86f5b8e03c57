pub mod admin;
pub mod auth;
pub mod beats;
pub mod downloads;
pub mod health;

use axum::routing::{get, post};
use axum::Router;

use crate::handlers;
use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /auth/register                       register (public)
/// /auth/login                          login (public)
/// /auth/refresh                        refresh (public)
/// /auth/logout                         logout (auth)
/// /auth/me                             current user (auth)
///
/// /beats                               storefront listing
/// /beats/{id}                          storefront detail
/// /beats/{id}/play                     count a preview play (POST)
///
/// /checkout                            open a payment session (POST, auth optional)
/// /webhooks/stripe                     payment provider events (POST, signed)
///
/// /orders                              caller's orders (auth)
/// /downloads                           caller's grants (auth)
/// /downloads/{id}/{kind}               sign a grant file (auth)
/// /guest-downloads/{token}             guest order view (GET), consume (POST)
///
/// /admin/beats                         list, create (admin, multipart)
/// /admin/beats/{id}                    get, replace, soft delete
/// /admin/orders                        list (admin)
/// /admin/orders/{id}                   get
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/beats", beats::router())
        .route("/checkout", post(handlers::checkout::create_checkout))
        .route(
            "/webhooks/stripe",
            post(handlers::webhooks::stripe_webhook),
        )
        .route("/orders", get(handlers::orders::list_my_orders))
        .merge(downloads::router())
        .nest("/admin", admin::router())
}

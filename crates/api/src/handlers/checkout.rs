//! Checkout entry point.

use axum::extract::State;
use axum::http::header::ACCEPT_LANGUAGE;
use axum::http::HeaderMap;
use axum::Json;
use beatstore_core::error::CoreError;
use beatstore_core::intent::Buyer;
use beatstore_core::locale::Locale;
use beatstore_pipeline::checkout::{start_checkout, CartLine, CheckoutStarted};
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::MaybeAuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub items: Vec<CartLine>,
    /// Required when not signed in.
    pub email: Option<String>,
    /// Falls back to `Accept-Language`, then English.
    pub locale: Option<String>,
}

/// POST /api/v1/checkout
///
/// Signed-in callers buy for their account; anonymous callers must supply
/// an email and buy as guests. Prices are taken from the catalog, never
/// from the request.
pub async fn create_checkout(
    State(state): State<AppState>,
    MaybeAuthUser(auth_user): MaybeAuthUser,
    headers: HeaderMap,
    Json(input): Json<CheckoutRequest>,
) -> AppResult<Json<DataResponse<CheckoutStarted>>> {
    let buyer = match auth_user {
        Some(user) => Buyer::User {
            user_id: user.user_id,
        },
        None => {
            let email = input.email.as_deref().ok_or_else(|| {
                AppError::Core(CoreError::Validation(
                    "An email address is required to check out as a guest".into(),
                ))
            })?;
            Buyer::guest(email)?
        }
    };

    let locale = input
        .locale
        .as_deref()
        .or_else(|| headers.get(ACCEPT_LANGUAGE).and_then(|v| v.to_str().ok()))
        .map(Locale::from_tag)
        .unwrap_or_default();

    let started = start_checkout(
        &state.pool,
        state.payments.as_ref(),
        &state.config.store,
        buyer,
        &input.items,
        locale,
    )
    .await?;
    Ok(Json(DataResponse { data: started }))
}

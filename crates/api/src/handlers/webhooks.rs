//! Payment provider webhook.
//!
//! The signature is checked against the raw body before anything is
//! parsed; an unsigned or forged delivery is a 401. A 2xx tells the provider to stop redelivering, so only
//! failures worth retrying (no order recorded yet) return 5xx.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use beatstore_cloud::payment::WebhookEvent;
use beatstore_core::error::CoreError;
use beatstore_core::signature::{verify_signature, DEFAULT_TOLERANCE_SECS};
use beatstore_pipeline::fulfillment::FulfillmentOutcome;
use beatstore_pipeline::refund::handle_refund;
use chrono::Utc;
use serde_json::{json, Value};

use crate::error::{AppError, AppResult};
use crate::state::AppState;

pub const SIGNATURE_HEADER: &str = "stripe-signature";

/// POST /api/v1/webhooks/stripe
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<Value>> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| CoreError::Unauthorized("Missing signature header".into()))?;

    verify_signature(
        &body,
        signature,
        &state.config.stripe.webhook_secret,
        Utc::now().timestamp(),
        DEFAULT_TOLERANCE_SECS,
    )
    .map_err(|e| {
        tracing::warn!(error = %e, "Rejected webhook with bad signature");
        CoreError::Unauthorized(format!("Invalid signature: {e}"))
    })?;

    let event = WebhookEvent::parse(&body).map_err(|e| AppError::BadRequest(e.to_string()))?;

    match event {
        WebhookEvent::CheckoutCompleted(session) => {
            let outcome = state
                .fulfillment
                .handle_completed_session(&session)
                .await
                .map_err(|e| {
                    AppError::InternalError(format!(
                        "Fulfillment of session {} failed: {e}",
                        session.id
                    ))
                })?;
            match outcome {
                FulfillmentOutcome::Fulfilled {
                    order_id, summary, ..
                } => {
                    tracing::info!(
                        order_id,
                        session_id = %session.id,
                        fulfilled = summary.fulfilled(),
                        skipped = summary.skipped(),
                        failed = summary.failed(),
                        "Checkout session fulfilled"
                    );
                }
                FulfillmentOutcome::Duplicate { order_id } => {
                    tracing::info!(order_id, session_id = %session.id, "Duplicate delivery ignored");
                }
            }
        }
        WebhookEvent::ChargeRefunded {
            charge_id,
            payment_intent,
        } => match payment_intent {
            Some(payment_intent) => {
                handle_refund(&state.pool, &state.event_bus, &payment_intent)
                    .await
                    .map_err(|e| {
                        AppError::InternalError(format!("Refund of {payment_intent} failed: {e}"))
                    })?;
            }
            None => {
                tracing::warn!(charge_id = %charge_id, "Refunded charge has no payment intent");
            }
        },
        WebhookEvent::PaymentSucceeded { payment_intent } => {
            tracing::info!(payment_intent = %payment_intent, "Payment succeeded");
        }
        WebhookEvent::Ignored(event_type) => {
            tracing::debug!(event_type = %event_type, "Ignoring webhook event");
        }
    }

    Ok(Json(json!({ "received": true })))
}

//! Refund handler.
//!
//! A refund marks the order `refunded` and ends every way of downloading
//! it: all grants of the order expire now, and a guest link expires with
//! them. Replaying a refund is harmless.

use beatstore_core::types::DbId;
use beatstore_db::repositories::{DownloadRepo, OrderRepo};
use beatstore_events::{EventBus, StoreEvent};
use sqlx::PgPool;

use crate::PipelineError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefundOutcome {
    Refunded { order_id: DbId, grants_revoked: u64 },
    /// No order carries this payment; acknowledged and ignored.
    UnknownPayment,
}

/// Apply a refund reported for `payment_intent_id`.
pub async fn handle_refund(
    pool: &PgPool,
    events: &EventBus,
    payment_intent_id: &str,
) -> Result<RefundOutcome, PipelineError> {
    let Some(order) = OrderRepo::find_by_payment_intent(pool, payment_intent_id).await? else {
        tracing::warn!(payment_intent_id, "Refund for unknown payment, ignoring");
        return Ok(RefundOutcome::UnknownPayment);
    };

    OrderRepo::mark_refunded(pool, order.id).await?;
    let grants_revoked = DownloadRepo::expire_for_order(pool, order.id).await?;
    tracing::info!(
        order_id = order.id,
        order_number = %order.order_number,
        grants_revoked,
        guest = order.is_guest_order,
        "Order refunded, download access revoked"
    );

    events.publish(StoreEvent::order_refunded(order.id, grants_revoked));

    Ok(RefundOutcome::Refunded {
        order_id: order.id,
        grants_revoked,
    })
}

//! Checkout initiator.
//!
//! Prices the cart from the catalog (never from the client), snapshots the
//! result into a [`CheckoutIntent`], and opens a hosted payment session that
//! carries the intent in its metadata. Nothing is persisted here: the order
//! is only created once the payment webhook confirms the session.

use std::collections::HashSet;

use beatstore_cloud::payment::{CheckoutLine, CheckoutSessionRequest, PaymentGateway};
use beatstore_core::error::CoreError;
use beatstore_core::intent::{Buyer, CheckoutIntent, IntentItem};
use beatstore_core::licensing::LicenseTier;
use beatstore_core::locale::Locale;
use beatstore_core::types::{DbId, MinorUnits};
use beatstore_db::repositories::BeatRepo;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::{PipelineError, StoreSettings};

/// One cart entry as sent by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct CartLine {
    pub beat_id: DbId,
    pub tier: LicenseTier,
}

/// A created payment session the client should redirect to.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutStarted {
    pub session_id: String,
    pub url: String,
    pub total: MinorUnits,
    pub currency: String,
}

/// Price `cart` and open a payment session for `buyer`.
///
/// Every line must name an active beat offering the tier as available,
/// and a beat may appear only once; otherwise the whole checkout fails
/// before the payment provider is contacted.
pub async fn start_checkout(
    pool: &PgPool,
    gateway: &dyn PaymentGateway,
    settings: &StoreSettings,
    buyer: Buyer,
    cart: &[CartLine],
    locale: Locale,
) -> Result<CheckoutStarted, PipelineError> {
    if cart.is_empty() {
        return Err(CoreError::Validation("Cart is empty".into()).into());
    }
    let mut seen = HashSet::new();
    if let Some(dup) = cart.iter().find(|line| !seen.insert(line.beat_id)) {
        return Err(CoreError::Validation(format!(
            "Beat {} appears more than once in the cart",
            dup.beat_id
        ))
        .into());
    }

    let mut items = Vec::with_capacity(cart.len());
    for line in cart {
        let beat = BeatRepo::find_active(pool, line.beat_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "beat",
                id: line.beat_id,
            })?;
        let license = beat
            .license(line.tier)
            .filter(|license| license.is_available)
            .ok_or_else(|| {
                CoreError::Validation(format!(
                    "License '{}' is not available for beat {}",
                    line.tier, beat.id
                ))
            })?;
        items.push(IntentItem {
            beat_id: beat.id,
            title: beat.title.clone(),
            tier: line.tier,
            price: license.price,
        });
    }

    let intent = CheckoutIntent {
        buyer,
        items,
        locale,
    };
    let total = intent.total()?;

    let (customer_email, client_reference_id) = match &intent.buyer {
        Buyer::Guest { email } => (Some(email.clone()), None),
        Buyer::User { user_id } => (None, Some(user_id.to_string())),
    };
    let request = CheckoutSessionRequest {
        lines: intent
            .items
            .iter()
            .map(|item| CheckoutLine {
                name: format!("{} - {} license", item.title, item.tier),
                unit_amount: item.price,
            })
            .collect(),
        currency: settings.currency.clone(),
        metadata: intent.to_metadata()?,
        customer_email,
        client_reference_id,
        locale: locale.as_str().to_string(),
        success_url: settings.url("/checkout/success?session_id={CHECKOUT_SESSION_ID}"),
        cancel_url: settings.url("/cart"),
    };

    let session = gateway.create_checkout_session(&request).await?;
    tracing::info!(
        session_id = %session.id,
        items = intent.items.len(),
        total,
        guest = intent.buyer.is_guest(),
        "Checkout started"
    );

    Ok(CheckoutStarted {
        session_id: session.id,
        url: session.url,
        total,
        currency: settings.currency.clone(),
    })
}

//! Hosted checkout sessions and webhook event decoding.

mod stripe;

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use beatstore_core::types::MinorUnits;
use serde::Deserialize;

pub use stripe::{StripeConfig, StripeGateway};

#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error("Payment provider request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The provider answered with a non-2xx status.
    #[error("Payment provider returned HTTP {status}: {message}")]
    Provider { status: u16, message: String },

    #[error("Malformed webhook event: {0}")]
    MalformedEvent(String),
}

/// One priced line on the hosted checkout page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutLine {
    pub name: String,
    pub unit_amount: MinorUnits,
}

/// Everything needed to open a hosted checkout session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSessionRequest {
    pub lines: Vec<CheckoutLine>,
    pub currency: String,
    pub metadata: BTreeMap<String, String>,
    /// Pre-filled email on the payment page (guests).
    pub customer_email: Option<String>,
    /// Our own reference to the buyer (user id).
    pub client_reference_id: Option<String>,
    pub locale: String,
    pub success_url: String,
    pub cancel_url: String,
}

/// A created hosted checkout session.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

/// A checkout session as delivered in a `checkout.session.completed` event.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CompletedSession {
    pub id: String,
    #[serde(default)]
    pub payment_intent: Option<String>,
    #[serde(default)]
    pub amount_total: Option<MinorUnits>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// Webhook events the store acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookEvent {
    CheckoutCompleted(CompletedSession),
    ChargeRefunded {
        charge_id: String,
        payment_intent: Option<String>,
    },
    PaymentSucceeded {
        payment_intent: String,
    },
    /// Any other event type; acknowledged and ignored.
    Ignored(String),
}

#[derive(Deserialize)]
struct RawEvent {
    #[serde(rename = "type")]
    event_type: String,
    data: RawEventData,
}

#[derive(Deserialize)]
struct RawEventData {
    object: serde_json::Value,
}

#[derive(Deserialize)]
struct RawCharge {
    id: String,
    #[serde(default)]
    payment_intent: Option<String>,
}

#[derive(Deserialize)]
struct RawPaymentIntent {
    id: String,
}

impl WebhookEvent {
    /// Decode a verified webhook body.
    pub fn parse(body: &[u8]) -> Result<Self, PaymentError> {
        let raw: RawEvent = serde_json::from_slice(body)
            .map_err(|e| PaymentError::MalformedEvent(e.to_string()))?;
        let object = raw.data.object;
        let decode_err = |e: serde_json::Error| {
            PaymentError::MalformedEvent(format!("{}: {e}", raw.event_type))
        };

        Ok(match raw.event_type.as_str() {
            "checkout.session.completed" => {
                Self::CheckoutCompleted(serde_json::from_value(object).map_err(decode_err)?)
            }
            "charge.refunded" => {
                let charge: RawCharge = serde_json::from_value(object).map_err(decode_err)?;
                Self::ChargeRefunded {
                    charge_id: charge.id,
                    payment_intent: charge.payment_intent,
                }
            }
            "payment_intent.succeeded" => {
                let intent: RawPaymentIntent =
                    serde_json::from_value(object).map_err(decode_err)?;
                Self::PaymentSucceeded {
                    payment_intent: intent.id,
                }
            }
            other => Self::Ignored(other.to_string()),
        })
    }
}

/// Opens hosted checkout sessions.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> Result<CheckoutSession, PaymentError>;
}

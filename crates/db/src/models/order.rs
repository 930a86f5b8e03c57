//! Order entity model and DTOs.

use beatstore_core::error::CoreError;
use beatstore_core::licensing::LicenseTier;
use beatstore_core::locale::Locale;
use beatstore_core::types::{DbId, MinorUnits, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

use super::status::OrderStatus;

/// One purchased line item, snapshotted at checkout time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub beat_id: DbId,
    pub beat_title: String,
    pub license_tier: LicenseTier,
    pub price: MinorUnits,
}

/// Full order row from the `orders` table.
///
/// Contains the guest download token. Never serialize it to anyone but the
/// guest holding it or an admin.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Order {
    pub id: DbId,
    pub order_number: String,
    pub user_id: Option<DbId>,
    pub items: Json<Vec<OrderItem>>,
    pub total_amount: MinorUnits,
    pub currency: String,
    pub payment_intent_id: Option<String>,
    pub checkout_session_id: String,
    pub status: String,
    pub contract_key: Option<String>,
    pub delivery_email: String,
    pub is_guest_order: bool,
    pub guest_email: Option<String>,
    pub guest_download_token: Option<String>,
    pub guest_download_count: i32,
    pub guest_download_expires_at: Option<Timestamp>,
    pub locale: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Order {
    pub fn status(&self) -> Result<OrderStatus, CoreError> {
        self.status.parse()
    }

    pub fn locale(&self) -> Locale {
        Locale::from_tag(&self.locale)
    }

    /// Line item for `beat_id`, if the order contains it.
    pub fn item(&self, beat_id: DbId) -> Option<&OrderItem> {
        self.items.0.iter().find(|item| item.beat_id == beat_id)
    }
}

/// Guest-specific fields of a new order.
#[derive(Debug, Clone)]
pub struct GuestAccess {
    pub email: String,
    pub token: String,
    pub expires_at: Timestamp,
}

/// DTO for creating an order from a completed checkout session.
#[derive(Debug, Clone)]
pub struct CreateOrder {
    pub order_number: String,
    pub user_id: Option<DbId>,
    pub items: Vec<OrderItem>,
    pub total_amount: MinorUnits,
    pub currency: String,
    pub payment_intent_id: Option<String>,
    pub checkout_session_id: String,
    pub status: OrderStatus,
    pub delivery_email: String,
    pub guest: Option<GuestAccess>,
    pub locale: Locale,
}

/// Admin listing filter.
#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub user_id: Option<DbId>,
    pub limit: i64,
    pub offset: i64,
}

//! Fulfillment handler for completed checkout sessions.
//!
//! Runs after the webhook signature has been verified. The order row is the
//! durability checkpoint: once it exists the purchase is recorded, and every
//! later step (contracts, grants, counters, email) is best-effort per item.
//! A failure in one item is reported in the [`FulfillmentSummary`] and never
//! undoes the order or blocks the other items.
//!
//! The checkout session id is the idempotency key. A redelivered webhook
//! finds the existing order and returns [`FulfillmentOutcome::Duplicate`]
//! without side effects.

use std::sync::Arc;

use beatstore_cloud::payment::CompletedSession;
use beatstore_cloud::storage::ObjectStorage;
use beatstore_core::access::{
    generate_guest_token, generate_order_number, grant_expiry, guest_expiry,
};
use beatstore_core::error::CoreError;
use beatstore_core::intent::{Buyer, CheckoutIntent};
use beatstore_core::licensing::{resolve_entitled_files, FileKind, License};
use beatstore_core::storage_keys::contract_key;
use beatstore_core::types::{DbId, Timestamp};
use beatstore_db::models::download::CreateDownload;
use beatstore_db::models::order::{CreateOrder, GuestAccess, Order, OrderItem};
use beatstore_db::models::status::OrderStatus;
use beatstore_db::models::user::User;
use beatstore_db::repositories::{BeatRepo, DownloadRepo, OrderRepo, UserRepo};
use beatstore_events::{ConfirmationLine, EventBus, OrderConfirmation, OrderMailer, StoreEvent};
use chrono::Utc;
use serde::Serialize;
use sqlx::PgPool;

use crate::contract::{ContractDetails, ContractRenderer};
use crate::{PipelineError, StoreSettings};

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// What happened to one purchased item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ItemOutcome {
    Fulfilled { beat_id: DbId, contract_key: String },
    /// The beat was deleted between checkout and payment.
    SkippedMissingBeat { beat_id: DbId },
    Failed { beat_id: DbId, reason: String },
}

/// Per-item results of one fulfillment, in order-item order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FulfillmentSummary {
    pub items: Vec<ItemOutcome>,
}

impl FulfillmentSummary {
    pub fn fulfilled(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Fulfilled { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::SkippedMissingBeat { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Failed { .. }))
    }

    /// Contract of the first fulfilled item; stored on the order itself.
    pub fn first_contract_key(&self) -> Option<&str> {
        self.items.iter().find_map(|o| match o {
            ItemOutcome::Fulfilled { contract_key, .. } => Some(contract_key.as_str()),
            _ => None,
        })
    }

    fn count(&self, pred: impl Fn(&ItemOutcome) -> bool) -> usize {
        self.items.iter().filter(|o| pred(*o)).count()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FulfillmentOutcome {
    Fulfilled {
        order_id: DbId,
        order_number: String,
        summary: FulfillmentSummary,
    },
    /// The session was already fulfilled; nothing was done.
    Duplicate { order_id: DbId },
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

/// Buyer resolved from the checkout intent.
enum ResolvedBuyer {
    User(User),
    Guest(GuestAccess),
}

impl ResolvedBuyer {
    fn email(&self) -> &str {
        match self {
            Self::User(user) => &user.email,
            Self::Guest(guest) => &guest.email,
        }
    }

    fn name(&self) -> &str {
        match self {
            Self::User(user) => &user.name,
            Self::Guest(guest) => &guest.email,
        }
    }
}

/// Turns paid checkout sessions into orders.
pub struct FulfillmentService {
    pool: PgPool,
    storage: Arc<dyn ObjectStorage>,
    contracts: Arc<dyn ContractRenderer>,
    mailer: Option<Arc<dyn OrderMailer>>,
    events: Arc<EventBus>,
    settings: StoreSettings,
}

impl FulfillmentService {
    pub fn new(
        pool: PgPool,
        storage: Arc<dyn ObjectStorage>,
        contracts: Arc<dyn ContractRenderer>,
        mailer: Option<Arc<dyn OrderMailer>>,
        events: Arc<EventBus>,
        settings: StoreSettings,
    ) -> Self {
        Self {
            pool,
            storage,
            contracts,
            mailer,
            events,
            settings,
        }
    }

    /// Fulfill a completed checkout session.
    ///
    /// Errors before the order exists (bad metadata, unknown user, database
    /// down) are returned so the provider redelivers. After that point only
    /// the order insert itself can fail the call.
    pub async fn handle_completed_session(
        &self,
        session: &CompletedSession,
    ) -> Result<FulfillmentOutcome, PipelineError> {
        if let Some(existing) = OrderRepo::find_by_checkout_session(&self.pool, &session.id).await? {
            tracing::info!(
                session_id = %session.id,
                order_id = existing.id,
                "Checkout session already fulfilled"
            );
            return Ok(FulfillmentOutcome::Duplicate {
                order_id: existing.id,
            });
        }

        let intent = CheckoutIntent::from_metadata(&session.metadata)?;
        let now = Utc::now();
        let buyer = self.resolve_buyer(&intent.buyer, now).await?;

        let items: Vec<OrderItem> = intent
            .items
            .iter()
            .map(|item| OrderItem {
                beat_id: item.beat_id,
                beat_title: item.title.clone(),
                license_tier: item.tier,
                price: item.price,
            })
            .collect();
        let total = intent.total()?;
        if let Some(charged) = session.amount_total {
            if charged != total {
                tracing::warn!(
                    session_id = %session.id,
                    charged,
                    total,
                    "Charged amount differs from item snapshot total"
                );
            }
        }

        let (user_id, guest) = match &buyer {
            ResolvedBuyer::User(user) => (Some(user.id), None),
            ResolvedBuyer::Guest(guest) => (None, Some(guest.clone())),
        };
        let input = CreateOrder {
            order_number: generate_order_number(now),
            user_id,
            items,
            total_amount: total,
            currency: session
                .currency
                .clone()
                .unwrap_or_else(|| self.settings.currency.clone()),
            payment_intent_id: session.payment_intent.clone(),
            checkout_session_id: session.id.clone(),
            status: OrderStatus::Completed,
            delivery_email: buyer.email().to_string(),
            guest,
            locale: intent.locale,
        };

        let Some(order) = OrderRepo::create(&self.pool, &input).await? else {
            // A concurrent delivery of the same session won the insert.
            let existing = OrderRepo::find_by_checkout_session(&self.pool, &session.id)
                .await?
                .ok_or_else(|| {
                    CoreError::Internal(format!("Order for session {} vanished", session.id))
                })?;
            return Ok(FulfillmentOutcome::Duplicate {
                order_id: existing.id,
            });
        };
        tracing::info!(
            order_id = order.id,
            order_number = %order.order_number,
            guest = order.is_guest_order,
            total = order.total_amount,
            "Order recorded"
        );

        let mut summary = FulfillmentSummary::default();
        for item in &order.items.0 {
            let outcome = self.fulfill_item(&order, &buyer, item, now).await;
            if let ItemOutcome::Failed { beat_id, reason } = &outcome {
                tracing::error!(order_id = order.id, beat_id, reason = %reason, "Item fulfillment failed");
            }
            summary.items.push(outcome);
        }

        self.finalize(&order, &buyer, &summary).await;
        self.notify(&order, &summary).await;

        self.events.publish(StoreEvent::order_fulfilled(
            order.id,
            serde_json::json!({
                "order_number": order.order_number,
                "guest": order.is_guest_order,
                "fulfilled": summary.fulfilled(),
                "skipped": summary.skipped(),
                "failed": summary.failed(),
            }),
        ));

        Ok(FulfillmentOutcome::Fulfilled {
            order_id: order.id,
            order_number: order.order_number,
            summary,
        })
    }

    async fn resolve_buyer(
        &self,
        buyer: &Buyer,
        now: Timestamp,
    ) -> Result<ResolvedBuyer, PipelineError> {
        match buyer {
            Buyer::User { user_id } => {
                let user = UserRepo::find_by_id(&self.pool, *user_id)
                    .await?
                    .ok_or(CoreError::NotFound {
                        entity: "user",
                        id: *user_id,
                    })?;
                Ok(ResolvedBuyer::User(user))
            }
            Buyer::Guest { email } => Ok(ResolvedBuyer::Guest(GuestAccess {
                email: email.clone(),
                token: generate_guest_token(),
                expires_at: guest_expiry(now),
            })),
        }
    }

    async fn fulfill_item(
        &self,
        order: &Order,
        buyer: &ResolvedBuyer,
        item: &OrderItem,
        now: Timestamp,
    ) -> ItemOutcome {
        let beat_id = item.beat_id;
        match self.try_fulfill_item(order, buyer, item, now).await {
            Ok(Some(contract_key)) => ItemOutcome::Fulfilled {
                beat_id,
                contract_key,
            },
            Ok(None) => {
                tracing::warn!(order_id = order.id, beat_id, "Purchased beat no longer exists");
                ItemOutcome::SkippedMissingBeat { beat_id }
            }
            Err(e) => ItemOutcome::Failed {
                beat_id,
                reason: e.to_string(),
            },
        }
    }

    /// Returns the stored contract key, or `None` if the beat is gone.
    async fn try_fulfill_item(
        &self,
        order: &Order,
        buyer: &ResolvedBuyer,
        item: &OrderItem,
        now: Timestamp,
    ) -> Result<Option<String>, PipelineError> {
        let Some(beat) = BeatRepo::find_by_id(&self.pool, item.beat_id).await? else {
            return Ok(None);
        };

        // The tier may have been edited away since checkout; the buyer still
        // gets what the tier grants by default at the price they paid.
        let license = beat.license(item.license_tier).cloned().unwrap_or_else(|| License {
            tier: item.license_tier,
            price: item.price,
            is_available: false,
            features: item.license_tier.default_features(),
        });

        let key = contract_key(&order.order_number, beat.id);
        let entitled = resolve_entitled_files(&license.features, &beat.files(), Some(key.clone()));

        let pdf = self.contracts.render(&ContractDetails {
            order_number: order.order_number.clone(),
            issued_at: now,
            licensee_name: buyer.name().to_string(),
            licensee_email: buyer.email().to_string(),
            beat_id: beat.id,
            beat_title: item.beat_title.clone(),
            license: License {
                price: item.price,
                ..license.clone()
            },
            currency: order.currency.clone(),
            locale: order.locale(),
            files: entitled
                .available_kinds()
                .into_iter()
                .filter(|kind| *kind != FileKind::Contract)
                .collect(),
        })?;
        self.storage.put(&key, pdf, "application/pdf").await?;

        if let ResolvedBuyer::User(user) = buyer {
            DownloadRepo::create(
                &self.pool,
                &CreateDownload {
                    order_id: order.id,
                    user_id: user.id,
                    beat_id: beat.id,
                    beat_title: item.beat_title.clone(),
                    license_tier: item.license_tier,
                    expires_at: grant_expiry(now),
                    files: entitled,
                },
            )
            .await?;
        }

        BeatRepo::increment_sales(&self.pool, beat.id).await?;
        if license.is_exclusive() && BeatRepo::deactivate(&self.pool, beat.id).await? {
            tracing::info!(beat_id = beat.id, order_id = order.id, "Exclusive sale, beat retired");
        }

        Ok(Some(key))
    }

    /// Order-level bookkeeping. Failures are logged; the order stands.
    async fn finalize(&self, order: &Order, buyer: &ResolvedBuyer, summary: &FulfillmentSummary) {
        if let Some(key) = summary.first_contract_key() {
            if let Err(e) = OrderRepo::set_contract_key(&self.pool, order.id, key).await {
                tracing::error!(error = %e, order_id = order.id, "Failed to store contract key");
            }
        }
        if let ResolvedBuyer::User(user) = buyer {
            if let Err(e) = UserRepo::append_purchase(&self.pool, user.id, order.id).await {
                tracing::error!(error = %e, order_id = order.id, user_id = user.id, "Failed to record purchase");
            }
        }
    }

    /// Send the confirmation email. Failures are logged, never returned.
    async fn notify(&self, order: &Order, summary: &FulfillmentSummary) {
        let Some(mailer) = &self.mailer else {
            tracing::debug!(order_id = order.id, "Email not configured, skipping confirmation");
            return;
        };

        let download_url = match &order.guest_download_token {
            Some(token) if order.is_guest_order => {
                self.settings.url(&format!("/guest-downloads/{token}"))
            }
            _ => self.settings.url("/account/downloads"),
        };
        let message = OrderConfirmation {
            to: order.delivery_email.clone(),
            locale: order.locale(),
            order_number: order.order_number.clone(),
            lines: order
                .items
                .0
                .iter()
                .map(|item| ConfirmationLine {
                    beat_title: item.beat_title.clone(),
                    license_tier: item.license_tier.to_string(),
                    price: item.price,
                })
                .collect(),
            total: order.total_amount,
            currency: order.currency.clone(),
            download_url,
            is_guest: order.is_guest_order,
        };

        if let Err(e) = mailer.send_order_confirmation(&message).await {
            tracing::error!(
                error = %e,
                order_id = order.id,
                failed_items = summary.failed(),
                "Failed to send order confirmation"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_counts_each_outcome() {
        let summary = FulfillmentSummary {
            items: vec![
                ItemOutcome::SkippedMissingBeat { beat_id: 1 },
                ItemOutcome::Fulfilled {
                    beat_id: 2,
                    contract_key: "contracts/BT-1/2.pdf".into(),
                },
                ItemOutcome::Failed {
                    beat_id: 3,
                    reason: "storage down".into(),
                },
                ItemOutcome::Fulfilled {
                    beat_id: 4,
                    contract_key: "contracts/BT-1/4.pdf".into(),
                },
            ],
        };
        assert_eq!(summary.fulfilled(), 2);
        assert_eq!(summary.skipped(), 1);
        assert_eq!(summary.failed(), 1);
        assert_eq!(summary.first_contract_key(), Some("contracts/BT-1/2.pdf"));
    }

    #[test]
    fn empty_summary_has_no_contract() {
        assert_eq!(FulfillmentSummary::default().first_contract_key(), None);
    }
}

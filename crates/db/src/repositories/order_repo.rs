//! Repository for the `orders` table.

use beatstore_core::types::{DbId, Timestamp};
use sqlx::types::Json;
use sqlx::PgPool;

use crate::models::order::{CreateOrder, Order, OrderFilter};
use crate::models::status::OrderStatus;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, order_number, user_id, items, total_amount, currency, \
                        payment_intent_id, checkout_session_id, status, contract_key, \
                        delivery_email, is_guest_order, guest_email, guest_download_token, \
                        guest_download_count, guest_download_expires_at, locale, \
                        created_at, updated_at";

/// Guest counter state read back after a failed increment, used to tell
/// the caller which rule refused the download.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct GuestTokenState {
    pub is_guest_order: bool,
    pub guest_download_count: i32,
    pub guest_download_expires_at: Option<Timestamp>,
}

/// Provides persistence for orders.
pub struct OrderRepo;

impl OrderRepo {
    /// Insert an order unless one already exists for its checkout session.
    ///
    /// Returns `None` when the session was already fulfilled, including by a
    /// concurrent delivery of the same webhook.
    pub async fn create(pool: &PgPool, input: &CreateOrder) -> Result<Option<Order>, sqlx::Error> {
        let query = format!(
            "INSERT INTO orders (order_number, user_id, items, total_amount, currency,
                                 payment_intent_id, checkout_session_id, status, delivery_email,
                                 is_guest_order, guest_email, guest_download_token,
                                 guest_download_expires_at, locale)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
             ON CONFLICT (checkout_session_id) DO NOTHING
             RETURNING {COLUMNS}"
        );
        let guest = input.guest.as_ref();
        sqlx::query_as::<_, Order>(&query)
            .bind(&input.order_number)
            .bind(input.user_id)
            .bind(Json(&input.items))
            .bind(input.total_amount)
            .bind(&input.currency)
            .bind(&input.payment_intent_id)
            .bind(&input.checkout_session_id)
            .bind(input.status.as_str())
            .bind(&input.delivery_email)
            .bind(guest.is_some())
            .bind(guest.map(|g| g.email.as_str()))
            .bind(guest.map(|g| g.token.as_str()))
            .bind(guest.map(|g| g.expires_at))
            .bind(input.locale.as_str())
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Order>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM orders WHERE id = $1");
        sqlx::query_as::<_, Order>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find the order created for a checkout session (the idempotency key).
    pub async fn find_by_checkout_session(
        pool: &PgPool,
        session_id: &str,
    ) -> Result<Option<Order>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM orders WHERE checkout_session_id = $1");
        sqlx::query_as::<_, Order>(&query)
            .bind(session_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_payment_intent(
        pool: &PgPool,
        payment_intent_id: &str,
    ) -> Result<Option<Order>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM orders WHERE payment_intent_id = $1
             ORDER BY created_at DESC LIMIT 1"
        );
        sqlx::query_as::<_, Order>(&query)
            .bind(payment_intent_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_guest_token(
        pool: &PgPool,
        token: &str,
    ) -> Result<Option<Order>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM orders WHERE guest_download_token = $1");
        sqlx::query_as::<_, Order>(&query)
            .bind(token)
            .fetch_optional(pool)
            .await
    }

    /// List a user's orders, newest first.
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: DbId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Order>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM orders WHERE user_id = $1
             ORDER BY created_at DESC, id DESC
             LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, Order>(&query)
            .bind(user_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Admin listing with optional status and buyer filters, newest first.
    pub async fn list(pool: &PgPool, filter: &OrderFilter) -> Result<Vec<Order>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM orders
             WHERE ($1::TEXT IS NULL OR status = $1)
               AND ($2::BIGINT IS NULL OR user_id = $2)
             ORDER BY created_at DESC, id DESC
             LIMIT $3 OFFSET $4"
        );
        sqlx::query_as::<_, Order>(&query)
            .bind(filter.status.map(OrderStatus::as_str))
            .bind(filter.user_id)
            .bind(filter.limit)
            .bind(filter.offset)
            .fetch_all(pool)
            .await
    }

    /// Whether an unrefunded order bought the exclusive license of a beat.
    pub async fn has_exclusive_sale(pool: &PgPool, beat_id: DbId) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT EXISTS (
                SELECT 1 FROM orders
                WHERE status <> 'refunded'
                  AND items @> jsonb_build_array(
                      jsonb_build_object('beat_id', $1::BIGINT, 'license_tier', 'exclusive'))
             )",
        )
        .bind(beat_id)
        .fetch_one(pool)
        .await
    }

    /// Record the order-level contract key (the first item's contract).
    pub async fn set_contract_key(
        pool: &PgPool,
        id: DbId,
        contract_key: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE orders SET contract_key = $2 WHERE id = $1")
            .bind(id)
            .bind(contract_key)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Mark an order refunded and end its guest link, if any.
    ///
    /// Returns the updated row, or `None` if no order has that id.
    pub async fn mark_refunded(pool: &PgPool, id: DbId) -> Result<Option<Order>, sqlx::Error> {
        let query = format!(
            "UPDATE orders SET
                status = 'refunded',
                guest_download_expires_at = CASE
                    WHEN is_guest_order THEN LEAST(guest_download_expires_at, NOW())
                    ELSE NULL
                END
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Order>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Atomically consume one guest download.
    ///
    /// The quota, expiry, and guest checks live in the `WHERE` clause so
    /// concurrent requests can never push the counter past the limit.
    /// Returns the new count, or `None` if any rule refused.
    pub async fn consume_guest_download(
        pool: &PgPool,
        token: &str,
        limit: i32,
    ) -> Result<Option<i32>, sqlx::Error> {
        let row: Option<(i32,)> = sqlx::query_as(
            "UPDATE orders SET guest_download_count = guest_download_count + 1
             WHERE guest_download_token = $1
               AND is_guest_order = true
               AND guest_download_count < $2
               AND guest_download_expires_at > NOW()
             RETURNING guest_download_count",
        )
        .bind(token)
        .bind(limit)
        .fetch_optional(pool)
        .await?;
        Ok(row.map(|(count,)| count))
    }

    /// Read the guest fields of the order behind `token`.
    pub async fn guest_token_state(
        pool: &PgPool,
        token: &str,
    ) -> Result<Option<GuestTokenState>, sqlx::Error> {
        sqlx::query_as::<_, GuestTokenState>(
            "SELECT is_guest_order, guest_download_count, guest_download_expires_at
             FROM orders WHERE guest_download_token = $1",
        )
        .bind(token)
        .fetch_optional(pool)
        .await
    }
}

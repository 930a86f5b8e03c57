//! Repository for the `downloads` table.

use beatstore_core::types::DbId;
use sqlx::PgPool;

use crate::models::download::{CreateDownload, Download};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, order_id, user_id, beat_id, beat_title, license_tier, \
                        download_count, expires_at, mp3_key, wav_key, stems_key, \
                        contract_key, created_at";

/// Provides persistence for registered-user download grants.
pub struct DownloadRepo;

impl DownloadRepo {
    /// Issue a grant. Returns `None` if the order already has one for the beat.
    pub async fn create(
        pool: &PgPool,
        input: &CreateDownload,
    ) -> Result<Option<Download>, sqlx::Error> {
        let query = format!(
            "INSERT INTO downloads (order_id, user_id, beat_id, beat_title, license_tier,
                                    expires_at, mp3_key, wav_key, stems_key, contract_key)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             ON CONFLICT (order_id, beat_id) DO NOTHING
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Download>(&query)
            .bind(input.order_id)
            .bind(input.user_id)
            .bind(input.beat_id)
            .bind(&input.beat_title)
            .bind(input.license_tier.as_str())
            .bind(input.expires_at)
            .bind(&input.files.mp3)
            .bind(&input.files.wav)
            .bind(&input.files.stems)
            .bind(&input.files.contract)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Download>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM downloads WHERE id = $1");
        sqlx::query_as::<_, Download>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List a user's grants, newest first, expired ones included.
    pub async fn list_for_user(pool: &PgPool, user_id: DbId) -> Result<Vec<Download>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM downloads WHERE user_id = $1
             ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, Download>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    pub async fn list_for_order(
        pool: &PgPool,
        order_id: DbId,
    ) -> Result<Vec<Download>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM downloads WHERE order_id = $1 ORDER BY id");
        sqlx::query_as::<_, Download>(&query)
            .bind(order_id)
            .fetch_all(pool)
            .await
    }

    /// Bump the served counter. Returns `true` if the row exists.
    pub async fn increment_count(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE downloads SET download_count = download_count + 1 WHERE id = $1")
                .bind(id)
                .execute(pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Expire every grant of an order immediately. Returns the number of grants touched.
    pub async fn expire_for_order(pool: &PgPool, order_id: DbId) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE downloads SET expires_at = LEAST(expires_at, NOW()) WHERE order_id = $1",
        )
        .bind(order_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}

//! Repository for the `beats` table.

use beatstore_core::types::DbId;
use sqlx::types::Json;
use sqlx::PgPool;

use crate::models::beat::{Beat, BeatFilter, CreateBeat, UpdateBeat};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, title, bpm, musical_key, genres, moods, tags, \
                        preview_key, cover_key, mp3_key, wav_key, stems_key, \
                        waveform, licenses, is_active, plays, sales, created_at, updated_at";

/// Shared `WHERE` clause for [`BeatRepo::list`] and [`BeatRepo::count`].
///
/// Binds: `$1` is_active, `$2` genre, `$3` mood, `$4` search pattern,
/// `$5` bpm_min, `$6` bpm_max.
const FILTER: &str = "($1::BOOL IS NULL OR is_active = $1)
               AND ($2::TEXT IS NULL OR $2 = ANY(genres))
               AND ($3::TEXT IS NULL OR $3 = ANY(moods))
               AND ($4::TEXT IS NULL
                    OR title ILIKE $4
                    OR EXISTS (SELECT 1 FROM unnest(tags) AS t WHERE t ILIKE $4))
               AND ($5::INT IS NULL OR bpm >= $5)
               AND ($6::INT IS NULL OR bpm <= $6)";

/// Provides catalog operations for beats.
pub struct BeatRepo;

impl BeatRepo {
    /// Reserve the next beat id so files can be uploaded under it before
    /// the row exists.
    pub async fn reserve_id(pool: &PgPool) -> Result<DbId, sqlx::Error> {
        let (id,): (i64,) = sqlx::query_as("SELECT nextval(pg_get_serial_sequence('beats', 'id'))")
            .fetch_one(pool)
            .await?;
        Ok(id)
    }

    /// Insert a beat under its reserved id, returning the created row.
    pub async fn create(pool: &PgPool, input: &CreateBeat) -> Result<Beat, sqlx::Error> {
        let query = format!(
            "INSERT INTO beats (id, title, bpm, musical_key, genres, moods, tags,
                                preview_key, cover_key, mp3_key, wav_key, stems_key,
                                waveform, licenses)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Beat>(&query)
            .bind(input.id)
            .bind(&input.title)
            .bind(input.bpm)
            .bind(&input.musical_key)
            .bind(&input.genres)
            .bind(&input.moods)
            .bind(&input.tags)
            .bind(&input.preview_key)
            .bind(&input.cover_key)
            .bind(&input.mp3_key)
            .bind(&input.wav_key)
            .bind(&input.stems_key)
            .bind(Json(&input.waveform))
            .bind(Json(&input.licenses))
            .fetch_one(pool)
            .await
    }

    /// Find a beat by id regardless of visibility.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Beat>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM beats WHERE id = $1");
        sqlx::query_as::<_, Beat>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a beat that is currently on sale.
    pub async fn find_active(pool: &PgPool, id: DbId) -> Result<Option<Beat>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM beats WHERE id = $1 AND is_active = true");
        sqlx::query_as::<_, Beat>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List beats matching `filter`, newest first.
    pub async fn list(pool: &PgPool, filter: &BeatFilter) -> Result<Vec<Beat>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM beats
             WHERE {FILTER}
             ORDER BY created_at DESC, id DESC
             LIMIT $7 OFFSET $8"
        );
        sqlx::query_as::<_, Beat>(&query)
            .bind(filter.is_active)
            .bind(&filter.genre)
            .bind(&filter.mood)
            .bind(&filter.search)
            .bind(filter.bpm_min)
            .bind(filter.bpm_max)
            .bind(filter.limit)
            .bind(filter.offset)
            .fetch_all(pool)
            .await
    }

    /// Count beats matching `filter`, ignoring its pagination.
    pub async fn count(pool: &PgPool, filter: &BeatFilter) -> Result<i64, sqlx::Error> {
        let query = format!("SELECT COUNT(*) FROM beats WHERE {FILTER}");
        let (count,): (i64,) = sqlx::query_as(&query)
            .bind(filter.is_active)
            .bind(&filter.genre)
            .bind(&filter.mood)
            .bind(&filter.search)
            .bind(filter.bpm_min)
            .bind(filter.bpm_max)
            .fetch_one(pool)
            .await?;
        Ok(count)
    }

    /// Replace a beat's mutable metadata.
    ///
    /// Returns `None` if no row with the given `id` exists.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateBeat,
    ) -> Result<Option<Beat>, sqlx::Error> {
        let query = format!(
            "UPDATE beats SET
                title = $2,
                bpm = $3,
                musical_key = $4,
                genres = $5,
                moods = $6,
                tags = $7,
                waveform = $8,
                licenses = $9,
                is_active = $10
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Beat>(&query)
            .bind(id)
            .bind(&input.title)
            .bind(input.bpm)
            .bind(&input.musical_key)
            .bind(&input.genres)
            .bind(&input.moods)
            .bind(&input.tags)
            .bind(Json(&input.waveform))
            .bind(Json(&input.licenses))
            .bind(input.is_active)
            .fetch_optional(pool)
            .await
    }

    /// Take a beat off sale. Returns `true` if it was active.
    pub async fn deactivate(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE beats SET is_active = false WHERE id = $1 AND is_active = true")
                .bind(id)
                .execute(pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Count one more sale. Returns `true` if the row exists.
    pub async fn increment_sales(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE beats SET sales = sales + 1 WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Count one more preview play of an active beat.
    pub async fn increment_plays(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE beats SET plays = plays + 1 WHERE id = $1 AND is_active = true")
                .bind(id)
                .execute(pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }
}

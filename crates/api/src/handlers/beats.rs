//! Storefront catalog handlers.
//!
//! Only active beats are visible, and only through [`BeatListing`], which
//! carries public preview and cover URLs but never the full-quality file keys.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use beatstore_cloud::storage::ObjectStorage;
use beatstore_core::error::CoreError;
use beatstore_core::licensing::License;
use beatstore_core::search::{like_pattern, normalize_tag};
use beatstore_core::types::{DbId, Timestamp};
use beatstore_db::models::beat::{Beat, BeatFilter, Waveform};
use beatstore_db::repositories::BeatRepo;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::query::PaginationParams;
use crate::response::{DataResponse, Page};
use crate::state::AppState;

/// Public view of a beat.
#[derive(Debug, Serialize)]
pub struct BeatListing {
    pub id: DbId,
    pub title: String,
    pub bpm: i32,
    pub musical_key: String,
    pub genres: Vec<String>,
    pub moods: Vec<String>,
    pub tags: Vec<String>,
    pub preview_url: String,
    pub cover_url: String,
    pub waveform: Waveform,
    /// Licenses currently offered for sale.
    pub licenses: Vec<License>,
    pub plays: i64,
    pub created_at: Timestamp,
}

impl BeatListing {
    pub fn from_beat(beat: Beat, storage: &dyn ObjectStorage) -> Self {
        Self {
            preview_url: storage.public_url(&beat.preview_key),
            cover_url: storage.public_url(&beat.cover_key),
            licenses: beat
                .licenses
                .0
                .into_iter()
                .filter(|license| license.is_available)
                .collect(),
            id: beat.id,
            title: beat.title,
            bpm: beat.bpm,
            musical_key: beat.musical_key,
            genres: beat.genres,
            moods: beat.moods,
            tags: beat.tags,
            waveform: beat.waveform.0,
            plays: beat.plays,
            created_at: beat.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct BeatQuery {
    pub genre: Option<String>,
    pub mood: Option<String>,
    pub search: Option<String>,
    pub bpm_min: Option<i32>,
    pub bpm_max: Option<i32>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// GET /api/v1/beats
pub async fn list_beats(
    State(state): State<AppState>,
    Query(params): Query<BeatQuery>,
) -> AppResult<Json<DataResponse<Page<BeatListing>>>> {
    let (limit, offset) = PaginationParams {
        limit: params.limit,
        offset: params.offset,
    }
    .clamped();
    let filter = BeatFilter {
        is_active: Some(true),
        genre: normalize_tag(params.genre.as_deref()),
        mood: normalize_tag(params.mood.as_deref()),
        search: like_pattern(params.search.as_deref()),
        bpm_min: params.bpm_min,
        bpm_max: params.bpm_max,
        limit,
        offset,
    };

    let beats = BeatRepo::list(&state.pool, &filter).await?;
    let total = BeatRepo::count(&state.pool, &filter).await?;
    let items = beats
        .into_iter()
        .map(|beat| BeatListing::from_beat(beat, state.storage.as_ref()))
        .collect();

    Ok(Json(DataResponse {
        data: Page {
            items,
            total,
            limit,
            offset,
        },
    }))
}

/// GET /api/v1/beats/{id}
pub async fn get_beat(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<BeatListing>>> {
    let beat = BeatRepo::find_active(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "beat", id }))?;
    Ok(Json(DataResponse {
        data: BeatListing::from_beat(beat, state.storage.as_ref()),
    }))
}

/// POST /api/v1/beats/{id}/play
///
/// Counts one preview play. Returns 204, or 404 for an unknown or retired beat.
pub async fn record_play(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    if !BeatRepo::increment_plays(&state.pool, id).await? {
        return Err(AppError::Core(CoreError::NotFound { entity: "beat", id }));
    }
    Ok(StatusCode::NO_CONTENT)
}

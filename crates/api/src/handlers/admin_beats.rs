//! Admin catalog management.
//!
//! New beats arrive as one multipart request: a `metadata` JSON part plus
//! the `preview`, `cover`, `mp3`, `wav`, and `stems` files. Everything is
//! validated before the first upload; the id is reserved before uploading
//! so the storage keys can embed it.

use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use beatstore_cloud::storage::content_type_for;
use beatstore_core::error::CoreError;
use beatstore_core::licensing::{validate_licenses, FileKind, License};
use beatstore_core::search::{like_pattern, normalize_tag};
use beatstore_core::storage_keys::{beat_file_key, cover_key, preview_key};
use beatstore_core::types::DbId;
use beatstore_db::models::beat::{Beat, BeatFilter, CreateBeat, UpdateBeat, Waveform};
use beatstore_db::models::status::CatalogStatus;
use beatstore_db::repositories::{BeatRepo, OrderRepo};
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::middleware::rbac::RequireAdmin;
use crate::query::PaginationParams;
use crate::response::{DataResponse, Page};
use crate::state::AppState;

/// Upper bound for a plausible tempo.
const MAX_BPM: i32 = 400;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct AdminBeatQuery {
    /// `active` (default), `inactive`, or `all`.
    pub status: Option<String>,
    pub genre: Option<String>,
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// The `metadata` part of a beat upload.
#[derive(Debug, Deserialize)]
pub struct BeatMetadata {
    pub title: String,
    pub bpm: i32,
    pub musical_key: String,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub moods: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub waveform: Waveform,
    pub licenses: Vec<License>,
}

/// One uploaded file part.
struct UploadedFile {
    filename: String,
    bytes: Vec<u8>,
}

#[derive(Default)]
struct BeatUpload {
    metadata: Option<BeatMetadata>,
    preview: Option<UploadedFile>,
    cover: Option<UploadedFile>,
    mp3: Option<UploadedFile>,
    wav: Option<UploadedFile>,
    stems: Option<UploadedFile>,
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate_fields(
    title: &str,
    bpm: i32,
    musical_key: &str,
    licenses: &[License],
) -> Result<(), CoreError> {
    if title.trim().is_empty() {
        return Err(CoreError::Validation("Title must not be empty".into()));
    }
    if !(1..=MAX_BPM).contains(&bpm) {
        return Err(CoreError::Validation(format!(
            "BPM must be between 1 and {MAX_BPM}"
        )));
    }
    if musical_key.trim().is_empty() {
        return Err(CoreError::Validation("Key must not be empty".into()));
    }
    validate_licenses(licenses)
}

/// Lower-case, trim, drop blanks and duplicates, keep order.
fn normalize_labels(labels: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(labels.len());
    for label in labels {
        if let Some(label) = normalize_tag(Some(label.as_str())) {
            if !out.contains(&label) {
                out.push(label);
            }
        }
    }
    out
}

fn required(file: Option<UploadedFile>, field: &str) -> AppResult<UploadedFile> {
    match file {
        Some(file) if !file.bytes.is_empty() => Ok(file),
        Some(_) => Err(AppError::BadRequest(format!("'{field}' file is empty"))),
        None => Err(AppError::BadRequest(format!(
            "Missing required '{field}' file"
        ))),
    }
}

async fn read_upload(mut multipart: Multipart) -> AppResult<BeatUpload> {
    let mut upload = BeatUpload::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        let name = field.name().unwrap_or("").to_string();
        if name == "metadata" {
            let text = field
                .text()
                .await
                .map_err(|e| AppError::BadRequest(e.to_string()))?;
            let metadata = serde_json::from_str(&text)
                .map_err(|e| AppError::BadRequest(format!("Invalid metadata: {e}")))?;
            upload.metadata = Some(metadata);
            continue;
        }

        let slot = match name.as_str() {
            "preview" => &mut upload.preview,
            "cover" => &mut upload.cover,
            "mp3" => &mut upload.mp3,
            "wav" => &mut upload.wav,
            "stems" => &mut upload.stems,
            _ => continue, // ignore unknown fields
        };
        let filename = field
            .file_name()
            .map(str::to_string)
            .unwrap_or_else(|| name.clone());
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        *slot = Some(UploadedFile {
            filename,
            bytes: bytes.to_vec(),
        });
    }
    Ok(upload)
}

async fn store(state: &AppState, key: String, file: UploadedFile) -> AppResult<String> {
    state
        .storage
        .put(&key, file.bytes, content_type_for(&file.filename))
        .await
        .map_err(|e| AppError::InternalError(e.to_string()))?;
    Ok(key)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/admin/beats
pub async fn list_beats(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Query(params): Query<AdminBeatQuery>,
) -> AppResult<Json<DataResponse<Page<Beat>>>> {
    let status: CatalogStatus = match params.status.as_deref() {
        Some(status) => status.parse()?,
        None => CatalogStatus::Active,
    };
    let (limit, offset) = PaginationParams {
        limit: params.limit,
        offset: params.offset,
    }
    .clamped();
    let filter = BeatFilter {
        is_active: status.is_active(),
        genre: normalize_tag(params.genre.as_deref()),
        search: like_pattern(params.search.as_deref()),
        limit,
        offset,
        ..Default::default()
    };

    let items = BeatRepo::list(&state.pool, &filter).await?;
    let total = BeatRepo::count(&state.pool, &filter).await?;
    Ok(Json(DataResponse {
        data: Page {
            items,
            total,
            limit,
            offset,
        },
    }))
}

/// GET /api/v1/admin/beats/{id}
pub async fn get_beat(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Beat>>> {
    let beat = BeatRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "beat", id }))?;
    Ok(Json(DataResponse { data: beat }))
}

/// POST /api/v1/admin/beats (multipart)
pub async fn create_beat(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<DataResponse<Beat>>)> {
    let upload = read_upload(multipart).await?;
    let metadata = upload
        .metadata
        .ok_or_else(|| AppError::BadRequest("Missing required 'metadata' field".into()))?;
    validate_fields(
        &metadata.title,
        metadata.bpm,
        &metadata.musical_key,
        &metadata.licenses,
    )?;
    let preview = required(upload.preview, "preview")?;
    let cover = required(upload.cover, "cover")?;
    let mp3 = required(upload.mp3, "mp3")?;
    let wav = required(upload.wav, "wav")?;
    let stems = required(upload.stems, "stems")?;

    let id = BeatRepo::reserve_id(&state.pool).await?;
    let input = CreateBeat {
        id,
        preview_key: store(&state, preview_key(id, &preview.filename), preview).await?,
        cover_key: store(&state, cover_key(id, &cover.filename), cover).await?,
        mp3_key: Some(store(&state, beat_file_key(id, FileKind::Mp3, &mp3.filename), mp3).await?),
        wav_key: Some(store(&state, beat_file_key(id, FileKind::Wav, &wav.filename), wav).await?),
        stems_key: Some(
            store(&state, beat_file_key(id, FileKind::Stems, &stems.filename), stems).await?,
        ),
        title: metadata.title.trim().to_string(),
        bpm: metadata.bpm,
        musical_key: metadata.musical_key.trim().to_string(),
        genres: normalize_labels(&metadata.genres),
        moods: normalize_labels(&metadata.moods),
        tags: normalize_labels(&metadata.tags),
        waveform: metadata.waveform,
        licenses: metadata.licenses,
    };
    let beat = BeatRepo::create(&state.pool, &input).await?;

    tracing::info!(
        beat_id = beat.id,
        title = %beat.title,
        user_id = admin.user_id,
        "Beat created",
    );
    Ok((StatusCode::CREATED, Json(DataResponse { data: beat })))
}

/// PUT /api/v1/admin/beats/{id}
///
/// Replaces every mutable field. Files are not touched. A beat whose
/// exclusive license was sold cannot be made active again.
pub async fn update_beat(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateBeat>,
) -> AppResult<Json<DataResponse<Beat>>> {
    validate_fields(&input.title, input.bpm, &input.musical_key, &input.licenses)?;
    let input = UpdateBeat {
        title: input.title.trim().to_string(),
        musical_key: input.musical_key.trim().to_string(),
        genres: normalize_labels(&input.genres),
        moods: normalize_labels(&input.moods),
        tags: normalize_labels(&input.tags),
        ..input
    };

    if input.is_active && OrderRepo::has_exclusive_sale(&state.pool, id).await? {
        return Err(AppError::Core(CoreError::Conflict(format!(
            "Beat {id} was sold with an exclusive license and cannot be reactivated"
        ))));
    }

    let beat = BeatRepo::update(&state.pool, id, &input)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "beat", id }))?;

    tracing::info!(beat_id = id, user_id = admin.user_id, "Beat updated");
    Ok(Json(DataResponse { data: beat }))
}

/// DELETE /api/v1/admin/beats/{id}
///
/// Soft delete: the beat leaves the storefront but orders and grants keep
/// working. Deleting an already inactive beat is a no-op.
pub async fn delete_beat(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    if BeatRepo::find_by_id(&state.pool, id).await?.is_none() {
        return Err(AppError::Core(CoreError::NotFound { entity: "beat", id }));
    }
    let deactivated = BeatRepo::deactivate(&state.pool, id).await?;
    tracing::info!(beat_id = id, user_id = admin.user_id, deactivated, "Beat deleted");
    Ok(StatusCode::NO_CONTENT)
}

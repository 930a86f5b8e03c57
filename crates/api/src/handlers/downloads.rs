//! Download gates: account grants and guest links.

use axum::extract::{Path, State};
use axum::http::header::CACHE_CONTROL;
use axum::response::IntoResponse;
use axum::Json;
use beatstore_core::access::DOWNLOAD_URL_TTL_SECS;
use beatstore_core::licensing::FileKind;
use beatstore_core::types::{DbId, Timestamp};
use beatstore_db::models::download::Download;
use beatstore_db::repositories::DownloadRepo;
use beatstore_pipeline::access::{guest_download, guest_order_view, user_download, GuestOrderView};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

fn cache_control() -> (axum::http::HeaderName, String) {
    (CACHE_CONTROL, format!("private, max-age={DOWNLOAD_URL_TTL_SECS}"))
}

// ---------------------------------------------------------------------------
// Account grants
// ---------------------------------------------------------------------------

/// A grant as listed to its owner. Storage keys stay server-side.
#[derive(Debug, Serialize)]
pub struct GrantView {
    pub id: DbId,
    pub order_id: DbId,
    pub beat_id: DbId,
    pub beat_title: String,
    pub license_tier: String,
    pub download_count: i32,
    pub expires_at: Timestamp,
    pub is_expired: bool,
    pub files: Vec<FileKind>,
}

impl GrantView {
    fn new(grant: Download, now: Timestamp) -> Self {
        Self {
            files: grant.files().available_kinds(),
            is_expired: now > grant.expires_at,
            id: grant.id,
            order_id: grant.order_id,
            beat_id: grant.beat_id,
            beat_title: grant.beat_title,
            license_tier: grant.license_tier,
            download_count: grant.download_count,
            expires_at: grant.expires_at,
        }
    }
}

/// GET /api/v1/downloads
pub async fn list_my_downloads(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<Json<DataResponse<Vec<GrantView>>>> {
    let now = Utc::now();
    let grants = DownloadRepo::list_for_user(&state.pool, auth_user.user_id).await?;
    Ok(Json(DataResponse {
        data: grants.into_iter().map(|g| GrantView::new(g, now)).collect(),
    }))
}

/// GET /api/v1/downloads/{id}/{kind}
///
/// Returns `{url, filename, expires_in_secs}`. 400 for an unknown kind, 403
/// for someone else's grant, 410 once expired, 404 if the license does not
/// include the file.
pub async fn sign_download(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path((id, kind)): Path<(DbId, String)>,
) -> AppResult<impl IntoResponse> {
    let kind: FileKind = kind.parse()?;
    let signed = user_download(
        &state.pool,
        state.storage.as_ref(),
        &state.event_bus,
        auth_user.user_id,
        id,
        kind,
        Utc::now(),
    )
    .await?;
    Ok(([cache_control()], Json(signed)))
}

// ---------------------------------------------------------------------------
// Guest links
// ---------------------------------------------------------------------------

/// GET /api/v1/guest-downloads/{token}
///
/// Describes the order without consuming a download.
pub async fn get_guest_order(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> AppResult<Json<DataResponse<GuestOrderView>>> {
    let view = guest_order_view(&state.pool, &token, Utc::now()).await?;
    Ok(Json(DataResponse { data: view }))
}

#[derive(Debug, Deserialize)]
pub struct GuestDownloadRequest {
    pub beat_id: DbId,
    pub file: String,
}

/// POST /api/v1/guest-downloads/{token}
///
/// Consumes one of the link's downloads and returns
/// `{download_count, remaining, url, filename, expires_in_secs}`.
pub async fn consume_guest_download(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(input): Json<GuestDownloadRequest>,
) -> AppResult<impl IntoResponse> {
    let kind: FileKind = input.file.parse()?;
    let download = guest_download(
        &state.pool,
        state.storage.as_ref(),
        &state.event_bus,
        &token,
        input.beat_id,
        kind,
        Utc::now(),
    )
    .await?;
    Ok(([cache_control()], Json(download)))
}

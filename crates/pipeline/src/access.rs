//! Download access gates.
//!
//! Registered users download through per-item grants: unlimited fetches
//! until the grant expires. Guests download through the single token on
//! their order: at most [`GUEST_DOWNLOAD_LIMIT`] fetches in total before
//! the link expires. Both gates hand out short-lived signed URLs that force
//! an attachment download; neither streams file bytes itself.

use std::time::Duration;

use beatstore_cloud::storage::ObjectStorage;
use beatstore_core::access::{
    check_grant_access, check_guest_access, remaining_guest_downloads, DOWNLOAD_URL_TTL_SECS,
    GUEST_DOWNLOAD_LIMIT,
};
use beatstore_core::error::CoreError;
use beatstore_core::licensing::{resolve_entitled_files, EntitledFiles, FileKind, LicenseTier};
use beatstore_core::storage_keys::{contract_key, download_filename};
use beatstore_core::types::{DbId, MinorUnits, Timestamp};
use beatstore_db::models::order::{Order, OrderItem};
use beatstore_db::repositories::order_repo::GuestTokenState;
use beatstore_db::repositories::{BeatRepo, DownloadRepo, OrderRepo};
use beatstore_events::{EventBus, StoreEvent};
use serde::Serialize;
use sqlx::PgPool;

use crate::PipelineError;

/// A signed, short-lived attachment URL.
#[derive(Debug, Clone, Serialize)]
pub struct SignedDownload {
    pub url: String,
    pub filename: String,
    pub expires_in_secs: u64,
}

async fn sign(
    storage: &dyn ObjectStorage,
    key: &str,
    filename: String,
) -> Result<SignedDownload, PipelineError> {
    let url = storage
        .presigned_download_url(key, &filename, Duration::from_secs(DOWNLOAD_URL_TTL_SECS))
        .await?;
    Ok(SignedDownload {
        url,
        filename,
        expires_in_secs: DOWNLOAD_URL_TTL_SECS,
    })
}

// ---------------------------------------------------------------------------
// Registered users
// ---------------------------------------------------------------------------

/// Sign `kind` of grant `download_id` for `caller_id`.
///
/// The served counter is bumped out of band through a `download.served`
/// event; losing that update never fails the download.
pub async fn user_download(
    pool: &PgPool,
    storage: &dyn ObjectStorage,
    events: &EventBus,
    caller_id: DbId,
    download_id: DbId,
    kind: FileKind,
    now: Timestamp,
) -> Result<SignedDownload, PipelineError> {
    let grant = DownloadRepo::find_by_id(pool, download_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "download",
            id: download_id,
        })?;
    check_grant_access(grant.user_id, caller_id, grant.expires_at, now)?;

    let files = grant.files();
    let key = files.key_for(kind).ok_or_else(|| {
        CoreError::Missing(format!("{kind} file is not included in download {download_id}"))
    })?;
    let filename = download_filename(&grant.beat_title, grant.license_tier()?, kind);
    let signed = sign(storage, key, filename).await?;

    events.publish(StoreEvent::download_served(grant.id, caller_id, kind.as_str()));
    tracing::debug!(download_id, user_id = caller_id, file = %kind, "Download URL issued");
    Ok(signed)
}

// ---------------------------------------------------------------------------
// Guests
// ---------------------------------------------------------------------------

/// One item of a guest order with the files its license grants.
#[derive(Debug, Clone, Serialize)]
pub struct GuestItemView {
    pub beat_id: DbId,
    pub beat_title: String,
    pub license_tier: LicenseTier,
    pub price: MinorUnits,
    pub files: Vec<FileKind>,
}

/// What a guest sees when opening their download link.
#[derive(Debug, Clone, Serialize)]
pub struct GuestOrderView {
    pub order_number: String,
    pub created_at: Timestamp,
    pub total_amount: MinorUnits,
    pub currency: String,
    pub items: Vec<GuestItemView>,
    pub download_count: i32,
    pub remaining: i32,
    pub expires_at: Option<Timestamp>,
}

/// Result of a consumed guest download.
#[derive(Debug, Clone, Serialize)]
pub struct GuestDownload {
    pub download_count: i32,
    pub remaining: i32,
    #[serde(flatten)]
    pub signed: SignedDownload,
}

async fn find_guest_order(pool: &PgPool, token: &str) -> Result<Order, PipelineError> {
    OrderRepo::find_by_guest_token(pool, token)
        .await?
        .ok_or_else(|| CoreError::Missing("download link".into()).into())
}

/// Files an order item grants, computed from the beat as it is now.
///
/// A deleted beat grants nothing but its contract.
async fn item_files(
    pool: &PgPool,
    order: &Order,
    item: &OrderItem,
) -> Result<EntitledFiles, PipelineError> {
    let contract = Some(contract_key(&order.order_number, item.beat_id));
    let Some(beat) = BeatRepo::find_by_id(pool, item.beat_id).await? else {
        return Ok(EntitledFiles {
            contract,
            ..Default::default()
        });
    };
    let features = beat
        .license(item.license_tier)
        .map(|license| license.features)
        .unwrap_or_else(|| item.license_tier.default_features());
    Ok(resolve_entitled_files(&features, &beat.files(), contract))
}

/// Describe a guest order without consuming a download.
pub async fn guest_order_view(
    pool: &PgPool,
    token: &str,
    now: Timestamp,
) -> Result<GuestOrderView, PipelineError> {
    let order = find_guest_order(pool, token).await?;
    check_guest_access(
        order.is_guest_order,
        order.guest_download_count,
        order.guest_download_expires_at,
        now,
    )?;

    let mut items = Vec::with_capacity(order.items.0.len());
    for item in &order.items.0 {
        let files = item_files(pool, &order, item).await?;
        items.push(GuestItemView {
            beat_id: item.beat_id,
            beat_title: item.beat_title.clone(),
            license_tier: item.license_tier,
            price: item.price,
            files: files.available_kinds(),
        });
    }

    Ok(GuestOrderView {
        order_number: order.order_number,
        created_at: order.created_at,
        total_amount: order.total_amount,
        currency: order.currency,
        items,
        download_count: order.guest_download_count,
        remaining: remaining_guest_downloads(order.guest_download_count),
        expires_at: order.guest_download_expires_at,
    })
}

/// Consume one guest download and sign `kind` of `beat_id`.
///
/// The file is resolved and signed first so a bad request never burns
/// quota; the counter is then bumped by a single conditional update, so
/// concurrent requests can never exceed the limit. The URL is returned only
/// if that update succeeded.
pub async fn guest_download(
    pool: &PgPool,
    storage: &dyn ObjectStorage,
    events: &EventBus,
    token: &str,
    beat_id: DbId,
    kind: FileKind,
    now: Timestamp,
) -> Result<GuestDownload, PipelineError> {
    let order = find_guest_order(pool, token).await?;
    check_guest_access(
        order.is_guest_order,
        order.guest_download_count,
        order.guest_download_expires_at,
        now,
    )?;

    let item = order.item(beat_id).ok_or_else(|| {
        CoreError::Missing(format!("beat {beat_id} in order {}", order.order_number))
    })?;
    let files = item_files(pool, &order, item).await?;
    let key = files.key_for(kind).ok_or_else(|| {
        CoreError::Missing(format!("{kind} file is not included for beat {beat_id}"))
    })?;
    let signed = sign(
        storage,
        key,
        download_filename(&item.beat_title, item.license_tier, kind),
    )
    .await?;

    let Some(download_count) =
        OrderRepo::consume_guest_download(pool, token, GUEST_DOWNLOAD_LIMIT).await?
    else {
        let state = OrderRepo::guest_token_state(pool, token).await?;
        return Err(refusal(state, now).into());
    };

    events.publish(StoreEvent::guest_download_served(
        order.id,
        beat_id,
        kind.as_str(),
    ));
    tracing::info!(
        order_id = order.id,
        beat_id,
        file = %kind,
        download_count,
        "Guest download consumed"
    );

    Ok(GuestDownload {
        download_count,
        remaining: remaining_guest_downloads(download_count),
        signed,
    })
}

/// Explain why the conditional increment matched no row.
fn refusal(state: Option<GuestTokenState>, now: Timestamp) -> CoreError {
    let Some(state) = state else {
        return CoreError::Missing("download link".into());
    };
    match check_guest_access(
        state.is_guest_order,
        state.guest_download_count,
        state.guest_download_expires_at,
        now,
    ) {
        Err(err) => err,
        // Lost a race that the re-read no longer shows; report the quota.
        Ok(()) => CoreError::QuotaExceeded(format!(
            "Download limit of {GUEST_DOWNLOAD_LIMIT} reached"
        )),
    }
}

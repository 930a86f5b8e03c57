//! Best-effort download counters.
//!
//! [`DownloadTelemetry`] subscribes to the [`EventBus`](crate::bus::EventBus)
//! and bumps `downloads.download_count` for every `download.served` event.
//! Delivery is at-most-once: a failed or lagged update is logged and never
//! retried, and the request that published the event never waits on it.

use beatstore_db::repositories::DownloadRepo;
use beatstore_db::DbPool;
use tokio::sync::broadcast;

use crate::bus::{StoreEvent, DOWNLOAD_SERVED};

/// Background service applying download counters.
pub struct DownloadTelemetry;

impl DownloadTelemetry {
    /// Run the counter loop until the bus is dropped.
    pub async fn run(pool: DbPool, mut receiver: broadcast::Receiver<StoreEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => Self::apply(&pool, &event).await,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Download telemetry lagged, counters undercounted");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, download telemetry shutting down");
                    break;
                }
            }
        }
    }

    async fn apply(pool: &DbPool, event: &StoreEvent) {
        let Some(download_id) = Self::served_download(event) else {
            return;
        };
        match DownloadRepo::increment_count(pool, download_id).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::warn!(download_id, "Served download no longer exists");
            }
            Err(e) => {
                tracing::warn!(error = %e, download_id, "Failed to bump download counter");
            }
        }
    }

    /// Grant id of a `download.served` event, `None` for anything else.
    fn served_download(event: &StoreEvent) -> Option<i64> {
        if event.name != DOWNLOAD_SERVED {
            return None;
        }
        event.entity_id_of("download")
    }
}

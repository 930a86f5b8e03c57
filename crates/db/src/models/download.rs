//! Download grant model and DTOs.

use beatstore_core::error::CoreError;
use beatstore_core::licensing::{EntitledFiles, LicenseTier};
use beatstore_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A registered user's right to fetch the files of one purchased item.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Download {
    pub id: DbId,
    pub order_id: DbId,
    pub user_id: DbId,
    pub beat_id: DbId,
    pub beat_title: String,
    pub license_tier: String,
    pub download_count: i32,
    pub expires_at: Timestamp,
    pub mp3_key: Option<String>,
    pub wav_key: Option<String>,
    pub stems_key: Option<String>,
    pub contract_key: Option<String>,
    pub created_at: Timestamp,
}

impl Download {
    pub fn license_tier(&self) -> Result<LicenseTier, CoreError> {
        self.license_tier.parse()
    }

    /// Files frozen onto this grant at issuance.
    pub fn files(&self) -> EntitledFiles {
        EntitledFiles {
            mp3: self.mp3_key.clone(),
            wav: self.wav_key.clone(),
            stems: self.stems_key.clone(),
            contract: self.contract_key.clone(),
        }
    }
}

/// DTO for issuing a grant.
#[derive(Debug, Clone)]
pub struct CreateDownload {
    pub order_id: DbId,
    pub user_id: DbId,
    pub beat_id: DbId,
    pub beat_title: String,
    pub license_tier: LicenseTier,
    pub expires_at: Timestamp,
    pub files: EntitledFiles,
}

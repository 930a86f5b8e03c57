//! Beat entity model and DTOs.

use beatstore_core::licensing::{find_license, BeatFiles, License, LicenseTier};
use beatstore_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

/// Pre-computed preview waveform for the storefront player.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Waveform {
    #[serde(default)]
    pub peaks: Vec<f32>,
    #[serde(default)]
    pub duration_secs: f64,
}

/// Full beat row from the `beats` table.
///
/// Carries the storage keys of the full-quality files. Storefront responses
/// must go through a projection that drops them.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Beat {
    pub id: DbId,
    pub title: String,
    pub bpm: i32,
    pub musical_key: String,
    pub genres: Vec<String>,
    pub moods: Vec<String>,
    pub tags: Vec<String>,
    pub preview_key: String,
    pub cover_key: String,
    pub mp3_key: Option<String>,
    pub wav_key: Option<String>,
    pub stems_key: Option<String>,
    pub waveform: Json<Waveform>,
    pub licenses: Json<Vec<License>>,
    pub is_active: bool,
    pub plays: i64,
    pub sales: i64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Beat {
    /// The beat's full-quality file keys.
    pub fn files(&self) -> BeatFiles {
        BeatFiles {
            mp3: self.mp3_key.clone(),
            wav: self.wav_key.clone(),
            stems: self.stems_key.clone(),
        }
    }

    /// License entry for `tier`, if offered.
    pub fn license(&self, tier: LicenseTier) -> Option<&License> {
        find_license(&self.licenses.0, tier)
    }
}

/// DTO for inserting a beat under a previously reserved id.
#[derive(Debug, Clone)]
pub struct CreateBeat {
    pub id: DbId,
    pub title: String,
    pub bpm: i32,
    pub musical_key: String,
    pub genres: Vec<String>,
    pub moods: Vec<String>,
    pub tags: Vec<String>,
    pub preview_key: String,
    pub cover_key: String,
    pub mp3_key: Option<String>,
    pub wav_key: Option<String>,
    pub stems_key: Option<String>,
    pub waveform: Waveform,
    pub licenses: Vec<License>,
}

/// DTO replacing a beat's mutable metadata. File keys are not touched.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateBeat {
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
    pub is_active: bool,
}

/// Listing filter. `None` fields are not applied.
#[derive(Debug, Clone, Default)]
pub struct BeatFilter {
    pub is_active: Option<bool>,
    pub genre: Option<String>,
    pub mood: Option<String>,
    /// Already-escaped `ILIKE` pattern matched against title and tags.
    pub search: Option<String>,
    pub bpm_min: Option<i32>,
    pub bpm_max: Option<i32>,
    pub limit: i64,
    pub offset: i64,
}

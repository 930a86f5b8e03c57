//! License tiers, per-tier feature sets, and file entitlement resolution.
//!
//! A beat carries up to one [`License`] per [`LicenseTier`]. What a buyer may
//! download is decided solely by the purchased license's [`LicenseFeatures`]:
//! a beat may have lossless and stems files uploaded, but a `basic` buyer only
//! ever sees the compressed audio.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::MinorUnits;

/// Sentinel for "no ceiling" on stream and physical-sale counts.
pub const UNLIMITED: i64 = -1;

// ---------------------------------------------------------------------------
// Tier
// ---------------------------------------------------------------------------

/// Fixed enumeration of license tiers, ordered from cheapest to exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LicenseTier {
    Basic,
    Standard,
    Pro,
    Unlimited,
    Exclusive,
}

impl LicenseTier {
    pub const ALL: [LicenseTier; 5] = [
        Self::Basic,
        Self::Standard,
        Self::Pro,
        Self::Unlimited,
        Self::Exclusive,
    ];

    /// Lowercase wire/database name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Standard => "standard",
            Self::Pro => "pro",
            Self::Unlimited => "unlimited",
            Self::Exclusive => "exclusive",
        }
    }

    /// Feature set used when an admin creates a license without specifying one.
    pub fn default_features(self) -> LicenseFeatures {
        match self {
            Self::Basic => LicenseFeatures {
                mp3: true,
                wav: false,
                stems: false,
                streams: 5_000,
                physical_sales: 500,
                exclusive: false,
            },
            Self::Standard => LicenseFeatures {
                mp3: true,
                wav: true,
                stems: false,
                streams: 50_000,
                physical_sales: 2_000,
                exclusive: false,
            },
            Self::Pro => LicenseFeatures {
                mp3: true,
                wav: true,
                stems: true,
                streams: 500_000,
                physical_sales: 10_000,
                exclusive: false,
            },
            Self::Unlimited => LicenseFeatures {
                mp3: true,
                wav: true,
                stems: true,
                streams: UNLIMITED,
                physical_sales: UNLIMITED,
                exclusive: false,
            },
            Self::Exclusive => LicenseFeatures {
                mp3: true,
                wav: true,
                stems: true,
                streams: UNLIMITED,
                physical_sales: UNLIMITED,
                exclusive: true,
            },
        }
    }
}

impl fmt::Display for LicenseTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LicenseTier {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|tier| tier.as_str() == s)
            .ok_or_else(|| CoreError::Validation(format!("Unknown license tier '{s}'")))
    }
}

// ---------------------------------------------------------------------------
// License
// ---------------------------------------------------------------------------

/// What a license tier grants the buyer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseFeatures {
    pub mp3: bool,
    pub wav: bool,
    pub stems: bool,
    /// Stream-count ceiling, [`UNLIMITED`] for none.
    pub streams: i64,
    /// Physical-sale ceiling, [`UNLIMITED`] for none.
    pub physical_sales: i64,
    pub exclusive: bool,
}

/// One purchasable license entry embedded in a beat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct License {
    pub tier: LicenseTier,
    /// Price in minor currency units.
    pub price: MinorUnits,
    pub is_available: bool,
    pub features: LicenseFeatures,
}

impl License {
    /// Whether selling this license must retire the beat from the catalog.
    pub fn is_exclusive(&self) -> bool {
        self.tier == LicenseTier::Exclusive || self.features.exclusive
    }
}

/// Find the license entry for `tier`, if the beat offers one.
pub fn find_license(licenses: &[License], tier: LicenseTier) -> Option<&License> {
    licenses.iter().find(|l| l.tier == tier)
}

/// Validate a beat's license list: non-empty, one entry per tier, prices >= 0,
/// feature ceilings either [`UNLIMITED`] or non-negative.
pub fn validate_licenses(licenses: &[License]) -> Result<(), CoreError> {
    if licenses.is_empty() {
        return Err(CoreError::Validation(
            "A beat must offer at least one license".into(),
        ));
    }

    let mut seen = HashSet::new();
    for license in licenses {
        if !seen.insert(license.tier) {
            return Err(CoreError::Validation(format!(
                "Duplicate license tier '{}'",
                license.tier
            )));
        }
        if license.price < 0 {
            return Err(CoreError::Validation(format!(
                "License '{}' has a negative price",
                license.tier
            )));
        }
        for (name, value) in [
            ("streams", license.features.streams),
            ("physical_sales", license.features.physical_sales),
        ] {
            if value < UNLIMITED {
                return Err(CoreError::Validation(format!(
                    "License '{}' has an invalid {name} ceiling {value}",
                    license.tier
                )));
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// File kinds and entitlement resolution
// ---------------------------------------------------------------------------

/// A downloadable asset kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    /// Compressed audio.
    Mp3,
    /// Lossless audio.
    Wav,
    /// Multitrack stems archive.
    Stems,
    /// Generated license contract.
    Contract,
}

impl FileKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::Wav => "wav",
            Self::Stems => "stems",
            Self::Contract => "contract",
        }
    }

    /// File extension used when naming the downloaded attachment.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::Wav => "wav",
            Self::Stems => "zip",
            Self::Contract => "pdf",
        }
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mp3" => Ok(Self::Mp3),
            "wav" => Ok(Self::Wav),
            "stems" => Ok(Self::Stems),
            "contract" => Ok(Self::Contract),
            other => Err(CoreError::Validation(format!(
                "Unknown file kind '{other}'. Must be one of: mp3, wav, stems, contract"
            ))),
        }
    }
}

/// Storage keys of a beat's full-quality files. Each is optional until uploaded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeatFiles {
    pub mp3: Option<String>,
    pub wav: Option<String>,
    pub stems: Option<String>,
}

/// Files a buyer is entitled to, after feature filtering.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitledFiles {
    pub mp3: Option<String>,
    pub wav: Option<String>,
    pub stems: Option<String>,
    pub contract: Option<String>,
}

impl EntitledFiles {
    /// Storage key for `kind`, if this entitlement includes it.
    pub fn key_for(&self, kind: FileKind) -> Option<&str> {
        match kind {
            FileKind::Mp3 => self.mp3.as_deref(),
            FileKind::Wav => self.wav.as_deref(),
            FileKind::Stems => self.stems.as_deref(),
            FileKind::Contract => self.contract.as_deref(),
        }
    }

    /// Kinds present, in display order.
    pub fn available_kinds(&self) -> Vec<FileKind> {
        [FileKind::Mp3, FileKind::Wav, FileKind::Stems, FileKind::Contract]
            .into_iter()
            .filter(|kind| self.key_for(*kind).is_some())
            .collect()
    }
}

/// Resolve the files a license grants from the beat's uploaded files.
///
/// A file is included only when the feature flag is set AND the beat has it.
pub fn resolve_entitled_files(
    features: &LicenseFeatures,
    files: &BeatFiles,
    contract: Option<String>,
) -> EntitledFiles {
    EntitledFiles {
        mp3: files.mp3.clone().filter(|_| features.mp3),
        wav: files.wav.clone().filter(|_| features.wav),
        stems: files.stems.clone().filter(|_| features.stems),
        contract,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

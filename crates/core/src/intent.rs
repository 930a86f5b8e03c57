//! Checkout intent carried through the payment session's metadata.
//!
//! The payment processor stores a flat string-to-string map on the session
//! and hands it back in the completion webhook. [`CheckoutIntent`] is the
//! typed view of that map. Parsing fails closed: any missing or malformed
//! field is an error, never a default.
//!
//! Metadata values are capped at [`METADATA_VALUE_LIMIT`] characters by the
//! processor, so the serialized item list is split across `items_0`,
//! `items_1`, ... with the chunk count stored under `items_chunks`.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use validator::ValidateEmail;

use crate::error::CoreError;
use crate::licensing::LicenseTier;
use crate::locale::Locale;
use crate::pricing::cart_total;
use crate::types::{DbId, MinorUnits};

/// Maximum characters per metadata value accepted by the payment processor.
pub const METADATA_VALUE_LIMIT: usize = 500;

pub const KEY_MODE: &str = "mode";
pub const KEY_USER_ID: &str = "user_id";
pub const KEY_GUEST_EMAIL: &str = "guest_email";
pub const KEY_ITEMS_CHUNKS: &str = "items_chunks";
pub const KEY_LOCALE: &str = "locale";

const MODE_USER: &str = "user";
const MODE_GUEST: &str = "guest";

/// Who is paying.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Buyer {
    User { user_id: DbId },
    Guest { email: String },
}

impl Buyer {
    /// Build a guest buyer, validating and case-normalizing the email.
    pub fn guest(email: &str) -> Result<Self, CoreError> {
        Ok(Self::Guest {
            email: normalize_email(email)?,
        })
    }

    pub fn is_guest(&self) -> bool {
        matches!(self, Self::Guest { .. })
    }
}

/// One line item as priced at checkout time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentItem {
    pub beat_id: DbId,
    pub title: String,
    pub tier: LicenseTier,
    pub price: MinorUnits,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutIntent {
    pub buyer: Buyer,
    pub items: Vec<IntentItem>,
    pub locale: Locale,
}

impl CheckoutIntent {
    /// Sum of the snapshotted item prices.
    pub fn total(&self) -> Result<MinorUnits, CoreError> {
        cart_total(self.items.iter().map(|item| item.price))
    }

    /// Flatten into payment-session metadata.
    pub fn to_metadata(&self) -> Result<BTreeMap<String, String>, CoreError> {
        let mut metadata = BTreeMap::new();
        match &self.buyer {
            Buyer::User { user_id } => {
                metadata.insert(KEY_MODE.to_string(), MODE_USER.to_string());
                metadata.insert(KEY_USER_ID.to_string(), user_id.to_string());
            }
            Buyer::Guest { email } => {
                metadata.insert(KEY_MODE.to_string(), MODE_GUEST.to_string());
                metadata.insert(KEY_GUEST_EMAIL.to_string(), email.clone());
            }
        }

        let items = serde_json::to_string(&self.items)
            .map_err(|e| CoreError::Internal(format!("Failed to encode items: {e}")))?;
        let chunks = split_chunks(&items, METADATA_VALUE_LIMIT);
        metadata.insert(KEY_ITEMS_CHUNKS.to_string(), chunks.len().to_string());
        for (i, chunk) in chunks.into_iter().enumerate() {
            metadata.insert(format!("items_{i}"), chunk);
        }

        metadata.insert(KEY_LOCALE.to_string(), self.locale.as_str().to_string());
        Ok(metadata)
    }

    /// Parse session metadata back into an intent.
    pub fn from_metadata(metadata: &HashMap<String, String>) -> Result<Self, CoreError> {
        let field = |key: &str| {
            metadata
                .get(key)
                .map(String::as_str)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| CoreError::Validation(format!("Session metadata is missing '{key}'")))
        };

        let buyer = match field(KEY_MODE)? {
            MODE_USER => {
                let user_id = field(KEY_USER_ID)?.parse::<DbId>().map_err(|_| {
                    CoreError::Validation("Session metadata has a non-numeric user_id".into())
                })?;
                Buyer::User { user_id }
            }
            MODE_GUEST => Buyer::guest(field(KEY_GUEST_EMAIL)?)?,
            other => {
                return Err(CoreError::Validation(format!(
                    "Session metadata has unknown mode '{other}'"
                )))
            }
        };

        let chunk_count = field(KEY_ITEMS_CHUNKS)?.parse::<usize>().map_err(|_| {
            CoreError::Validation("Session metadata has a non-numeric items_chunks".into())
        })?;
        let mut items_json = String::new();
        for i in 0..chunk_count {
            items_json.push_str(field(&format!("items_{i}"))?);
        }
        let items: Vec<IntentItem> = serde_json::from_str(&items_json)
            .map_err(|e| CoreError::Validation(format!("Session items are malformed: {e}")))?;
        if items.is_empty() {
            return Err(CoreError::Validation(
                "Session metadata contains no line items".into(),
            ));
        }

        let locale = metadata
            .get(KEY_LOCALE)
            .map(|tag| Locale::from_tag(tag))
            .unwrap_or_default();

        Ok(Self {
            buyer,
            items,
            locale,
        })
    }
}

/// Validate an email address and lower-case it.
pub fn normalize_email(email: &str) -> Result<String, CoreError> {
    let normalized = email.trim().to_lowercase();
    if !normalized.validate_email() {
        return Err(CoreError::Validation(format!(
            "'{}' is not a valid email address",
            email.trim()
        )));
    }
    Ok(normalized)
}

/// Split `s` into pieces of at most `limit` characters, on char boundaries.
fn split_chunks(s: &str, limit: usize) -> Vec<String> {
    let chars: Vec<char> = s.chars().collect();
    chars
        .chunks(limit.max(1))
        .map(|chunk| chunk.iter().collect())
        .collect()
}

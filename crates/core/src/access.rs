//! Download access policy: grant expiry, guest quota, and token generation.
//!
//! Registered buyers get one grant per purchased item, valid for
//! [`GRANT_VALIDITY_DAYS`] with no download ceiling. Guests get a single
//! token on the order itself, valid for [`GUEST_ACCESS_DAYS`] and limited to
//! [`GUEST_DOWNLOAD_LIMIT`] downloads in total.

use chrono::Duration;
use rand::distr::Alphanumeric;
use rand::Rng;

use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

/// Days a registered user's download grant stays valid.
pub const GRANT_VALIDITY_DAYS: i64 = 30;

/// Days a guest download token stays valid.
pub const GUEST_ACCESS_DAYS: i64 = 30;

/// Total downloads a guest token allows across all items of the order.
pub const GUEST_DOWNLOAD_LIMIT: i32 = 3;

/// Lifetime of a signed direct download URL.
pub const DOWNLOAD_URL_TTL_SECS: u64 = 15 * 60;

/// Bytes of randomness in a guest token (hex-encoded to twice as many chars).
const GUEST_TOKEN_BYTES: usize = 32;

/// Length of the random suffix of an order number.
const ORDER_SUFFIX_LEN: usize = 6;

pub fn grant_expiry(issued_at: Timestamp) -> Timestamp {
    issued_at + Duration::days(GRANT_VALIDITY_DAYS)
}

pub fn guest_expiry(issued_at: Timestamp) -> Timestamp {
    issued_at + Duration::days(GUEST_ACCESS_DAYS)
}

/// Check a registered user's access to a grant.
///
/// Ownership is checked before expiry so a stranger never learns whether a
/// grant is still live.
pub fn check_grant_access(
    owner_id: DbId,
    caller_id: DbId,
    expires_at: Timestamp,
    now: Timestamp,
) -> Result<(), CoreError> {
    if owner_id != caller_id {
        return Err(CoreError::Forbidden(
            "This download belongs to another account".into(),
        ));
    }
    if now > expires_at {
        return Err(CoreError::Gone("This download link has expired".into()));
    }
    Ok(())
}

/// Check a guest token's order against the guest rules.
pub fn check_guest_access(
    is_guest_order: bool,
    download_count: i32,
    expires_at: Option<Timestamp>,
    now: Timestamp,
) -> Result<(), CoreError> {
    if !is_guest_order {
        return Err(CoreError::Forbidden(
            "This order is not a guest order".into(),
        ));
    }
    match expires_at {
        Some(expires_at) if now <= expires_at => {}
        _ => return Err(CoreError::Gone("This download link has expired".into())),
    }
    if download_count >= GUEST_DOWNLOAD_LIMIT {
        return Err(CoreError::QuotaExceeded(format!(
            "Download limit of {GUEST_DOWNLOAD_LIMIT} reached"
        )));
    }
    Ok(())
}

/// Downloads a guest has left.
pub fn remaining_guest_downloads(download_count: i32) -> i32 {
    (GUEST_DOWNLOAD_LIMIT - download_count).max(0)
}

/// Generate a cryptographically random, URL-safe guest download token.
pub fn generate_guest_token() -> String {
    let mut bytes = [0u8; GUEST_TOKEN_BYTES];
    rand::rng().fill(&mut bytes);
    hex::encode(bytes)
}

/// Generate a human-readable order number, e.g. `BT-20260314-K3F9QZ`.
pub fn generate_order_number(now: Timestamp) -> String {
    let suffix: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(ORDER_SUFFIX_LEN)
        .map(|b| char::from(b).to_ascii_uppercase())
        .collect();
    format!("BT-{}-{suffix}", now.format("%Y%m%d"))
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn at(day: u32) -> Timestamp {
        Utc.with_ymd_and_hms(2026, 3, day, 12, 0, 0).unwrap()
    }

    // -- Registered-user grants ----------------------------------------------

    #[test]
    fn owner_within_window_is_allowed() {
        assert!(check_grant_access(1, 1, at(20), at(10)).is_ok());
    }

    #[test]
    fn stranger_is_forbidden_even_if_expired() {
        let err = check_grant_access(1, 2, at(5), at(10)).unwrap_err();
        assert!(matches!(err, CoreError::Forbidden(_)));
    }

    #[test]
    fn expired_grant_is_gone() {
        let err = check_grant_access(1, 1, at(9), at(10)).unwrap_err();
        assert!(matches!(err, CoreError::Gone(_)));
    }

    #[test]
    fn grant_expires_thirty_days_after_issue() {
        assert_eq!(grant_expiry(at(1)), at(31));
    }

    // -- Guest tokens -----------------------------------------------------------

    #[test]
    fn guest_under_quota_is_allowed() {
        assert!(check_guest_access(true, 2, Some(at(20)), at(10)).is_ok());
    }

    #[test]
    fn guest_at_quota_is_exhausted() {
        let err = check_guest_access(true, 3, Some(at(20)), at(10)).unwrap_err();
        assert!(matches!(err, CoreError::QuotaExceeded(_)));
    }

    #[test]
    fn guest_expiry_is_distinct_from_quota() {
        let err = check_guest_access(true, 0, Some(at(9)), at(10)).unwrap_err();
        assert!(matches!(err, CoreError::Gone(_)));
    }

    #[test]
    fn guest_without_expiry_is_treated_as_expired() {
        let err = check_guest_access(true, 0, None, at(10)).unwrap_err();
        assert!(matches!(err, CoreError::Gone(_)));
    }

    #[test]
    fn user_order_token_is_forbidden() {
        let err = check_guest_access(false, 0, Some(at(20)), at(10)).unwrap_err();
        assert!(matches!(err, CoreError::Forbidden(_)));
    }

    #[test]
    fn remaining_never_goes_negative() {
        assert_eq!(remaining_guest_downloads(0), 3);
        assert_eq!(remaining_guest_downloads(3), 0);
        assert_eq!(remaining_guest_downloads(7), 0);
    }

    // -- Generators -------------------------------------------------------------

    #[test]
    fn guest_tokens_are_long_hex_and_unique() {
        let a = generate_guest_token();
        let b = generate_guest_token();
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn order_number_embeds_date() {
        let number = generate_order_number(at(14));
        assert!(number.starts_with("BT-20260314-"));
        assert_eq!(number.len(), "BT-20260314-".len() + 6);
        assert!(number
            .chars()
            .all(|c| c == '-' || c.is_ascii_uppercase() || c.is_ascii_digit()));
    }
}

//! Beatstore domain rules.
//!
//! This crate has no internal dependencies so the persistence layer, the
//! fulfillment pipeline, and the HTTP server can all share the same rules:
//!
//! - [`licensing`] -- license tiers, feature sets, file entitlement.
//! - [`pricing`] -- cart totals in minor units, amount formatting.
//! - [`intent`] -- typed checkout intent carried in payment metadata.
//! - [`access`] -- grant expiry, guest quota, tokens, order numbers.
//! - [`signature`] -- payment webhook signature verification.
//! - [`storage_keys`] -- object storage key layout.
//! - [`locale`] -- supported locales and document copy.

pub mod access;
pub mod error;
pub mod intent;
pub mod licensing;
pub mod locale;
pub mod pricing;
pub mod roles;
pub mod search;
pub mod signature;
pub mod storage_keys;
pub mod types;

//! Purchase workflows of the beat store.
//!
//! - [`checkout`] -- price a cart server-side and open a hosted payment session.
//! - [`fulfillment`] -- turn a paid session into an order, contracts, grants,
//!   and a confirmation email.
//! - [`refund`] -- mark an order refunded and revoke its download access.
//! - [`access`] -- the user and guest download gates.
//! - [`contract`] -- license agreement rendering.

pub mod access;
pub mod checkout;
pub mod contract;
pub mod error;
pub mod fulfillment;
pub mod refund;

pub use error::PipelineError;

/// Store-wide settings the workflows need.
#[derive(Debug, Clone)]
pub struct StoreSettings {
    /// ISO currency code, lowercase (e.g. `usd`).
    pub currency: String,
    /// Public site origin used in emails and payment redirects, no trailing slash.
    pub public_base_url: String,
}

impl StoreSettings {
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.public_base_url.trim_end_matches('/'))
    }
}

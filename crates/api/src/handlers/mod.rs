pub mod admin_beats;
pub mod auth;
pub mod beats;
pub mod checkout;
pub mod downloads;
pub mod orders;
pub mod webhooks;

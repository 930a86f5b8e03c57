//! Beatstore event bus and outbound notification infrastructure.
//!
//! - [`EventBus`] -- in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`StoreEvent`] -- the event envelope published on the bus.
//! - [`DownloadTelemetry`] -- background subscriber that applies
//!   download counters from `download.served` events.
//! - [`delivery`] -- order confirmation email over SMTP.

pub mod bus;
pub mod delivery;
pub mod telemetry;

pub use bus::{EventBus, StoreEvent};
pub use delivery::email::{
    ConfirmationLine, EmailConfig, EmailDelivery, EmailError, OrderConfirmation, OrderMailer,
};
pub use telemetry::DownloadTelemetry;

use std::sync::Arc;

use beatstore_cloud::payment::PaymentGateway;
use beatstore_cloud::storage::ObjectStorage;
use beatstore_events::EventBus;
use beatstore_pipeline::fulfillment::FulfillmentService;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable; everything heavy sits behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub pool: beatstore_db::DbPool,
    pub config: Arc<ServerConfig>,
    /// Beat media and license contracts.
    pub storage: Arc<dyn ObjectStorage>,
    /// Hosted checkout sessions.
    pub payments: Arc<dyn PaymentGateway>,
    /// Webhook-driven order fulfillment.
    pub fulfillment: Arc<FulfillmentService>,
    /// Centralized event bus for publishing platform events.
    pub event_bus: Arc<EventBus>,
}

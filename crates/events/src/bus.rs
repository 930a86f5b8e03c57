//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! Publishing never blocks and never fails the publisher. Subscribers that
//! fall behind lose the oldest events, so nothing published here may be
//! required for correctness.

use beatstore_core::types::{DbId, Timestamp};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::broadcast;

pub const ORDER_FULFILLED: &str = "order.fulfilled";
pub const ORDER_REFUNDED: &str = "order.refunded";

/// A registered user was handed a signed URL for one of their grant files.
pub const DOWNLOAD_SERVED: &str = "download.served";

/// A guest link was used for one download.
pub const GUEST_DOWNLOAD_SERVED: &str = "guest_download.served";

/// Something that happened in the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreEvent {
    /// Dot-separated name, one of the constants in this module.
    pub name: String,
    /// Kind of the entity the event is about (`"order"`, `"download"`).
    pub entity: Option<String>,
    pub entity_id: Option<DbId>,
    /// User that caused the event, when known.
    pub actor_id: Option<DbId>,
    pub payload: Value,
    pub occurred_at: Timestamp,
}

impl StoreEvent {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entity: None,
            entity_id: None,
            actor_id: None,
            payload: json!({}),
            occurred_at: Utc::now(),
        }
    }

    pub fn about(mut self, entity: impl Into<String>, id: DbId) -> Self {
        self.entity = Some(entity.into());
        self.entity_id = Some(id);
        self
    }

    pub fn by(mut self, user_id: DbId) -> Self {
        self.actor_id = Some(user_id);
        self
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }

    /// `payload` carries the per-item outcome counts.
    pub fn order_fulfilled(order_id: DbId, payload: Value) -> Self {
        Self::new(ORDER_FULFILLED)
            .about("order", order_id)
            .with_payload(payload)
    }

    pub fn order_refunded(order_id: DbId, grants_revoked: u64) -> Self {
        Self::new(ORDER_REFUNDED)
            .about("order", order_id)
            .with_payload(json!({ "grants_revoked": grants_revoked }))
    }

    /// Grant `download_id` was signed for `user_id`. Drives the download counter.
    pub fn download_served(download_id: DbId, user_id: DbId, file: &str) -> Self {
        Self::new(DOWNLOAD_SERVED)
            .about("download", download_id)
            .by(user_id)
            .with_payload(json!({ "file": file }))
    }

    pub fn guest_download_served(order_id: DbId, beat_id: DbId, file: &str) -> Self {
        Self::new(GUEST_DOWNLOAD_SERVED)
            .about("order", order_id)
            .with_payload(json!({ "beat_id": beat_id, "file": file }))
    }

    /// The entity id if this event is about an entity of kind `entity`.
    pub fn entity_id_of(&self, entity: &str) -> Option<DbId> {
        match self.entity.as_deref() {
            Some(kind) if kind == entity => self.entity_id,
            _ => None,
        }
    }
}

const DEFAULT_CAPACITY: usize = 1024;

/// Fan-out hub shared as `Arc<EventBus>`.
///
/// ```rust
/// use beatstore_events::bus::{EventBus, StoreEvent};
///
/// let bus = EventBus::default();
/// let mut rx = bus.subscribe();
/// bus.publish(StoreEvent::download_served(1, 2, "wav"));
/// ```
pub struct EventBus {
    sender: broadcast::Sender<StoreEvent>,
}

impl EventBus {
    /// A full buffer drops the oldest events; slow receivers then see
    /// `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn publish(&self, event: StoreEvent) {
        // Only fails when nobody is subscribed.
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

//! Test doubles and fixtures shared by the workflow tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use beatstore_cloud::payment::{
    CheckoutSession, CheckoutSessionRequest, CompletedSession, PaymentError, PaymentGateway,
};
use beatstore_cloud::storage::MemoryObjectStorage;
use beatstore_core::intent::{Buyer, CheckoutIntent, IntentItem};
use beatstore_core::licensing::{License, LicenseTier};
use beatstore_core::locale::Locale;
use beatstore_db::models::beat::{Beat, CreateBeat, Waveform};
use beatstore_db::models::user::{CreateUser, User};
use beatstore_db::repositories::{BeatRepo, UserRepo};
use beatstore_events::{EmailError, EventBus, OrderConfirmation, OrderMailer};
use beatstore_core::types::DbId;
use beatstore_pipeline::contract::{
    ContractDetails, ContractError, ContractRenderer, PdfContractRenderer,
};
use beatstore_pipeline::fulfillment::FulfillmentService;
use beatstore_pipeline::StoreSettings;
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Doubles
// ---------------------------------------------------------------------------

/// Records session requests and answers with a fixed session.
#[derive(Default)]
pub struct RecordingGateway {
    pub requests: Mutex<Vec<CheckoutSessionRequest>>,
}

#[async_trait]
impl PaymentGateway for RecordingGateway {
    async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> Result<CheckoutSession, PaymentError> {
        let mut requests = self.requests.lock().unwrap();
        requests.push(request.clone());
        Ok(CheckoutSession {
            id: format!("cs_test_{}", requests.len()),
            url: "https://checkout.test/pay".into(),
        })
    }
}

/// Records confirmations; optionally fails every send.
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<OrderConfirmation>>,
    pub fail: bool,
}

#[async_trait]
impl OrderMailer for RecordingMailer {
    async fn send_order_confirmation(
        &self,
        message: &OrderConfirmation,
    ) -> Result<(), EmailError> {
        if self.fail {
            return Err(EmailError::Build("smtp down".into()));
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

/// Renders real PDFs except for one beat, whose contract always fails.
pub struct FailingContracts {
    pub beat_id: DbId,
}

impl ContractRenderer for FailingContracts {
    fn render(&self, details: &ContractDetails) -> Result<Vec<u8>, ContractError> {
        if details.beat_id == self.beat_id {
            return Err(ContractError::Render("font table missing".into()));
        }
        PdfContractRenderer.render(details)
    }
}

pub fn settings() -> StoreSettings {
    StoreSettings {
        currency: "usd".into(),
        public_base_url: "https://shop.test".into(),
    }
}

pub struct Harness {
    pub storage: Arc<MemoryObjectStorage>,
    pub mailer: Arc<RecordingMailer>,
    pub events: Arc<EventBus>,
    pub service: FulfillmentService,
}

pub fn harness(pool: &PgPool) -> Harness {
    harness_with_mailer(pool, RecordingMailer::default())
}

pub fn harness_with_mailer(pool: &PgPool, mailer: RecordingMailer) -> Harness {
    build_harness(pool, mailer, Arc::new(PdfContractRenderer))
}

pub fn harness_with_contracts(pool: &PgPool, contracts: Arc<dyn ContractRenderer>) -> Harness {
    build_harness(pool, RecordingMailer::default(), contracts)
}

fn build_harness(
    pool: &PgPool,
    mailer: RecordingMailer,
    contracts: Arc<dyn ContractRenderer>,
) -> Harness {
    let storage = Arc::new(MemoryObjectStorage::new());
    let mailer = Arc::new(mailer);
    let events = Arc::new(EventBus::default());
    let service = FulfillmentService::new(
        pool.clone(),
        storage.clone(),
        contracts,
        Some(mailer.clone()),
        events.clone(),
        settings(),
    );
    Harness {
        storage,
        mailer,
        events,
        service,
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub fn license(tier: LicenseTier, price: i64) -> License {
    License {
        tier,
        price,
        is_available: true,
        features: tier.default_features(),
    }
}

pub async fn create_beat(pool: &PgPool, title: &str, licenses: Vec<License>) -> Beat {
    let id = BeatRepo::reserve_id(pool).await.unwrap();
    BeatRepo::create(
        pool,
        &CreateBeat {
            id,
            title: title.to_string(),
            bpm: 140,
            musical_key: "F minor".into(),
            genres: vec!["trap".into()],
            moods: vec![],
            tags: vec![],
            preview_key: format!("previews/{id}/p.mp3"),
            cover_key: format!("covers/{id}/c.jpg"),
            mp3_key: Some(format!("beats/{id}/mp3/full.mp3")),
            wav_key: Some(format!("beats/{id}/wav/full.wav")),
            stems_key: Some(format!("beats/{id}/stems/stems.zip")),
            waveform: Waveform::default(),
            licenses,
        },
    )
    .await
    .unwrap()
}

pub async fn create_user(pool: &PgPool, email: &str) -> User {
    UserRepo::create(
        pool,
        &CreateUser {
            email: email.into(),
            password_hash: "x".into(),
            name: "Dana".into(),
            role: "user".into(),
        },
    )
    .await
    .unwrap()
}

/// A completed session as the webhook would deliver it.
pub fn completed_session(
    session_id: &str,
    buyer: Buyer,
    items: &[(&Beat, LicenseTier)],
) -> CompletedSession {
    let intent = CheckoutIntent {
        buyer,
        items: items
            .iter()
            .map(|(beat, tier)| IntentItem {
                beat_id: beat.id,
                title: beat.title.clone(),
                tier: *tier,
                price: beat.license(*tier).unwrap().price,
            })
            .collect(),
        locale: Locale::En,
    };
    let metadata: HashMap<String, String> = intent.to_metadata().unwrap().into_iter().collect();
    CompletedSession {
        id: session_id.to_string(),
        payment_intent: Some(format!("pi_{session_id}")),
        amount_total: Some(intent.total().unwrap()),
        currency: Some("usd".into()),
        metadata,
    }
}

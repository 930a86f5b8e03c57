//! Shared harness for the HTTP integration tests.
//!
//! Builds the production router around in-memory storage, a recording
//! payment gateway, and a recording mailer.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use axum::Router;
use beatstore_api::auth::jwt::{generate_access_token, JwtConfig};
use beatstore_api::auth::password::hash_password;
use beatstore_api::config::{ServerConfig, StorageSettings, StripeSettings};
use beatstore_api::router::build_app_router;
use beatstore_api::state::AppState;
use beatstore_cloud::payment::{
    CheckoutSession, CheckoutSessionRequest, PaymentError, PaymentGateway,
};
use beatstore_cloud::storage::{MemoryObjectStorage, ObjectStorage};
use beatstore_core::licensing::{License, LicenseTier};
use beatstore_core::signature::signature_header;
use beatstore_db::models::beat::{Beat, CreateBeat, Waveform};
use beatstore_db::models::user::{CreateUser, User};
use beatstore_db::repositories::{BeatRepo, UserRepo};
use beatstore_events::{EmailError, EventBus, OrderConfirmation, OrderMailer};
use beatstore_pipeline::contract::PdfContractRenderer;
use beatstore_pipeline::fulfillment::FulfillmentService;
use beatstore_pipeline::StoreSettings;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;

pub const WEBHOOK_SECRET: &str = "whsec_test_secret";
pub const PASSWORD: &str = "correct-horse-battery";

// ---------------------------------------------------------------------------
// Doubles
// ---------------------------------------------------------------------------

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
            id: format!("cs_http_{}", requests.len()),
            url: "https://checkout.test/pay".into(),
        })
    }
}

#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<OrderConfirmation>>,
}

#[async_trait]
impl OrderMailer for RecordingMailer {
    async fn send_order_confirmation(
        &self,
        message: &OrderConfirmation,
    ) -> Result<(), EmailError> {
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
        jwt: JwtConfig {
            secret: "http-test-secret".to_string(),
            access_token_expiry_mins: 15,
            refresh_token_expiry_days: 30,
        },
        stripe: StripeSettings {
            secret_key: "sk_test".to_string(),
            webhook_secret: WEBHOOK_SECRET.to_string(),
            api_base: None,
        },
        storage: StorageSettings::default(),
        store: StoreSettings {
            currency: "usd".to_string(),
            public_base_url: "https://shop.test".to_string(),
        },
    }
}

pub struct TestApp {
    pub router: Router,
    pub pool: PgPool,
    pub config: ServerConfig,
    pub storage: Arc<MemoryObjectStorage>,
    pub gateway: Arc<RecordingGateway>,
    pub mailer: Arc<RecordingMailer>,
}

pub fn build_test_app(pool: PgPool) -> TestApp {
    let config = test_config();
    let storage = Arc::new(MemoryObjectStorage::new());
    let gateway = Arc::new(RecordingGateway::default());
    let mailer = Arc::new(RecordingMailer::default());
    let event_bus = Arc::new(EventBus::default());

    let fulfillment = Arc::new(FulfillmentService::new(
        pool.clone(),
        storage.clone(),
        Arc::new(PdfContractRenderer),
        Some(mailer.clone()),
        event_bus.clone(),
        config.store.clone(),
    ));

    let state = AppState {
        pool: pool.clone(),
        config: Arc::new(config.clone()),
        storage: storage.clone(),
        payments: gateway.clone(),
        fulfillment,
        event_bus,
    };

    TestApp {
        router: build_app_router(state, &config),
        pool,
        config,
        storage,
        gateway,
        mailer,
    }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> Response<Body> {
        let mut builder = Request::get(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    pub async fn post_json(
        &self,
        uri: &str,
        token: Option<&str>,
        body: serde_json::Value,
    ) -> Response<Body> {
        self.json_request("POST", uri, token, body).await
    }

    pub async fn json_request(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: serde_json::Value,
    ) -> Response<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json");
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }

    /// Deliver a correctly signed webhook.
    pub async fn webhook(&self, event: serde_json::Value) -> Response<Body> {
        let body = event.to_string();
        let header = signature_header(
            WEBHOOK_SECRET,
            chrono::Utc::now().timestamp(),
            body.as_bytes(),
        );
        let request = Request::post("/api/v1/webhooks/stripe")
            .header("content-type", "application/json")
            .header("stripe-signature", header)
            .body(Body::from(body))
            .unwrap();
        self.send(request).await
    }

    pub fn token_for(&self, user: &User) -> String {
        generate_access_token(user.id, &user.role, &self.config.jwt).unwrap()
    }

    /// Upload the files a beat row points at so download links can be signed.
    pub async fn put_beat_files(&self, beat: &Beat) {
        for key in [&beat.mp3_key, &beat.wav_key, &beat.stems_key]
            .into_iter()
            .flatten()
        {
            self.storage
                .put(key, b"audio".to_vec(), "audio/mpeg")
                .await
                .unwrap();
        }
    }
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn expect_status(response: Response<Body>, status: StatusCode) -> serde_json::Value {
    let actual = response.status();
    let json = body_json(response).await;
    assert_eq!(actual, status, "unexpected status, body: {json}");
    json
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub async fn create_user(pool: &PgPool, email: &str, role: &str) -> User {
    UserRepo::create(
        pool,
        &CreateUser {
            email: email.to_string(),
            password_hash: hash_password(PASSWORD).unwrap(),
            name: "Dana".to_string(),
            role: role.to_string(),
        },
    )
    .await
    .unwrap()
}

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
            moods: vec!["dark".into()],
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

/// A `checkout.session.completed` event carrying the metadata the gateway
/// was asked to store for its `n`-th session (1-based).
pub fn completed_event(app: &TestApp, n: usize) -> serde_json::Value {
    let requests = app.gateway.requests.lock().unwrap();
    let request = &requests[n - 1];
    let total: i64 = request.lines.iter().map(|l| l.unit_amount).sum();
    serde_json::json!({
        "id": format!("evt_{n}"),
        "type": "checkout.session.completed",
        "data": { "object": {
            "id": format!("cs_http_{n}"),
            "payment_intent": format!("pi_http_{n}"),
            "amount_total": total,
            "currency": request.currency,
            "metadata": request.metadata,
        }}
    })
}

pub fn refund_event(payment_intent: &str) -> serde_json::Value {
    serde_json::json!({
        "id": "evt_refund",
        "type": "charge.refunded",
        "data": { "object": { "id": "ch_1", "payment_intent": payment_intent } }
    })
}

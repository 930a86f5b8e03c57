use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use beatstore_api::config::ServerConfig;
use beatstore_api::router::build_app_router;
use beatstore_api::state::AppState;
use beatstore_cloud::payment::{StripeConfig, StripeGateway};
use beatstore_cloud::storage::{MemoryObjectStorage, ObjectStorage, S3ObjectStorage};
use beatstore_events::{DownloadTelemetry, EmailConfig, EmailDelivery, EventBus, OrderMailer};
use beatstore_pipeline::contract::PdfContractRenderer;
use beatstore_pipeline::fulfillment::FulfillmentService;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    "beatstore_api=debug,beatstore_pipeline=debug,tower_http=debug".into()
                }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = beatstore_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    beatstore_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    beatstore_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database ready");

    // --- Providers ---
    let storage: Arc<dyn ObjectStorage> = match &config.storage.bucket {
        Some(bucket) => {
            let s3 = S3ObjectStorage::connect(
                bucket.clone(),
                config.storage.endpoint.as_deref(),
                config.storage.region.as_deref(),
                config.storage.public_base_url.clone(),
            )
            .await;
            tracing::info!(bucket = %bucket, "Using S3 object storage");
            Arc::new(s3)
        }
        None => {
            tracing::warn!("S3_BUCKET not set, keeping uploads in memory");
            Arc::new(MemoryObjectStorage::new())
        }
    };

    let payments = Arc::new(StripeGateway::new(StripeConfig::new(
        config.stripe.secret_key.clone(),
        config.stripe.api_base.clone(),
    )));

    let mailer: Option<Arc<dyn OrderMailer>> = match EmailConfig::from_env() {
        Some(email_config) => Some(Arc::new(EmailDelivery::new(email_config))),
        None => {
            tracing::warn!("SMTP_HOST not set, order confirmations will not be emailed");
            None
        }
    };

    // --- Event bus ---
    let event_bus = Arc::new(EventBus::default());
    let telemetry_handle = tokio::spawn(DownloadTelemetry::run(
        pool.clone(),
        event_bus.subscribe(),
    ));

    let fulfillment = Arc::new(FulfillmentService::new(
        pool.clone(),
        Arc::clone(&storage),
        Arc::new(PdfContractRenderer),
        mailer,
        Arc::clone(&event_bus),
        config.store.clone(),
    ));

    // --- App state ---
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        storage,
        payments,
        fulfillment,
        event_bus: Arc::clone(&event_bus),
    };
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    // The router (and its state clones) is gone; dropping the last sender
    // closes the channel and ends the telemetry loop.
    drop(event_bus);
    let _ = tokio::time::timeout(
        Duration::from_secs(config.shutdown_timeout_secs),
        telemetry_handle,
    )
    .await;

    tracing::info!("Graceful shutdown complete");
}

/// Resolve on SIGINT or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}

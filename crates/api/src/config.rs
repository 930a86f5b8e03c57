use beatstore_core::pricing::DEFAULT_CURRENCY;
use beatstore_pipeline::StoreSettings;

use crate::auth::jwt::JwtConfig;

/// Stripe credentials.
#[derive(Debug, Clone)]
pub struct StripeSettings {
    pub secret_key: String,
    /// Signing secret of the webhook endpoint (`whsec_...`).
    pub webhook_secret: String,
    /// Overrides `https://api.stripe.com`, for stripe-mock in development.
    pub api_base: Option<String>,
}

/// Object storage location. Without a bucket the server keeps objects in memory.
#[derive(Debug, Clone, Default)]
pub struct StorageSettings {
    pub bucket: Option<String>,
    pub endpoint: Option<String>,
    pub region: Option<String>,
    pub public_base_url: Option<String>,
}

/// Server configuration loaded from environment variables.
///
/// All fields except the secrets have defaults suitable for local
/// development. In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Seconds to wait for background tasks after the listener closes.
    pub shutdown_timeout_secs: u64,
    pub jwt: JwtConfig,
    pub stripe: StripeSettings,
    pub storage: StorageSettings,
    /// Currency and public site URL shared with the purchase workflows.
    pub store: StoreSettings,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default                    |
    /// |-------------------------|----------------------------|
    /// | `HOST`                  | `0.0.0.0`                  |
    /// | `PORT`                  | `3000`                     |
    /// | `CORS_ORIGINS`          | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS`  | `30`                       |
    /// | `SHUTDOWN_TIMEOUT_SECS` | `30`                       |
    /// | `PUBLIC_BASE_URL`       | `http://localhost:5173`    |
    /// | `CURRENCY`              | `usd`                      |
    /// | `STRIPE_SECRET_KEY`     | **required**               |
    /// | `STRIPE_WEBHOOK_SECRET` | **required**               |
    /// | `STRIPE_API_BASE`       | `https://api.stripe.com`   |
    /// | `S3_BUCKET`             | unset (in-memory storage)  |
    /// | `S3_ENDPOINT`           | unset (AWS)                |
    /// | `S3_REGION`             | from the AWS environment   |
    /// | `S3_PUBLIC_BASE_URL`    | derived from bucket        |
    ///
    /// JWT settings are documented on [`JwtConfig::from_env`].
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let shutdown_timeout_secs: u64 = std::env::var("SHUTDOWN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("SHUTDOWN_TIMEOUT_SECS must be a valid u64");

        let stripe = StripeSettings {
            secret_key: required("STRIPE_SECRET_KEY"),
            webhook_secret: required("STRIPE_WEBHOOK_SECRET"),
            api_base: optional("STRIPE_API_BASE"),
        };

        let storage = StorageSettings {
            bucket: optional("S3_BUCKET"),
            endpoint: optional("S3_ENDPOINT"),
            region: optional("S3_REGION"),
            public_base_url: optional("S3_PUBLIC_BASE_URL"),
        };

        let store = StoreSettings {
            currency: std::env::var("CURRENCY")
                .map(|c| c.trim().to_lowercase())
                .unwrap_or_else(|_| DEFAULT_CURRENCY.into()),
            public_base_url: std::env::var("PUBLIC_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:5173".into()),
        };

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            jwt: JwtConfig::from_env(),
            stripe,
            storage,
            store,
        }
    }
}

fn required(name: &str) -> String {
    let value = std::env::var(name).unwrap_or_else(|_| panic!("{name} must be set"));
    assert!(!value.trim().is_empty(), "{name} must not be empty");
    value
}

fn optional(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

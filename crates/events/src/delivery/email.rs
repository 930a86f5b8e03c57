//! Order confirmation email via SMTP.
//!
//! [`EmailDelivery`] wraps the `lettre` async SMTP transport. Configuration is
//! loaded from environment variables; if `SMTP_HOST` is not set,
//! [`EmailConfig::from_env`] returns `None` and confirmations are skipped.
//!
//! The fulfillment pipeline only sees the [`OrderMailer`] trait so tests can
//! record messages instead of sending them.

use async_trait::async_trait;
use beatstore_core::locale::Locale;
use beatstore_core::pricing::format_amount;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for email delivery failures.
#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    /// SMTP transport-level failure (authentication, connection, etc.).
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    /// The recipient or sender address could not be parsed.
    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// The MIME message could not be assembled.
    #[error("Email build error: {0}")]
    Build(String),
}

// ---------------------------------------------------------------------------
// EmailConfig
// ---------------------------------------------------------------------------

/// Default SMTP port (STARTTLS).
const DEFAULT_SMTP_PORT: u16 = 587;

/// Default sender address when `SMTP_FROM` is not set.
const DEFAULT_FROM_ADDRESS: &str = "orders@beatstore.local";

/// Configuration for the SMTP email delivery service.
#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    /// RFC 5322 "From" address.
    pub from_address: String,
    pub smtp_user: Option<String>,
    pub smtp_password: Option<String>,
}

impl EmailConfig {
    /// Load configuration from environment variables.
    ///
    /// Returns `None` if `SMTP_HOST` is not set, signalling that email
    /// delivery is not configured and should be skipped.
    ///
    /// | Variable        | Required | Default                   |
    /// |-----------------|----------|---------------------------|
    /// | `SMTP_HOST`     | yes      | -                         |
    /// | `SMTP_PORT`     | no       | `587`                     |
    /// | `SMTP_FROM`     | no       | `orders@beatstore.local`  |
    /// | `SMTP_USER`     | no       | -                         |
    /// | `SMTP_PASSWORD` | no       | -                         |
    pub fn from_env() -> Option<Self> {
        let smtp_host = std::env::var("SMTP_HOST").ok()?;
        Some(Self {
            smtp_host,
            smtp_port: std::env::var("SMTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_SMTP_PORT),
            from_address: std::env::var("SMTP_FROM")
                .unwrap_or_else(|_| DEFAULT_FROM_ADDRESS.to_string()),
            smtp_user: std::env::var("SMTP_USER").ok(),
            smtp_password: std::env::var("SMTP_PASSWORD").ok(),
        })
    }
}

// ---------------------------------------------------------------------------
// Message content
// ---------------------------------------------------------------------------

/// One line of the confirmation's item list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationLine {
    pub beat_title: String,
    pub license_tier: String,
    pub price: i64,
}

/// Everything needed to render an order confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderConfirmation {
    pub to: String,
    pub locale: Locale,
    pub order_number: String,
    pub lines: Vec<ConfirmationLine>,
    pub total: i64,
    pub currency: String,
    /// Account downloads page for users, tokenized guest link for guests.
    pub download_url: String,
    pub is_guest: bool,
}

impl OrderConfirmation {
    /// Render `(subject, plain-text body)` in the order's locale.
    pub fn render(&self) -> (String, String) {
        let copy = self.locale.email_copy();
        let subject = format!("{} {}", copy.subject, self.order_number);

        let mut body = format!("{},\n\n{}\n\n{}:\n", copy.greeting, copy.intro, copy.items);
        for line in &self.lines {
            body.push_str(&format!(
                "  - {} ({}) {}\n",
                line.beat_title,
                line.license_tier,
                format_amount(line.price, &self.currency)
            ));
        }
        body.push_str(&format!(
            "\n{}: {}\n\n{}: {}\n{}\n\n{}\n",
            copy.total,
            format_amount(self.total, &self.currency),
            copy.download_here,
            self.download_url,
            if self.is_guest {
                copy.guest_notice
            } else {
                copy.user_notice
            },
            copy.sign_off,
        ));
        (subject, body)
    }
}

// ---------------------------------------------------------------------------
// OrderMailer
// ---------------------------------------------------------------------------

/// Sends order confirmations.
#[async_trait]
pub trait OrderMailer: Send + Sync {
    async fn send_order_confirmation(&self, message: &OrderConfirmation)
        -> Result<(), EmailError>;
}

/// Sends confirmation emails via SMTP.
pub struct EmailDelivery {
    config: EmailConfig,
}

impl EmailDelivery {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl OrderMailer for EmailDelivery {
    async fn send_order_confirmation(
        &self,
        message: &OrderConfirmation,
    ) -> Result<(), EmailError> {
        use lettre::{
            message::header::ContentType, transport::smtp::authentication::Credentials,
            AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
        };

        let (subject, body) = message.render();
        let email = Message::builder()
            .from(self.config.from_address.parse()?)
            .to(message.to.parse()?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body)
            .map_err(|e| EmailError::Build(e.to_string()))?;

        let mut transport_builder =
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.config.smtp_host)?
                .port(self.config.smtp_port);

        if let (Some(user), Some(pass)) = (&self.config.smtp_user, &self.config.smtp_password) {
            transport_builder =
                transport_builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        transport_builder.build().send(email).await?;

        tracing::info!(
            to = %message.to,
            order_number = %message.order_number,
            "Order confirmation sent"
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

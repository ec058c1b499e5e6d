use async_trait::async_trait;
use lettre::message::{header, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::time::Duration;

use crate::models::NotificationConfig;
use crate::plugins::traits::{AlertMessage, AlertTransport};
use crate::utils::error::NotificationError;

/// Port on which SMTP servers expect TLS from the first byte.
const IMPLICIT_TLS_PORT: u16 = 465;

/// Sends alerts as plain-text email through an authenticated SMTP relay.
pub struct SmtpAlertTransport {
    timeout: Duration,
}

impl Default for SmtpAlertTransport {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

impl SmtpAlertTransport {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    fn build_email(
        config: &NotificationConfig,
        message: &AlertMessage,
    ) -> Result<Message, NotificationError> {
        let from = parse_mailbox(&config.from_address)?;
        let to = parse_mailbox(&config.to_address)?;

        Message::builder()
            .from(from)
            .to(to)
            .subject(message.subject.clone())
            .header(header::ContentType::TEXT_PLAIN)
            .body(message.body.clone())
            .map_err(|e| NotificationError::TransportFailure(format!("Failed to build email: {}", e)))
    }

    fn build_mailer(
        &self,
        config: &NotificationConfig,
        secret: String,
    ) -> Result<AsyncSmtpTransport<Tokio1Executor>, NotificationError> {
        let builder = if config.smtp_port == IMPLICIT_TLS_PORT {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
        }
        .map_err(|e| NotificationError::TransportFailure(format!("Invalid SMTP relay: {}", e)))?;

        let credentials = Credentials::new(config.from_address.clone(), secret);

        Ok(builder
            .port(config.smtp_port)
            .credentials(credentials)
            .timeout(Some(self.timeout))
            .build())
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, NotificationError> {
    address
        .trim()
        .parse()
        .map_err(|e: lettre::address::AddressError| NotificationError::InvalidAddress {
            address: address.to_string(),
            message: e.to_string(),
        })
}

/// Resolves `credentials_ref`: `env:NAME` reads the variable, anything else is the secret itself.
pub fn resolve_credentials(credentials_ref: &str) -> Result<String, NotificationError> {
    let credentials_ref = credentials_ref.trim();
    if credentials_ref.is_empty() {
        return Err(NotificationError::MissingCredentials(
            "no credentials configured".to_string(),
        ));
    }

    match credentials_ref.strip_prefix("env:") {
        Some(name) => std::env::var(name).map_err(|_| {
            NotificationError::MissingCredentials(format!("environment variable {} is not set", name))
        }),
        None => Ok(credentials_ref.to_string()),
    }
}

#[async_trait]
impl AlertTransport for SmtpAlertTransport {
    async fn send(
        &self,
        config: &NotificationConfig,
        message: &AlertMessage,
    ) -> Result<(), NotificationError> {
        let email = Self::build_email(config, message)?;
        let secret = resolve_credentials(&config.credentials_ref)?;
        let mailer = self.build_mailer(config, secret)?;

        mailer
            .send(email)
            .await
            .map_err(|e| NotificationError::TransportFailure(e.to_string()))?;

        tracing::debug!(
            "Alert email '{}' sent to {} via {}:{}",
            message.subject,
            config.to_address,
            config.smtp_host,
            config.smtp_port
        );
        Ok(())
    }
}

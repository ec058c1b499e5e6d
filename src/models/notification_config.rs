use serde::{Deserialize, Serialize};
use std::time::Duration;
use validator::Validate;

pub const DEFAULT_SMTP_HOST: &str = "smtp.gmail.com";
pub const DEFAULT_SMTP_PORT: u16 = 587;
pub const DEFAULT_COOLDOWN_SECONDS: u64 = 300;

/// Where and how in-stock alerts are delivered.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NotificationConfig {
    pub from_address: String,
    pub to_address: String,
    /// Either a literal secret or `env:NAME` to read it from the environment.
    pub credentials_ref: String,
    #[validate(length(min = 1, message = "smtp host must not be empty"))]
    pub smtp_host: String,
    #[validate(range(min = 1, message = "smtp port must be greater than 0"))]
    pub smtp_port: u16,
    pub cooldown_seconds: u64,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            from_address: String::new(),
            to_address: String::new(),
            credentials_ref: String::new(),
            smtp_host: DEFAULT_SMTP_HOST.to_string(),
            smtp_port: DEFAULT_SMTP_PORT,
            cooldown_seconds: DEFAULT_COOLDOWN_SECONDS,
        }
    }
}

impl NotificationConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_seconds)
    }

    /// Alerts are only attempted once both ends of the message are known.
    pub fn is_configured(&self) -> bool {
        !self.from_address.trim().is_empty() && !self.to_address.trim().is_empty()
    }
}

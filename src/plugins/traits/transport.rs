use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::NotificationConfig;
use crate::utils::error::NotificationError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertMessage {
    pub subject: String,
    pub body: String,
}

/// Delivers a finished alert message. Implementations raise on any delivery failure.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AlertTransport: Send + Sync {
    async fn send(
        &self,
        config: &NotificationConfig,
        message: &AlertMessage,
    ) -> Result<(), NotificationError>;
}

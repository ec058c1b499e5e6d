use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;
use validator::Validate;

use crate::utils::error::AppError;

pub type TargetId = u32;

/// One monitored product page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Target {
    pub id: TargetId,
    pub url: String,
    #[validate(range(min = 1, message = "interval must be at least one second"))]
    pub interval_seconds: u64,
    pub enabled: bool,
}

impl Target {
    pub fn new(id: TargetId, url: impl Into<String>, interval_seconds: u64) -> Self {
        Self {
            id,
            url: url.into(),
            interval_seconds,
            enabled: true,
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }

    /// A slot with no URL is kept in the configuration but never polled.
    pub fn has_url(&self) -> bool {
        !self.url.trim().is_empty()
    }

    /// Checks that the target can be handed to a worker.
    pub fn ensure_startable(&self) -> Result<(), AppError> {
        self.validate()?;

        if !self.has_url() {
            return Err(AppError::Validation(format!(
                "Target {} has no URL configured",
                self.id
            )));
        }

        let parsed = Url::parse(self.url.trim())
            .map_err(|e| AppError::Validation(format!("Invalid URL '{}': {}", self.url, e)))?;
        match parsed.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(AppError::Validation(format!(
                "Unsupported URL scheme '{}' for target {}",
                scheme, self.id
            ))),
        }
    }
}

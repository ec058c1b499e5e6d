use std::sync::Arc;
use std::time::Duration;

use super::fetchers::{BrowserFetcher, HttpFetcher};
use super::notifiers::SmtpAlertTransport;
use super::traits::{AlertTransport, ContentFetcher};
use crate::config::{AppConfig, FetcherBackend};
use crate::utils::error::AppError;

/// Owns the fetch backend and alert transport shared by the scheduler and notifier.
#[derive(Clone)]
pub struct PluginManager {
    fetcher: Arc<dyn ContentFetcher>,
    transport: Arc<dyn AlertTransport>,
}

impl PluginManager {
    pub fn new(fetcher: Arc<dyn ContentFetcher>, transport: Arc<dyn AlertTransport>) -> Self {
        Self { fetcher, transport }
    }

    /// Builds the backend selected in the settings together with the SMTP transport.
    pub fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        let fetcher: Arc<dyn ContentFetcher> = match config.fetcher.backend {
            FetcherBackend::Http => Arc::new(HttpFetcher::new(&config.fetcher)?),
            FetcherBackend::Browser => Arc::new(BrowserFetcher::new(config.fetcher.clone())),
        };
        let transport = Arc::new(SmtpAlertTransport::new(Duration::from_secs(
            config.notifications.smtp_timeout,
        )));

        tracing::info!("Using '{}' fetch backend", fetcher.name());
        Ok(Self::new(fetcher, transport))
    }

    pub fn fetcher(&self) -> Arc<dyn ContentFetcher> {
        Arc::clone(&self.fetcher)
    }

    pub fn transport(&self) -> Arc<dyn AlertTransport> {
        Arc::clone(&self.transport)
    }
}

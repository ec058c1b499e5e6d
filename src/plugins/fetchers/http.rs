use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use crate::config::FetcherConfig;
use crate::element_finder::ElementFinder;
use crate::plugins::traits::{ContentFetcher, PageContent};
use crate::utils::error::FetchError;

/// Fetches raw HTML over HTTP. Fast, but never runs page scripts.
pub struct HttpFetcher {
    client: Client,
    finder: ElementFinder,
}

impl HttpFetcher {
    pub fn new(config: &FetcherConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| FetchError::TransportError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            finder: ElementFinder::default(),
        })
    }
}

fn map_reqwest_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::TransportError(err.to_string())
    }
}

#[async_trait]
impl ContentFetcher for HttpFetcher {
    fn name(&self) -> &str {
        "http"
    }

    async fn fetch(&self, url: &str, timeout: Duration) -> Result<PageContent, FetchError> {
        let start_time = std::time::Instant::now();

        // The response (and its pooled connection) is dropped on every return path.
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::TransportError(format!("HTTP {}", status)));
        }

        let final_url = response.url().to_string();
        let body = response.text().await.map_err(map_reqwest_error)?;
        let elements = self.finder.extract(&body);

        tracing::debug!(
            "Fetched {} ({} bytes, {} candidate elements) in {}ms",
            final_url,
            body.len(),
            elements.len(),
            start_time.elapsed().as_millis()
        );

        Ok(PageContent::new(final_url, &body, elements))
    }
}

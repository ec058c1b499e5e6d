// Integration tests for Stock Sentinel
// These tests drive the scheduler, workers and notifier together through scripted backends.

pub mod config_tests;
pub mod fetcher_tests;
pub mod notifier_tests;
pub mod scheduler_tests;

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use stock_sentinel::events::{EventSubscription, MonitorEvent};
use stock_sentinel::models::{NotificationConfig, StatusEvent};
use stock_sentinel::plugins::traits::{AlertMessage, AlertTransport, ContentFetcher, PageContent};
use stock_sentinel::utils::error::{FetchError, NotificationError};
use stock_sentinel::Scheduler;

pub const IN_STOCK_PAGE: &str = "<button>Add to Cart</button>";
pub const OUT_OF_STOCK_PAGE: &str = "<a>Add to Wishlist</a>";

/// Serves pages from a script, repeating the last entry once the script runs out.
pub struct ScriptedFetcher {
    script: Mutex<VecDeque<Result<String, FetchError>>>,
    last: Mutex<Result<String, FetchError>>,
    calls: AtomicUsize,
}

impl ScriptedFetcher {
    pub fn new(pages: &[&str]) -> Self {
        Self::with_results(pages.iter().map(|p| Ok(p.to_string())).collect())
    }

    pub fn with_results(results: Vec<Result<String, FetchError>>) -> Self {
        Self {
            script: Mutex::new(results.into()),
            last: Mutex::new(Ok(String::new())),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentFetcher for ScriptedFetcher {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn fetch(&self, url: &str, _timeout: Duration) -> Result<PageContent, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let next = self.script.lock().unwrap().pop_front();
        let result = match next {
            Some(result) => {
                *self.last.lock().unwrap() = result.clone();
                result
            }
            None => self.last.lock().unwrap().clone(),
        };
        result.map(|body| PageContent::new(url, &body, vec![]))
    }
}

/// A backend that never answers.
pub struct HangingFetcher;

#[async_trait]
impl ContentFetcher for HangingFetcher {
    fn name(&self) -> &str {
        "hanging"
    }

    async fn fetch(&self, _url: &str, _timeout: Duration) -> Result<PageContent, FetchError> {
        std::future::pending().await
    }
}

/// Keeps every message it is asked to send, optionally failing instead.
#[derive(Default)]
pub struct RecordingTransport {
    pub sent: Mutex<Vec<AlertMessage>>,
    pub fail: bool,
}

impl RecordingTransport {
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<AlertMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl AlertTransport for RecordingTransport {
    async fn send(
        &self,
        _config: &NotificationConfig,
        message: &AlertMessage,
    ) -> Result<(), NotificationError> {
        if self.fail {
            return Err(NotificationError::TransportFailure("connection refused".to_string()));
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

pub fn test_scheduler(fetcher: Arc<dyn ContentFetcher>, fetch_timeout: Duration) -> Scheduler {
    Scheduler::new(fetcher, fetch_timeout, 64)
}

pub fn test_notification_config(cooldown_seconds: u64) -> NotificationConfig {
    NotificationConfig {
        from_address: "watcher@example.com".to_string(),
        to_address: "me@example.com".to_string(),
        credentials_ref: "secret".to_string(),
        cooldown_seconds,
        ..Default::default()
    }
}

/// Waits for the next status event, failing the test after `limit`.
pub async fn next_status(events: &mut EventSubscription, limit: Duration) -> StatusEvent {
    tokio::time::timeout(limit, async {
        loop {
            match events.recv().await {
                Some(MonitorEvent::Status(event)) => return event,
                Some(_) => continue,
                None => panic!("event stream closed"),
            }
        }
    })
    .await
    .expect("timed out waiting for a status event")
}

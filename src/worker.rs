use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::classifier::classify;
use crate::events::EventBus;
use crate::models::{StatusEvent, StatusVerdict, Target};
use crate::monitor_state::MonitorState;
use crate::plugins::traits::ContentFetcher;
use crate::utils::error::{AppError, FetchError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerStatus {
    Stopped,
    Running,
}

/// Shared services every worker polls through.
#[derive(Clone)]
pub struct WorkerContext {
    pub fetcher: Arc<dyn ContentFetcher>,
    pub state: MonitorState,
    pub events: EventBus,
    pub fetch_timeout: Duration,
}

/// Owns the polling loop of a single target.
pub struct TargetWorker {
    target: Target,
    context: WorkerContext,
    cancel: Option<CancellationToken>,
    handle: Option<JoinHandle<()>>,
}

impl TargetWorker {
    pub fn new(target: Target, context: WorkerContext) -> Self {
        Self {
            target,
            context,
            cancel: None,
            handle: None,
        }
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn status(&self) -> WorkerStatus {
        match &self.handle {
            Some(handle) if !handle.is_finished() => WorkerStatus::Running,
            _ => WorkerStatus::Stopped,
        }
    }

    pub fn is_running(&self) -> bool {
        self.status() == WorkerStatus::Running
    }

    /// Replaces the target configuration. Only allowed while stopped.
    pub fn set_target(&mut self, target: Target) -> Result<(), AppError> {
        if self.is_running() {
            return Err(AppError::TargetRunning(self.target.id));
        }
        if target.id != self.target.id {
            return Err(AppError::Validation(format!(
                "Cannot change target id {} to {}",
                self.target.id, target.id
            )));
        }
        self.target = target;
        Ok(())
    }

    /// Spawns the polling loop with the current target. Returns `false` if it was already running.
    pub fn start(&mut self) -> bool {
        if self.is_running() {
            return false;
        }

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_loop(
            self.target.clone(),
            self.context.clone(),
            cancel.clone(),
        ));

        self.cancel = Some(cancel);
        self.handle = Some(handle);
        tracing::info!("Started monitoring target {} ({})", self.target.id, self.target.url);
        true
    }

    /// Cancels the loop and waits for it to exit. Returns `false` if it was not running.
    pub async fn stop(&mut self) -> bool {
        let was_running = self.is_running();

        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                tracing::warn!("Worker for target {} ended abnormally: {}", self.target.id, e);
            }
        }

        if was_running {
            tracing::info!("Stopped monitoring target {}", self.target.id);
        }
        was_running
    }
}

impl Drop for TargetWorker {
    fn drop(&mut self) {
        if let Some(cancel) = &self.cancel {
            cancel.cancel();
        }
    }
}

async fn run_loop(target: Target, context: WorkerContext, cancel: CancellationToken) {
    let id = target.id;
    let interval = target.interval();

    loop {
        if cancel.is_cancelled() {
            break;
        }

        context.events.polling_started(id);

        let verdict = tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                context.events.polling_finished(id);
                break;
            }

            verdict = poll_once(context.fetcher.as_ref(), &target.url, context.fetch_timeout) => verdict,
        };

        if cancel.is_cancelled() {
            tracing::debug!("Discarding result for target {} obtained after stop", id);
            context.events.polling_finished(id);
            break;
        }

        let now = Utc::now();
        let previous = context.state.record_verdict(id, verdict.clone(), now).await;

        if previous.as_ref() != Some(&verdict) {
            tracing::info!(
                "Target {} status: {} -> {}",
                id,
                previous.as_ref().map(|p| p.label()).unwrap_or("none"),
                verdict
            );
        } else {
            tracing::debug!("Target {} status unchanged: {}", id, verdict);
        }
        metrics::counter!("stock_sentinel_polls_total", "verdict" => verdict.label()).increment(1);

        context.events.publish_status(StatusEvent {
            target_id: id,
            url: target.url.clone(),
            verdict,
            previous,
            timestamp: now,
        });
        context.events.polling_finished(id);

        tokio::select! {
            biased;

            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }

    tracing::debug!("Polling loop for target {} exited", id);
}

/// Fetches and classifies `url` once. The timeout is enforced here, whatever the backend does.
pub async fn poll_once(fetcher: &dyn ContentFetcher, url: &str, timeout: Duration) -> StatusVerdict {
    let start_time = std::time::Instant::now();

    let result = match tokio::time::timeout(timeout, fetcher.fetch(url, timeout)).await {
        Ok(result) => result,
        Err(_) => Err(FetchError::Timeout),
    };

    match result {
        Ok(content) => {
            let verdict = classify(&content);
            tracing::debug!(
                "Classified {} as {} in {}ms",
                url,
                verdict,
                start_time.elapsed().as_millis()
            );
            verdict
        }
        Err(e) => {
            tracing::warn!("Failed to fetch {} with {}: {}", url, fetcher.name(), e);
            StatusVerdict::from_fetch_error(&e)
        }
    }
}

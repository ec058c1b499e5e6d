use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use validator::Validate;

use crate::config::AppConfig;
use crate::events::{EventBus, EventSubscription};
use crate::models::{StatusEvent, StatusVerdict, Target, TargetId};
use crate::monitor_state::MonitorState;
use crate::plugins::traits::ContentFetcher;
use crate::utils::error::{AppError, Result};
use crate::worker::{TargetWorker, WorkerContext, WorkerStatus};

/// Point-in-time view of one target for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetSnapshot {
    pub target: Target,
    pub status: WorkerStatus,
    pub last_status: Option<StatusVerdict>,
    pub last_checked_at: Option<DateTime<Utc>>,
    pub last_alert_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerStats {
    pub total_targets: usize,
    pub running_targets: usize,
    pub in_stock_targets: usize,
    pub error_targets: usize,
    pub uptime_seconds: u64,
}

/// Owns one worker per target and the event stream they share.
pub struct Scheduler {
    workers: BTreeMap<TargetId, TargetWorker>,
    context: WorkerContext,
    start_time: DateTime<Utc>,
}

impl Scheduler {
    pub fn new(fetcher: Arc<dyn ContentFetcher>, fetch_timeout: Duration, event_capacity: usize) -> Self {
        Self {
            workers: BTreeMap::new(),
            context: WorkerContext {
                fetcher,
                state: MonitorState::new(),
                events: EventBus::new(event_capacity),
                fetch_timeout,
            },
            start_time: Utc::now(),
        }
    }

    pub fn from_config(fetcher: Arc<dyn ContentFetcher>, config: &AppConfig) -> Self {
        Self::new(
            fetcher,
            config.scheduler.fetch_timeout(),
            config.scheduler.event_channel_capacity,
        )
    }

    pub fn state(&self) -> &MonitorState {
        &self.context.state
    }

    pub fn subscribe(&self) -> EventSubscription {
        self.context.events.subscribe()
    }

    pub fn subscribe_statuses(&self) -> mpsc::UnboundedReceiver<StatusEvent> {
        self.context.events.subscribe_statuses()
    }

    fn worker(&self, id: TargetId) -> Result<&TargetWorker> {
        self.workers.get(&id).ok_or(AppError::UnknownTarget(id))
    }

    fn worker_mut(&mut self, id: TargetId) -> Result<&mut TargetWorker> {
        self.workers.get_mut(&id).ok_or(AppError::UnknownTarget(id))
    }

    /// Registers a stopped target with a fresh state entry.
    pub async fn add_target(&mut self, target: Target) -> Result<()> {
        target.validate()?;
        if self.workers.contains_key(&target.id) {
            return Err(AppError::DuplicateTarget(target.id));
        }

        self.context.state.reset(target.id).await;
        tracing::debug!("Added target {} ({})", target.id, target.url);
        self.workers
            .insert(target.id, TargetWorker::new(target, self.context.clone()));
        Ok(())
    }

    pub async fn remove_target(&mut self, id: TargetId) -> Result<Target> {
        if self.worker(id)?.is_running() {
            return Err(AppError::TargetRunning(id));
        }

        let worker = self.workers.remove(&id).ok_or(AppError::UnknownTarget(id))?;
        self.context.state.remove(id).await;
        tracing::debug!("Removed target {}", id);
        Ok(worker.target().clone())
    }

    pub fn update_target(&mut self, target: Target) -> Result<()> {
        target.validate()?;
        self.worker_mut(target.id)?.set_target(target)
    }

    /// Starts polling `id`. Returns `false` when it was already running.
    pub fn start(&mut self, id: TargetId) -> Result<bool> {
        let worker = self.worker_mut(id)?;
        if worker.is_running() {
            return Ok(false);
        }
        worker.target().ensure_startable()?;
        Ok(worker.start())
    }

    /// Stops polling `id` and waits until its loop has exited.
    pub async fn stop(&mut self, id: TargetId) -> Result<bool> {
        Ok(self.worker_mut(id)?.stop().await)
    }

    pub async fn stop_all(&mut self) {
        let stopped = futures::future::join_all(self.workers.values_mut().map(|w| w.stop())).await;
        let count = stopped.into_iter().filter(|s| *s).count();
        if count > 0 {
            tracing::info!("Stopped {} running target(s)", count);
        }
    }

    /// Starts every enabled target that has a URL. Returns the ids that were started.
    pub fn start_enabled(&mut self) -> Vec<TargetId> {
        let mut started = Vec::new();
        for (id, worker) in self.workers.iter_mut() {
            let target = worker.target();
            if !target.enabled || !target.has_url() {
                continue;
            }
            if let Err(e) = target.ensure_startable() {
                tracing::warn!("Not starting target {}: {}", id, e);
                continue;
            }
            if worker.start() {
                started.push(*id);
            }
        }
        started
    }

    pub fn targets(&self) -> Vec<Target> {
        self.workers.values().map(|w| w.target().clone()).collect()
    }

    pub fn status(&self, id: TargetId) -> Result<WorkerStatus> {
        Ok(self.worker(id)?.status())
    }

    pub fn is_running(&self, id: TargetId) -> bool {
        self.workers.get(&id).is_some_and(TargetWorker::is_running)
    }

    pub async fn snapshot(&self) -> Vec<TargetSnapshot> {
        let mut snapshots = Vec::with_capacity(self.workers.len());
        for worker in self.workers.values() {
            let target = worker.target().clone();
            let entry = self.context.state.entry(target.id).await.unwrap_or_default();
            snapshots.push(TargetSnapshot {
                status: worker.status(),
                last_status: entry.last_status,
                last_checked_at: entry.last_checked_at,
                last_alert_at: entry.last_alert_at,
                target,
            });
        }
        snapshots
    }

    pub async fn stats(&self) -> SchedulerStats {
        let snapshots = self.snapshot().await;
        let uptime = Utc::now().signed_duration_since(self.start_time);

        SchedulerStats {
            total_targets: snapshots.len(),
            running_targets: snapshots
                .iter()
                .filter(|s| s.status == WorkerStatus::Running)
                .count(),
            in_stock_targets: snapshots
                .iter()
                .filter(|s| s.last_status.as_ref().is_some_and(StatusVerdict::is_in_stock))
                .count(),
            error_targets: snapshots
                .iter()
                .filter(|s| s.last_status.as_ref().is_some_and(StatusVerdict::is_error))
                .count(),
            uptime_seconds: uptime.num_seconds().max(0) as u64,
        }
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::models::{StatusVerdict, TargetId};

/// Last known state of one target.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorEntry {
    pub last_status: Option<StatusVerdict>,
    /// Set only after an alert for a transition into `InStock` was delivered.
    pub last_alert_at: Option<DateTime<Utc>>,
    pub last_checked_at: Option<DateTime<Utc>>,
}

type SharedEntry = Arc<RwLock<MonitorEntry>>;

/// Process-wide table of per-target status.
///
/// The outer lock is only held to insert, remove or look up an entry. Each entry
/// has its own lock, so a worker recording a verdict never waits on another
/// target, and a read of one entry always sees a consistent pair.
#[derive(Clone, Default)]
pub struct MonitorState {
    entries: Arc<RwLock<HashMap<TargetId, SharedEntry>>>,
}

impl MonitorState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a fresh entry for `id`, discarding anything previously recorded.
    pub async fn reset(&self, id: TargetId) {
        let mut entries = self.entries.write().await;
        entries.insert(id, Arc::new(RwLock::new(MonitorEntry::default())));
    }

    pub async fn remove(&self, id: TargetId) -> Option<MonitorEntry> {
        let removed = {
            let mut entries = self.entries.write().await;
            entries.remove(&id)
        }?;
        let entry = removed.read().await.clone();
        Some(entry)
    }

    async fn shared_entry(&self, id: TargetId) -> Option<SharedEntry> {
        let entries = self.entries.read().await;
        entries.get(&id).cloned()
    }

    async fn entry_or_insert(&self, id: TargetId) -> SharedEntry {
        if let Some(entry) = self.shared_entry(id).await {
            return entry;
        }
        let mut entries = self.entries.write().await;
        Arc::clone(entries.entry(id).or_default())
    }

    /// Stores `verdict` as the latest status and returns the one it replaced.
    pub async fn record_verdict(
        &self,
        id: TargetId,
        verdict: StatusVerdict,
        at: DateTime<Utc>,
    ) -> Option<StatusVerdict> {
        let entry = self.entry_or_insert(id).await;
        let mut entry = entry.write().await;
        entry.last_checked_at = Some(at);
        entry.last_status.replace(verdict)
    }

    /// Records a delivered alert. Ignored when `id` was removed in the meantime.
    pub async fn mark_alerted(&self, id: TargetId, at: DateTime<Utc>) -> bool {
        match self.shared_entry(id).await {
            Some(entry) => {
                entry.write().await.last_alert_at = Some(at);
                true
            }
            None => false,
        }
    }

    pub async fn entry(&self, id: TargetId) -> Option<MonitorEntry> {
        let entry = self.shared_entry(id).await?;
        let entry = entry.read().await.clone();
        Some(entry)
    }

    pub async fn last_status(&self, id: TargetId) -> Option<StatusVerdict> {
        self.entry(id).await.and_then(|e| e.last_status)
    }

    pub async fn last_alert_at(&self, id: TargetId) -> Option<DateTime<Utc>> {
        self.entry(id).await.and_then(|e| e.last_alert_at)
    }

    /// Copies every entry, sorted by target id.
    pub async fn snapshot(&self) -> Vec<(TargetId, MonitorEntry)> {
        let shared: Vec<(TargetId, SharedEntry)> = {
            let entries = self.entries.read().await;
            entries.iter().map(|(id, e)| (*id, Arc::clone(e))).collect()
        };

        let mut snapshot = Vec::with_capacity(shared.len());
        for (id, entry) in shared {
            snapshot.push((id, entry.read().await.clone()));
        }
        snapshot.sort_by_key(|(id, _)| *id);
        snapshot
    }
}

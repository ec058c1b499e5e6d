use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{broadcast, mpsc};

use crate::models::{StatusEvent, TargetId};

/// Everything a worker reports while polling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MonitorEvent {
    PollingStarted {
        target_id: TargetId,
        at: DateTime<Utc>,
    },
    Status(StatusEvent),
    PollingFinished {
        target_id: TargetId,
        at: DateTime<Utc>,
    },
}

impl MonitorEvent {
    pub fn target_id(&self) -> TargetId {
        match self {
            MonitorEvent::PollingStarted { target_id, .. } => *target_id,
            MonitorEvent::Status(event) => event.target_id,
            MonitorEvent::PollingFinished { target_id, .. } => *target_id,
        }
    }
}

/// Fan-out point between workers and their subscribers.
///
/// Display subscribers share a bounded broadcast channel and may lose events when
/// they fall behind. Status subscribers each get an unbounded queue, so alerting
/// sees every verdict. Publishing never waits on a subscriber.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<MonitorEvent>,
    status_subscribers: Arc<Mutex<Vec<mpsc::UnboundedSender<StatusEvent>>>>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            status_subscribers: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn subscribe(&self) -> EventSubscription {
        EventSubscription {
            receiver: self.sender.subscribe(),
            muted: HashSet::new(),
        }
    }

    /// Lossless stream of status events only.
    pub fn subscribe_statuses(&self) -> mpsc::UnboundedReceiver<StatusEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.status_subscribers().push(tx);
        rx
    }

    fn status_subscribers(&self) -> MutexGuard<'_, Vec<mpsc::UnboundedSender<StatusEvent>>> {
        // A poisoned list is still a valid list of senders.
        self.status_subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn polling_started(&self, target_id: TargetId) {
        self.broadcast(MonitorEvent::PollingStarted {
            target_id,
            at: Utc::now(),
        });
    }

    pub fn polling_finished(&self, target_id: TargetId) {
        self.broadcast(MonitorEvent::PollingFinished {
            target_id,
            at: Utc::now(),
        });
    }

    pub fn publish_status(&self, event: StatusEvent) {
        self.status_subscribers()
            .retain(|tx| tx.send(event.clone()).is_ok());
        self.broadcast(MonitorEvent::Status(event));
    }

    fn broadcast(&self, event: MonitorEvent) {
        // No receivers is not an error: nobody is watching yet.
        let _ = self.sender.send(event);
    }
}

/// A display subscription that can ignore individual targets.
pub struct EventSubscription {
    receiver: broadcast::Receiver<MonitorEvent>,
    muted: HashSet<TargetId>,
}

impl EventSubscription {
    /// Waits for the next event from a target that is not muted.
    ///
    /// Returns `None` once every publisher is gone.
    pub async fn recv(&mut self) -> Option<MonitorEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if self.muted.contains(&event.target_id()) => continue,
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!("Event subscriber lagged, {} events dropped", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Returns the next pending event from a target that is not muted, without waiting.
    pub fn try_recv(&mut self) -> Option<MonitorEvent> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) if self.muted.contains(&event.target_id()) => continue,
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    tracing::warn!("Event subscriber lagged, {} events dropped", skipped);
                }
                Err(_) => return None,
            }
        }
    }

    pub fn unsubscribe(&mut self, target_id: TargetId) {
        self.muted.insert(target_id);
    }

    pub fn resubscribe(&mut self, target_id: TargetId) {
        self.muted.remove(&target_id);
    }
}

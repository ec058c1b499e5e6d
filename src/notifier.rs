use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::models::{NotificationConfig, StatusEvent};
use crate::monitor_state::MonitorState;
use crate::plugins::traits::{AlertMessage, AlertTransport};

/// What the notifier did with one status event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlertOutcome {
    NotInStock,
    NotTransition,
    CoolingDown { remaining: Duration },
    Unconfigured,
    Sent,
    Failed(String),
}

/// Turns "became in stock" events into alerts, at most one per cooldown window per target.
pub struct Notifier {
    config: NotificationConfig,
    state: MonitorState,
    transport: Arc<dyn AlertTransport>,
}

impl Notifier {
    pub fn new(
        config: NotificationConfig,
        state: MonitorState,
        transport: Arc<dyn AlertTransport>,
    ) -> Self {
        if !config.is_configured() {
            tracing::warn!("Notification addresses are not configured; monitoring will run without alerts");
        }
        Self {
            config,
            state,
            transport,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.is_configured()
    }

    pub async fn handle_event(&self, event: &StatusEvent) -> AlertOutcome {
        if !event.verdict.is_in_stock() {
            return AlertOutcome::NotInStock;
        }
        if !event.is_in_stock_transition() {
            return AlertOutcome::NotTransition;
        }

        let now = event.timestamp;
        if let Some(remaining) = self.cooldown_remaining(event, now).await {
            tracing::info!(
                "Target {} is in stock, alert suppressed for another {}s",
                event.target_id,
                remaining.as_secs()
            );
            return AlertOutcome::CoolingDown { remaining };
        }

        if !self.is_enabled() {
            tracing::warn!(
                "Target {} is in stock but no notification addresses are configured",
                event.target_id
            );
            return AlertOutcome::Unconfigured;
        }

        let message = build_message(event);
        match self.transport.send(&self.config, &message).await {
            Ok(()) => {
                if !self.state.mark_alerted(event.target_id, now).await {
                    tracing::debug!("Target {} was removed before its alert was recorded", event.target_id);
                }
                metrics::counter!("stock_sentinel_alerts_sent_total").increment(1);
                tracing::info!("Sent in-stock alert for target {}", event.target_id);
                AlertOutcome::Sent
            }
            Err(e) => {
                metrics::counter!("stock_sentinel_alerts_failed_total").increment(1);
                tracing::error!("Failed to send alert for target {}: {}", event.target_id, e);
                AlertOutcome::Failed(e.to_string())
            }
        }
    }

    async fn cooldown_remaining(&self, event: &StatusEvent, now: DateTime<Utc>) -> Option<Duration> {
        let last_alert_at = self.state.last_alert_at(event.target_id).await?;
        // An event older than the last alert (clock stepped back) counts as no time elapsed
        let elapsed = now
            .signed_duration_since(last_alert_at)
            .to_std()
            .unwrap_or(Duration::ZERO);

        self.config
            .cooldown()
            .checked_sub(elapsed)
            .filter(|remaining| !remaining.is_zero())
    }

    /// Handles status events until the channel closes or `cancel` fires.
    pub async fn run(self, mut events: mpsc::UnboundedReceiver<StatusEvent>, cancel: CancellationToken) {
        tracing::info!("Notifier started");
        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => break,

                event = events.recv() => match event {
                    Some(event) => {
                        self.handle_event(&event).await;
                    }
                    None => break,
                },
            }
        }
        tracing::info!("Notifier stopped");
    }
}

pub fn build_message(event: &StatusEvent) -> AlertMessage {
    AlertMessage {
        subject: format!("Stock Alert - Target {}", event.target_id),
        body: format!(
            "Product is now IN STOCK!\n\nTarget: {}\nURL: {}\nTime: {}\n\nCheck it out now!",
            event.target_id,
            event.url,
            event.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
        ),
    }
}

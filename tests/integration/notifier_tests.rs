use super::*;
use chrono::{TimeZone, Utc};
use stock_sentinel::models::{StatusVerdict, Target};
use stock_sentinel::{AlertOutcome, MonitorState, Notifier};
use tokio_util::sync::CancellationToken;

fn event(verdict: StatusVerdict, previous: Option<StatusVerdict>, second: u32) -> StatusEvent {
    StatusEvent {
        target_id: 4,
        url: "https://shop.example.com/4".to_string(),
        verdict,
        previous,
        timestamp: Utc.with_ymd_and_hms(2024, 11, 29, 9, 0, second).unwrap(),
    }
}

#[tokio::test]
async fn test_transport_failure_does_not_start_cooldown() -> anyhow::Result<()> {
    let transport = Arc::new(RecordingTransport::failing());
    let state = MonitorState::new();
    let notifier = Notifier::new(test_notification_config(600), state.clone(), transport.clone());

    let outcome = notifier
        .handle_event(&event(StatusVerdict::InStock, Some(StatusVerdict::OutOfStock), 0))
        .await;
    assert!(matches!(outcome, AlertOutcome::Failed(_)));
    assert_eq!(state.last_alert_at(4).await, None);

    // The next transition is free to try again.
    let outcome = notifier
        .handle_event(&event(StatusVerdict::InStock, Some(StatusVerdict::Unknown), 5))
        .await;
    assert!(matches!(outcome, AlertOutcome::Failed(_)));
    assert!(transport.sent().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_cooldown_is_per_target() -> anyhow::Result<()> {
    let transport = Arc::new(RecordingTransport::default());
    let state = MonitorState::new();
    let notifier = Notifier::new(test_notification_config(600), state.clone(), transport.clone());

    let first = event(StatusVerdict::InStock, None, 0);
    let mut other = event(StatusVerdict::InStock, None, 1);
    other.target_id = 5;

    assert_eq!(notifier.handle_event(&first).await, AlertOutcome::Sent);
    assert_eq!(notifier.handle_event(&other).await, AlertOutcome::Sent);

    let subjects: Vec<String> = transport.sent().into_iter().map(|m| m.subject).collect();
    assert_eq!(subjects, vec!["Stock Alert - Target 4", "Stock Alert - Target 5"]);
    Ok(())
}

#[tokio::test]
async fn test_notifier_follows_scheduler_events() -> anyhow::Result<()> {
    let fetcher = Arc::new(ScriptedFetcher::new(&[IN_STOCK_PAGE]));
    let transport = Arc::new(RecordingTransport::default());
    let mut scheduler = test_scheduler(fetcher, Duration::from_secs(5));
    scheduler.add_target(Target::new(4, "https://shop.example.com/4", 60)).await?;

    let cancel = CancellationToken::new();
    let notifier = Notifier::new(test_notification_config(300), scheduler.state().clone(), transport.clone());
    let handle = tokio::spawn(notifier.run(scheduler.subscribe_statuses(), cancel.clone()));

    let mut events = scheduler.subscribe();
    scheduler.start(4)?;
    next_status(&mut events, Duration::from_secs(2)).await;
    scheduler.stop(4).await?;

    // The first in-stock observation counts as a transition.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while transport.sent().is_empty() && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(transport.sent().len(), 1);
    assert!(scheduler.state().last_alert_at(4).await.is_some());

    cancel.cancel();
    handle.await?;
    Ok(())
}

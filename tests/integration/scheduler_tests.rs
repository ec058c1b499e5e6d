use super::*;
use std::time::Instant;
use stock_sentinel::models::{StatusVerdict, Target};
use stock_sentinel::utils::error::AppError;
use stock_sentinel::WorkerStatus;

#[tokio::test]
async fn test_stop_during_sleep_is_prompt_and_final() -> anyhow::Result<()> {
    let fetcher = Arc::new(ScriptedFetcher::new(&[OUT_OF_STOCK_PAGE]));
    let mut scheduler = test_scheduler(fetcher, Duration::from_secs(5));
    scheduler.add_target(Target::new(1, "https://shop.example.com/1", 1)).await?;

    let mut events = scheduler.subscribe();
    scheduler.start(1)?;
    let first = next_status(&mut events, Duration::from_secs(2)).await;
    assert_eq!(first.verdict, StatusVerdict::OutOfStock);

    let started = Instant::now();
    assert!(scheduler.stop(1).await?);
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(scheduler.status(1)?, WorkerStatus::Stopped);

    // Nothing is published once stop has returned.
    tokio::time::sleep(Duration::from_millis(1500)).await;
    while let Some(event) = events.try_recv() {
        assert!(!matches!(event, MonitorEvent::Status(_)), "status published after stop: {event:?}");
    }

    Ok(())
}

#[tokio::test]
async fn test_hung_backend_times_out() -> anyhow::Result<()> {
    let timeout = Duration::from_millis(300);
    let mut scheduler = test_scheduler(Arc::new(HangingFetcher), timeout);
    scheduler.add_target(Target::new(1, "https://shop.example.com/1", 60)).await?;

    let mut events = scheduler.subscribe();
    let started = Instant::now();
    scheduler.start(1)?;

    let event = next_status(&mut events, Duration::from_secs(2)).await;
    assert_eq!(event.verdict, StatusVerdict::Error("Page load timeout".to_string()));
    assert!(started.elapsed() < timeout + Duration::from_millis(700));

    scheduler.stop_all().await;
    Ok(())
}

#[tokio::test]
async fn test_workers_are_independent() -> anyhow::Result<()> {
    let mut scheduler = test_scheduler(Arc::new(ScriptedFetcher::new(&[IN_STOCK_PAGE])), Duration::from_secs(5));
    scheduler.add_target(Target::new(1, "https://shop.example.com/1", 60)).await?;
    scheduler.add_target(Target::new(2, "https://shop.example.com/2", 60)).await?;

    let mut events = scheduler.subscribe();
    scheduler.start(1)?;
    scheduler.start(2)?;

    let mut seen = vec![
        next_status(&mut events, Duration::from_secs(2)).await.target_id,
        next_status(&mut events, Duration::from_secs(2)).await.target_id,
    ];
    seen.sort();
    assert_eq!(seen, vec![1, 2]);

    scheduler.stop(1).await?;
    assert!(!scheduler.is_running(1));
    assert!(scheduler.is_running(2));

    scheduler.stop_all().await;
    assert!(!scheduler.is_running(2));
    Ok(())
}

#[tokio::test]
async fn test_remove_requires_stopped_target() -> anyhow::Result<()> {
    let mut scheduler = test_scheduler(Arc::new(ScriptedFetcher::new(&[IN_STOCK_PAGE])), Duration::from_secs(5));
    scheduler.add_target(Target::new(1, "https://shop.example.com/1", 60)).await?;
    scheduler.start(1)?;

    let result = scheduler.remove_target(1).await;
    assert!(matches!(result, Err(AppError::TargetRunning(1))));

    scheduler.stop(1).await?;
    let removed = scheduler.remove_target(1).await?;
    assert_eq!(removed.url, "https://shop.example.com/1");
    assert!(scheduler.targets().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_readding_target_resets_state() -> anyhow::Result<()> {
    let mut scheduler = test_scheduler(Arc::new(ScriptedFetcher::new(&[IN_STOCK_PAGE])), Duration::from_secs(5));
    scheduler.add_target(Target::new(1, "https://shop.example.com/1", 60)).await?;

    let mut events = scheduler.subscribe();
    scheduler.start(1)?;
    next_status(&mut events, Duration::from_secs(2)).await;
    scheduler.stop(1).await?;
    assert_eq!(scheduler.state().last_status(1).await, Some(StatusVerdict::InStock));

    scheduler.remove_target(1).await?;
    scheduler.add_target(Target::new(1, "https://shop.example.com/other", 60)).await?;

    let snapshot = scheduler.snapshot().await;
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].last_status, None);
    assert_eq!(snapshot[0].last_alert_at, None);
    assert_eq!(snapshot[0].target.url, "https://shop.example.com/other");
    Ok(())
}

#[tokio::test]
async fn test_start_is_idempotent() -> anyhow::Result<()> {
    let fetcher = Arc::new(ScriptedFetcher::new(&[IN_STOCK_PAGE]));
    let mut scheduler = test_scheduler(fetcher.clone(), Duration::from_secs(5));
    scheduler.add_target(Target::new(1, "https://shop.example.com/1", 60)).await?;

    let mut events = scheduler.subscribe();
    assert!(scheduler.start(1)?);
    assert!(!scheduler.start(1)?);
    next_status(&mut events, Duration::from_secs(2)).await;

    scheduler.stop(1).await?;
    assert!(!scheduler.stop(1).await?);
    assert_eq!(fetcher.calls(), 1);
    Ok(())
}

#[tokio::test]
async fn test_restart_uses_updated_target() -> anyhow::Result<()> {
    let mut scheduler = test_scheduler(Arc::new(ScriptedFetcher::new(&[IN_STOCK_PAGE])), Duration::from_secs(5));
    scheduler.add_target(Target::new(1, "https://shop.example.com/old", 60)).await?;

    let mut events = scheduler.subscribe();
    scheduler.start(1)?;
    assert_eq!(next_status(&mut events, Duration::from_secs(2)).await.url, "https://shop.example.com/old");
    scheduler.stop(1).await?;

    scheduler.update_target(Target::new(1, "https://shop.example.com/new", 60))?;
    scheduler.start(1)?;
    assert_eq!(next_status(&mut events, Duration::from_secs(2)).await.url, "https://shop.example.com/new");

    scheduler.stop_all().await;
    Ok(())
}

#[tokio::test]
async fn test_unsubscribed_targets_are_filtered() -> anyhow::Result<()> {
    let mut scheduler = test_scheduler(Arc::new(ScriptedFetcher::new(&[IN_STOCK_PAGE])), Duration::from_secs(5));
    scheduler.add_target(Target::new(1, "https://shop.example.com/1", 60)).await?;
    scheduler.add_target(Target::new(2, "https://shop.example.com/2", 60)).await?;

    let mut all = scheduler.subscribe();
    let mut filtered = scheduler.subscribe();
    filtered.unsubscribe(1);

    scheduler.start(1)?;
    next_status(&mut all, Duration::from_secs(2)).await;
    scheduler.start(2)?;

    assert_eq!(next_status(&mut filtered, Duration::from_secs(2)).await.target_id, 2);
    scheduler.stop_all().await;
    Ok(())
}

#[tokio::test]
async fn test_fetch_errors_keep_the_loop_alive() -> anyhow::Result<()> {
    let fetcher = Arc::new(ScriptedFetcher::with_results(vec![
        Err(FetchError::TransportError("connection reset".to_string())),
        Ok(IN_STOCK_PAGE.to_string()),
    ]));
    let mut scheduler = test_scheduler(fetcher, Duration::from_secs(5));
    scheduler.add_target(Target::new(1, "https://shop.example.com/1", 1)).await?;

    let mut events = scheduler.subscribe();
    scheduler.start(1)?;

    let first = next_status(&mut events, Duration::from_secs(3)).await;
    assert!(first.verdict.is_error());
    let second = next_status(&mut events, Duration::from_secs(3)).await;
    assert_eq!(second.verdict, StatusVerdict::InStock);
    assert_eq!(second.previous, Some(first.verdict));

    scheduler.stop_all().await;
    let stats = scheduler.stats().await;
    assert_eq!(stats.in_stock_targets, 1);
    assert_eq!(stats.running_targets, 0);
    Ok(())
}

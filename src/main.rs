use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use stock_sentinel::config::{AppConfig, FetcherBackend};
use stock_sentinel::models::{MonitorConfig, StatusEvent, StatusVerdict};
use stock_sentinel::notifier::build_message;
use stock_sentinel::plugins::{AlertTransport, PluginManager};
use stock_sentinel::worker::poll_once;
use stock_sentinel::{MonitorEvent, Notifier, Scheduler};

#[derive(Parser)]
#[command(author, version, about = "Watches product pages and emails when they come back in stock", long_about = None)]
struct Cli {
    /// Runtime settings file (TOML, JSON or YAML).
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Monitor configuration file with targets and notification settings.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Overrides the fetch backend from the settings.
    #[arg(long, global = true, value_enum)]
    backend: Option<FetcherBackend>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Monitors every enabled target until Ctrl-C.
    Run,
    /// Fetches a single URL once and prints its stock status.
    Check {
        #[arg(long)]
        url: String,
    },
    /// Writes the default monitor configuration.
    Init {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
    /// Sends a test alert through the configured SMTP relay.
    TestEmail,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut settings = AppConfig::load(cli.settings.as_deref()).context("Failed to load settings")?;
    if let Some(backend) = cli.backend {
        settings.fetcher.backend = backend;
    }
    if let Some(path) = &cli.config {
        settings.monitor_file = path.display().to_string();
    }

    let _guard = init_logging(&settings)?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run(settings).await,
        Commands::Check { url } => check(settings, &url).await,
        Commands::Init { force } => init(&settings, force),
        Commands::TestEmail => test_email(settings).await,
    }
}

fn init_logging(settings: &AppConfig) -> Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("stock_sentinel={}", settings.logging.level)))?;

    let (file_layer, guard) = match &settings.logging.directory {
        Some(directory) => {
            let file_appender = tracing_appender::rolling::daily(directory, "stock_sentinel.log");
            let (writer, guard) = tracing_appender::non_blocking(file_appender);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer())
        .with(file_layer)
        .init();

    Ok(guard)
}

async fn run(settings: AppConfig) -> Result<()> {
    info!("Starting Stock Sentinel...");

    let monitor_config = MonitorConfig::load_or_default(&settings.monitor_file);
    let plugins = PluginManager::from_config(&settings)?;
    let mut scheduler = Scheduler::from_config(plugins.fetcher(), &settings);

    for target in monitor_config.targets.iter().cloned() {
        scheduler.add_target(target).await?;
    }

    let shutdown = CancellationToken::new();

    let notifier = Notifier::new(
        monitor_config.notification.clone(),
        scheduler.state().clone(),
        plugins.transport(),
    );
    let notifier_handle = tokio::spawn(notifier.run(scheduler.subscribe_statuses(), shutdown.clone()));

    let mut events = scheduler.subscribe();
    let reporter_shutdown = shutdown.clone();
    let reporter_handle = tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;

                _ = reporter_shutdown.cancelled() => break,

                event = events.recv() => match event {
                    Some(MonitorEvent::Status(event)) => report_status(&event),
                    Some(_) => {}
                    None => break,
                },
            }
        }
    });

    let started = scheduler.start_enabled();
    if started.is_empty() {
        tracing::warn!(
            "No enabled targets with a URL in {}; nothing to monitor",
            settings.monitor_file
        );
    } else {
        info!("Monitoring {} target(s): {:?}", started.len(), started);
    }

    tokio::signal::ctrl_c().await?;
    info!("Shutting down...");

    scheduler.stop_all().await;
    shutdown.cancel();
    let (notifier_result, reporter_result) = tokio::join!(notifier_handle, reporter_handle);
    report_task_exit("Notifier", notifier_result);
    report_task_exit("Status reporter", reporter_result);

    let stats = scheduler.stats().await;
    info!(
        "Stopped after {}s: {} target(s), {} in stock, {} in error",
        stats.uptime_seconds, stats.total_targets, stats.in_stock_targets, stats.error_targets
    );
    Ok(())
}

/// Logs a background task that panicked or was aborted. Returns `true` on a clean exit.
fn report_task_exit(name: &str, result: std::result::Result<(), JoinError>) -> bool {
    match result {
        Ok(()) => true,
        Err(e) => {
            tracing::error!("{} task failed: {}", name, e);
            false
        }
    }
}

fn report_status(event: &StatusEvent) {
    match &event.verdict {
        StatusVerdict::Error(detail) => {
            tracing::warn!("[target {}] {} - {}", event.target_id, event.url, detail)
        }
        verdict => info!("[target {}] {} - {}", event.target_id, event.url, verdict),
    }
}

async fn check(settings: AppConfig, url: &str) -> Result<()> {
    let plugins = PluginManager::from_config(&settings)?;
    let fetcher = plugins.fetcher();

    let verdict = poll_once(fetcher.as_ref(), url, settings.scheduler.fetch_timeout()).await;
    println!("{}: {}", url, verdict);
    Ok(())
}

fn init(settings: &AppConfig, force: bool) -> Result<()> {
    let path = PathBuf::from(&settings.monitor_file);
    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists, pass --force to overwrite it",
            path.display()
        );
    }

    MonitorConfig::default().save(&path)?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}

async fn test_email(settings: AppConfig) -> Result<()> {
    let monitor_config = MonitorConfig::load(&settings.monitor_file)
        .with_context(|| format!("Failed to load {}", settings.monitor_file))?;
    if !monitor_config.notification.is_configured() {
        anyhow::bail!("Set notification.fromAddress and notification.toAddress first");
    }

    let plugins = PluginManager::from_config(&settings)?;
    let event = StatusEvent {
        target_id: 0,
        url: "https://example.com/test-product".to_string(),
        verdict: StatusVerdict::InStock,
        previous: None,
        timestamp: Utc::now(),
    };

    plugins
        .transport()
        .send(&monitor_config.notification, &build_message(&event))
        .await?;
    println!("Test email sent to {}", monitor_config.notification.to_address);
    Ok(())
}

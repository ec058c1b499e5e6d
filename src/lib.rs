pub mod classifier;
pub mod config;
pub mod element_finder;
pub mod events;
pub mod models;
pub mod monitor_state;
pub mod notifier;
pub mod plugins;
pub mod scheduler;
pub mod utils;
pub mod worker;

// Re-export commonly used types
pub use crate::config::AppConfig;
pub use classifier::classify;
pub use events::{EventBus, EventSubscription, MonitorEvent};
pub use monitor_state::{MonitorEntry, MonitorState};
pub use notifier::{AlertOutcome, Notifier};
pub use plugins::PluginManager;
pub use scheduler::{Scheduler, SchedulerStats, TargetSnapshot};
pub use utils::error::{AppError, Result};
pub use worker::{TargetWorker, WorkerStatus};

use ::config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path of the JSON file holding targets and notification settings.
    pub monitor_file: String,
    pub fetcher: FetcherConfig,
    pub scheduler: SchedulerConfig,
    pub notifications: NotificationsConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FetcherBackend {
    /// Plain HTTP fetch, no script execution.
    Http,
    /// Headless Chrome render, waits for dynamic content to settle.
    Browser,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetcherConfig {
    pub backend: FetcherBackend,
    pub user_agent: String,
    pub chrome_path: Option<String>,
    /// Extra time given to page scripts after the document has loaded.
    pub settle_delay_ms: u64,
    pub window_width: u32,
    pub window_height: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Upper bound for a single fetch, in seconds.
    pub fetch_timeout: u64,
    pub event_channel_capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    pub smtp_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    /// When set, logs are also written to a daily rolling file in this directory.
    pub directory: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            monitor_file: "config.json".to_string(),
            fetcher: FetcherConfig {
                backend: FetcherBackend::Browser,
                user_agent: DEFAULT_USER_AGENT.to_string(),
                chrome_path: None,
                settle_delay_ms: 3000,
                window_width: 1920,
                window_height: 1080,
            },
            scheduler: SchedulerConfig {
                fetch_timeout: 30,
                event_channel_capacity: 256,
            },
            notifications: NotificationsConfig { smtp_timeout: 30 },
            logging: LoggingConfig {
                level: "info".to_string(),
                directory: None,
            },
        }
    }
}

impl SchedulerConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout)
    }
}

impl FetcherConfig {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

impl AppConfig {
    /// Layers built-in defaults, an optional settings file and `SENTINEL` environment variables.
    pub fn load(settings_file: Option<&Path>) -> Result<Self, ConfigError> {
        let defaults = Config::try_from(&AppConfig::default())?;

        let file_source = match settings_file {
            Some(path) => File::from(path).required(true),
            None => File::with_name("stock_sentinel").required(false),
        };

        let s = Config::builder()
            .add_source(defaults)
            .add_source(file_source)
            // Add environment variables with prefix "SENTINEL"
            .add_source(Environment::with_prefix("SENTINEL").separator("__"))
            .build()?;

        let mut config: AppConfig = s.try_deserialize()?;

        // Add Chrome path from environment if not set
        if config.fetcher.chrome_path.is_none() {
            config.fetcher.chrome_path = env::var("CHROME_PATH").ok();
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.monitor_file.trim().is_empty() {
            return Err(ConfigError::Message("monitor_file must not be empty".into()));
        }

        if self.fetcher.user_agent.trim().is_empty() {
            return Err(ConfigError::Message("Fetcher user_agent must not be empty".into()));
        }

        if self.fetcher.window_width == 0 || self.fetcher.window_height == 0 {
            return Err(ConfigError::Message("Fetcher window size must be non-zero".into()));
        }

        if self.scheduler.fetch_timeout == 0 {
            return Err(ConfigError::Message("Scheduler fetch_timeout must be greater than 0".into()));
        }

        if self.scheduler.event_channel_capacity == 0 {
            return Err(ConfigError::Message(
                "Scheduler event_channel_capacity must be greater than 0".into(),
            ));
        }

        if self.notifications.smtp_timeout == 0 {
            return Err(ConfigError::Message("SMTP timeout must be greater than 0".into()));
        }

        if self
            .logging
            .level
            .parse::<tracing_subscriber::filter::LevelFilter>()
            .is_err()
        {
            return Err(ConfigError::Message(format!(
                "Unknown log level '{}'",
                self.logging.level
            )));
        }

        Ok(())
    }
}

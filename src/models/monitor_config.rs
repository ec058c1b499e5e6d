use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use validator::Validate;

use crate::models::{NotificationConfig, Target, TargetId};
use crate::utils::error::ConfigError;

pub const DEFAULT_SLOT_COUNT: usize = 5;
pub const DEFAULT_INTERVAL_SECONDS: u64 = 60;

/// On-disk monitor configuration: alert settings plus the list of targets.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", try_from = "RawMonitorConfig")]
pub struct MonitorConfig {
    pub notification: NotificationConfig,
    pub targets: Vec<Target>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMonitorConfig {
    notification: NotificationConfig,
    targets: Vec<RawTarget>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTarget {
    id: Option<TargetId>,
    #[serde(default)]
    url: String,
    #[serde(alias = "interval")]
    interval_seconds: u64,
    #[serde(default = "default_enabled")]
    enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl TryFrom<RawMonitorConfig> for MonitorConfig {
    type Error = String;

    fn try_from(raw: RawMonitorConfig) -> Result<Self, Self::Error> {
        let mut seen = HashSet::new();
        let mut targets = Vec::with_capacity(raw.targets.len());

        for (position, entry) in raw.targets.into_iter().enumerate() {
            // Targets without an explicit id take their array position.
            let id = entry.id.unwrap_or(position as TargetId);
            if !seen.insert(id) {
                return Err(format!("duplicate target id {}", id));
            }
            targets.push(Target {
                id,
                url: entry.url,
                interval_seconds: entry.interval_seconds,
                enabled: entry.enabled,
            });
        }

        Ok(MonitorConfig {
            notification: raw.notification,
            targets,
        })
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        let targets = (0..DEFAULT_SLOT_COUNT)
            .map(|slot| Target::new(slot as TargetId, "", DEFAULT_INTERVAL_SECONDS))
            .collect();
        Self {
            notification: NotificationConfig::default(),
            targets,
        }
    }
}

impl MonitorConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: MonitorConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        Ok(json)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&contents)
    }

    /// Loads the configuration, falling back to the defaults on any error.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::load(path) {
            Ok(config) => {
                tracing::info!(
                    "Loaded {} targets from {}",
                    config.targets.len(),
                    path.display()
                );
                config
            }
            Err(ConfigError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No configuration at {}, using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to load configuration from {}: {}. Using defaults",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Writes the configuration next to its destination and renames it into place.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        self.validate()?;
        let json = self.to_json()?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let tmp_path = path.with_extension("json.tmp");
        std::fs::write(&tmp_path, json)?;
        std::fs::rename(&tmp_path, path)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.notification.validate()?;
        for target in &self.targets {
            target.validate()?;
        }
        Ok(())
    }
}

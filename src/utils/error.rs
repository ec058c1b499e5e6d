use thiserror::Error;

use crate::models::TargetId;

/// Failure to obtain usable page content from a fetch backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("Timed out waiting for page content")]
    Timeout,

    #[error("Transport error: {0}")]
    TransportError(String),

    #[error("Rendering engine error: {0}")]
    RenderingEngineError(String),

    /// Anything that is neither a transport nor an engine failure.
    #[error("{0}")]
    Other(String),
}

#[derive(Error, Debug)]
pub enum NotificationError {
    #[error("Transport failure: {0}")]
    TransportFailure(String),

    #[error("Invalid address '{address}': {message}")]
    InvalidAddress { address: String, message: String },

    #[error("Missing credentials: {0}")]
    MissingCredentials(String),
}

/// Errors raised while loading or saving the monitor configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Malformed configuration: {0}")]
    Malformed(String),

    #[error("Missing configuration field: {0}")]
    MissingField(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Configuration IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        let message = err.to_string();
        if err.is_data() && message.starts_with("missing field") {
            // serde_json reports: missing field `name` at line X column Y
            let field = message
                .split('`')
                .nth(1)
                .unwrap_or("unknown")
                .to_string();
            ConfigError::MissingField(field)
        } else {
            ConfigError::Malformed(message)
        }
    }
}

impl From<validator::ValidationErrors> for ConfigError {
    fn from(err: validator::ValidationErrors) -> Self {
        ConfigError::Invalid(format!("{}", err))
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Notification error: {0}")]
    Notification(#[from] NotificationError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Settings error: {0}")]
    Settings(#[from] ::config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unknown target: {0}")]
    UnknownTarget(TargetId),

    #[error("Target {0} already exists")]
    DuplicateTarget(TargetId),

    #[error("Target {0} must be stopped first")]
    TargetRunning(TargetId),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(format!("{}", err))
    }
}

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;

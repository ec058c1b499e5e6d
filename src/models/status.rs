use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::TargetId;
use crate::utils::error::FetchError;
use crate::utils::truncate_chars;

const ENGINE_DETAIL_LIMIT: usize = 60;
const GENERIC_DETAIL_LIMIT: usize = 50;

/// Outcome of classifying one poll of a target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum StatusVerdict {
    InStock,
    OutOfStock,
    Unknown,
    Error(String),
}

impl StatusVerdict {
    pub fn is_in_stock(&self) -> bool {
        matches!(self, StatusVerdict::InStock)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, StatusVerdict::Error(_))
    }

    /// Short label used for metrics and logs.
    pub fn label(&self) -> &'static str {
        match self {
            StatusVerdict::InStock => "in_stock",
            StatusVerdict::OutOfStock => "out_of_stock",
            StatusVerdict::Unknown => "unknown",
            StatusVerdict::Error(_) => "error",
        }
    }

    pub fn from_fetch_error(error: &FetchError) -> Self {
        let detail = match error {
            FetchError::Timeout => "Page load timeout".to_string(),
            FetchError::RenderingEngineError(detail) => {
                let lower = detail.to_lowercase();
                if lower.contains("chrome") || lower.contains("chromium") {
                    "Browser engine issue - check the Chrome installation".to_string()
                } else {
                    format!(
                        "Browser error - {}",
                        truncate_chars(detail, ENGINE_DETAIL_LIMIT)
                    )
                }
            }
            FetchError::TransportError(detail) => format!(
                "Transport error - {}",
                truncate_chars(detail, ENGINE_DETAIL_LIMIT)
            ),
            FetchError::Other(detail) => return Self::generic_error(detail),
        };
        StatusVerdict::Error(detail)
    }

    /// Failures that are neither transport nor engine specific.
    pub fn generic_error(detail: impl AsRef<str>) -> Self {
        StatusVerdict::Error(truncate_chars(detail.as_ref(), GENERIC_DETAIL_LIMIT))
    }
}

impl fmt::Display for StatusVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusVerdict::Error(detail) => write!(f, "error: {}", detail),
            other => f.write_str(other.label()),
        }
    }
}

/// Result of one poll, published by a worker to every subscriber.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEvent {
    pub target_id: TargetId,
    pub url: String,
    pub verdict: StatusVerdict,
    /// Verdict recorded for the target before this poll.
    pub previous: Option<StatusVerdict>,
    pub timestamp: DateTime<Utc>,
}

impl StatusEvent {
    /// True when the target just moved into `InStock` from anything else (or from nothing).
    pub fn is_in_stock_transition(&self) -> bool {
        self.verdict.is_in_stock()
            && !self
                .previous
                .as_ref()
                .is_some_and(StatusVerdict::is_in_stock)
    }
}

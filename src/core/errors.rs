// src/core/errors.rs

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that can reach a caller of the reconnaissance engine.
///
/// Most failures inside a crawl or a subdomain run never surface here: a page
/// that cannot be fetched, a check that panics or an OSINT source that is down
/// only shrink the result. What remains are input problems, the single-page
/// scan failing to reach its target, and the quota gate refusing to start.
#[derive(Error, Debug)]
pub enum ReconError {
    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    #[error("Target unreachable: {url}: {reason}")]
    TargetUnreachable { url: String, reason: String },

    #[error("Quota exceeded ({limit} requests), resets at {resets_at}")]
    QuotaExceeded {
        limit: u32,
        resets_at: DateTime<Utc>,
    },

    #[error("Source {source_name} failed: {reason}")]
    Source { source_name: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP client error: {0}")]
    Client(String),
}

impl From<reqwest::Error> for ReconError {
    fn from(e: reqwest::Error) -> Self {
        ReconError::Client(e.to_string())
    }
}

pub type ReconResult<T> = Result<T, ReconError>;
